//! Output surfaces for a [`DrawOp`] stream.
//!
//! [`replay`] walks one page of operations, tracking the current point so
//! that every surface sees explicit moves and arcs of at most a quarter
//! turn.

use std::f64::consts::FRAC_PI_2;

use crate::draw::{on_circle, DrawOp, Point, Rgb};

pub mod pdf;
pub mod svg;

/// PostScript points per millimetre.
pub const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// Something that can draw paths in sheet millimetres.
pub trait Surface {
    type Error;

    fn set_color(&mut self, color: Rgb) -> Result<(), Self::Error>;
    fn set_line_width(&mut self, width: f64) -> Result<(), Self::Error>;
    fn move_to(&mut self, to: Point) -> Result<(), Self::Error>;
    fn line_to(&mut self, to: Point) -> Result<(), Self::Error>;
    /// Counter-clockwise arc of at most a quarter turn, starting at the
    /// current point.
    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64) -> Result<(), Self::Error>;
    /// Close the current subpath, which began at `start`.
    fn close_path(&mut self, start: Point) -> Result<(), Self::Error>;
    fn stroke(&mut self) -> Result<(), Self::Error>;
    fn fill(&mut self) -> Result<(), Self::Error>;
}

/// Split a stream into pages at each [`DrawOp::NewPage`].
pub fn pages(ops: &[DrawOp]) -> Vec<&[DrawOp]> {
    let ops = ops.strip_prefix(&[DrawOp::NewPage]).unwrap_or(ops);
    ops.split(|op| *op == DrawOp::NewPage).collect()
}

/// Draw one page of operations onto `surface`.
pub fn replay<S: Surface>(ops: &[DrawOp], surface: &mut S) -> Result<(), S::Error> {
    let mut current: Option<Point> = None;
    let mut subpath: Option<Point> = None;

    for op in ops {
        match *op {
            DrawOp::NewPage => {}
            DrawOp::SetColor(color) => surface.set_color(color)?,
            DrawOp::SetLineWidth(width) => surface.set_line_width(width)?,
            DrawOp::MoveTo(to) => {
                surface.move_to(to)?;
                current = Some(to);
                subpath = Some(to);
            }
            DrawOp::LineTo(to) => {
                if current.is_some() {
                    surface.line_to(to)?;
                } else {
                    surface.move_to(to)?;
                    subpath = Some(to);
                }
                current = Some(to);
            }
            DrawOp::Arc {
                center,
                radius,
                start,
                end,
            } => {
                let from = on_circle(center, radius, start);
                match current {
                    None => {
                        surface.move_to(from)?;
                        subpath = Some(from);
                    }
                    Some(at) if !coincident(at, from) => surface.line_to(from)?,
                    Some(_) => {}
                }

                let pieces = ((end - start).abs() / FRAC_PI_2).ceil().max(1.0) as usize;
                let sweep = (end - start) / pieces as f64;
                for i in 0..pieces {
                    let a = start + sweep * i as f64;
                    surface.arc(center, radius, a, a + sweep)?;
                }
                current = Some(on_circle(center, radius, end));
            }
            DrawOp::NewSubPath => current = None,
            DrawOp::ClosePath => {
                if let Some(start) = subpath {
                    surface.close_path(start)?;
                    current = Some(start);
                }
            }
            DrawOp::Stroke => {
                surface.stroke()?;
                current = None;
                subpath = None;
            }
            DrawOp::Fill => {
                surface.fill()?;
                current = None;
                subpath = None;
            }
        }
    }

    Ok(())
}

fn coincident(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}
