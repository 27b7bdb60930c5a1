//! Drawing primitives for a laid-out strip.
//!
//! [`render`] turns a [`StripLayout`] into a flat stream of [`DrawOp`]s in
//! millimetres, origin at the bottom left of each page, `y` pointing up.
//! Path semantics follow the usual PostScript model: an [`DrawOp::Arc`]
//! joins the current point to its start with a straight line, and
//! [`DrawOp::NewSubPath`] clears the current point.

use std::f64::consts::FRAC_PI_2;

use serde::Serialize;

use crate::layout::{Segment, StripLayout};
use crate::profile::MechanismProfile;
use crate::sheet::Sheet;

/// Stroke width for borders and holes.
pub const LINE_WIDTH: f64 = 0.4;

/// Arrow pointing along the strip, drawn once per page.
pub const LOGO: [(f64, f64); 7] = [
    (4.0, 5.0),
    (7.0, 7.0),
    (7.0, 5.7),
    (17.0, 5.7),
    (17.0, 4.3),
    (7.0, 4.3),
    (7.0, 3.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DrawOp {
    NewPage,
    SetColor(Rgb),
    SetLineWidth(f64),
    MoveTo(Point),
    LineTo(Point),
    /// Counter-clockwise arc, angles in radians.
    Arc {
        center: Point,
        radius: f64,
        start: f64,
        end: f64,
    },
    NewSubPath,
    ClosePath,
    Stroke,
    Fill,
}

/// Point at `angle` radians on the circle around `center`.
pub fn on_circle(center: Point, radius: f64, angle: f64) -> Point {
    Point::new(
        center.x + radius * angle.cos(),
        center.y + radius * angle.sin(),
    )
}

/// Draw every segment of `layout`, stacking segments down each page and
/// starting new pages as [`StripLayout::paginate`] decides.
pub fn render(layout: &StripLayout, profile: &MechanismProfile, sheet: &Sheet) -> Vec<DrawOp> {
    let placements = layout.paginate(profile.height, sheet);
    let mut ops = Vec::new();
    let mut page = None;

    for (segment, placement) in layout.segments.iter().zip(&placements) {
        if page != Some(placement.page) {
            page = Some(placement.page);
            ops.push(DrawOp::NewPage);
            logo(&mut ops);
        }
        draw_segment(&mut ops, segment, placement.y, profile, sheet);
    }

    ops
}

fn logo(ops: &mut Vec<DrawOp>) {
    ops.push(DrawOp::SetColor(Rgb::BLACK));
    let mut corners = LOGO.iter().map(|&(x, y)| Point::new(x, y));
    if let Some(first) = corners.next() {
        ops.push(DrawOp::MoveTo(first));
        ops.extend(corners.map(DrawOp::LineTo));
    }
    ops.push(DrawOp::ClosePath);
    ops.push(DrawOp::Fill);
}

fn draw_segment(
    ops: &mut Vec<DrawOp>,
    segment: &Segment,
    y0: f64,
    profile: &MechanismProfile,
    sheet: &Sheet,
) {
    let left = sheet.border;
    let right = sheet.border + segment.width();
    let top = y0 + profile.height;

    ops.push(DrawOp::SetColor(Rgb::BLUE));
    ops.push(DrawOp::SetLineWidth(LINE_WIDTH));
    for x in [left, right] {
        ops.push(DrawOp::MoveTo(Point::new(x, y0)));
        ops.push(DrawOp::LineTo(Point::new(x, top)));
    }
    ops.push(DrawOp::Stroke);

    ops.push(DrawOp::SetColor(Rgb::RED));
    ops.push(DrawOp::SetLineWidth(LINE_WIDTH));
    let radius = profile.hole_radius();
    for hole in &segment.holes {
        let center = Point::new(hole.x - segment.x0 + left, hole.y + y0);
        ops.push(DrawOp::NewSubPath);
        for quarter in 0..4 {
            let start = quarter as f64 * FRAC_PI_2;
            ops.push(DrawOp::Arc {
                center,
                radius,
                start,
                end: start + FRAC_PI_2,
            });
        }
        ops.push(DrawOp::ClosePath);
    }

    for y in [y0, top] {
        for run in &segment.border_runs {
            ops.push(DrawOp::MoveTo(Point::new(left + run.from, y)));
            ops.push(DrawOp::LineTo(Point::new(left + run.to, y)));
        }
    }
    ops.push(DrawOp::Stroke);
}
