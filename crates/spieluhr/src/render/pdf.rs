//! PDF surface, one PDF page per sheet.

use std::io;
use std::path::Path;

use pdf_canvas::graphicsstate::Color;
use pdf_canvas::{Canvas, Pdf};
use tracing::debug;

use super::{pages, replay, Surface, POINTS_PER_MM};
use crate::draw::{on_circle, DrawOp, Point, Rgb};
use crate::sheet::Sheet;
use crate::Result;

/// Write `ops` to a PDF file at `path`.
pub fn write_pdf(path: &Path, ops: &[DrawOp], sheet: &Sheet) -> Result<()> {
    let name = path.to_str().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("PDF path {} is not valid UTF-8", path.display()),
        )
    })?;

    let mut pdf = Pdf::create(name)?;
    let width = (sheet.width * POINTS_PER_MM) as f32;
    let height = (sheet.height * POINTS_PER_MM) as f32;

    let pages = pages(ops);
    for page in &pages {
        pdf.render_page(width, height, |canvas| replay(page, canvas))?;
    }
    pdf.finish()?;

    debug!(path = %path.display(), pages = pages.len(), "wrote PDF");
    Ok(())
}

fn pt(value: f64) -> f32 {
    (value * POINTS_PER_MM) as f32
}

/// Cubic Bézier control points for an arc of at most a quarter turn.
fn bezier(center: Point, radius: f64, start: f64, end: f64) -> [Point; 3] {
    let k = 4.0 / 3.0 * ((end - start) / 4.0).tan() * radius;
    let from = on_circle(center, radius, start);
    let to = on_circle(center, radius, end);
    [
        Point::new(from.x - k * start.sin(), from.y + k * start.cos()),
        Point::new(to.x + k * end.sin(), to.y - k * end.cos()),
        to,
    ]
}

impl Surface for Canvas<'_> {
    type Error = io::Error;

    fn set_color(&mut self, color: Rgb) -> io::Result<()> {
        let Rgb(r, g, b) = color;
        self.set_stroke_color(Color::rgb(r, g, b))?;
        self.set_fill_color(Color::rgb(r, g, b))
    }

    fn set_line_width(&mut self, width: f64) -> io::Result<()> {
        Canvas::set_line_width(self, pt(width))
    }

    fn move_to(&mut self, to: Point) -> io::Result<()> {
        Canvas::move_to(self, pt(to.x), pt(to.y))
    }

    fn line_to(&mut self, to: Point) -> io::Result<()> {
        Canvas::line_to(self, pt(to.x), pt(to.y))
    }

    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64) -> io::Result<()> {
        let [c1, c2, to] = bezier(center, radius, start, end);
        self.curve_to(pt(c1.x), pt(c1.y), pt(c2.x), pt(c2.y), pt(to.x), pt(to.y))
    }

    fn close_path(&mut self, start: Point) -> io::Result<()> {
        Canvas::line_to(self, pt(start.x), pt(start.y))
    }

    fn stroke(&mut self) -> io::Result<()> {
        Canvas::stroke(self)
    }

    fn fill(&mut self) -> io::Result<()> {
        Canvas::fill(self)
    }
}
