//! SVG surface. Pages are stacked top to bottom in one document.

use std::convert::Infallible;

use super::{pages, replay, Surface, POINTS_PER_MM};
use crate::draw::{on_circle, DrawOp, Point, Rgb};
use crate::sheet::Sheet;

/// Render `ops` as a standalone SVG document sized in points.
pub fn to_svg(ops: &[DrawOp], sheet: &Sheet) -> String {
    let pages = pages(ops);
    let width = sheet.width * POINTS_PER_MM;
    let page_height = sheet.height * POINTS_PER_MM;
    let height = page_height * pages.len() as f64;

    let mut svg = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{width:.3}pt" height="{height:.3}pt" viewBox="0 0 {width:.3} {height:.3}">"#
    ));
    svg.push('\n');

    for (i, page) in pages.iter().enumerate() {
        svg.push_str(&format!(
            "  <g transform=\"translate(0 {:.3})\">\n",
            i as f64 * page_height
        ));
        let mut surface = SvgPage::new(&mut svg, sheet.height);
        if let Err(never) = replay(page, &mut surface) {
            match never {}
        }
        svg.push_str("  </g>\n");
    }

    svg.push_str("</svg>\n");
    svg
}

struct SvgPage<'a> {
    out: &'a mut String,
    /// Page height in millimetres, for flipping `y`.
    height: f64,
    path: String,
    color: Rgb,
    line_width: f64,
}

impl<'a> SvgPage<'a> {
    fn new(out: &'a mut String, height: f64) -> Self {
        SvgPage {
            out,
            height,
            path: String::new(),
            color: Rgb::BLACK,
            line_width: 1.0,
        }
    }

    fn x(&self, p: Point) -> f64 {
        p.x * POINTS_PER_MM
    }

    fn y(&self, p: Point) -> f64 {
        (self.height - p.y) * POINTS_PER_MM
    }

    fn emit(&mut self, style: String) {
        if self.path.is_empty() {
            return;
        }
        self.out.push_str(&format!(
            "    <path d=\"{}\" {style}/>\n",
            self.path.trim_end()
        ));
        self.path.clear();
    }
}

fn hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color.0, color.1, color.2)
}

impl Surface for SvgPage<'_> {
    type Error = Infallible;

    fn set_color(&mut self, color: Rgb) -> Result<(), Infallible> {
        self.color = color;
        Ok(())
    }

    fn set_line_width(&mut self, width: f64) -> Result<(), Infallible> {
        self.line_width = width;
        Ok(())
    }

    fn move_to(&mut self, to: Point) -> Result<(), Infallible> {
        let (x, y) = (self.x(to), self.y(to));
        self.path.push_str(&format!("M{x:.3} {y:.3} "));
        Ok(())
    }

    fn line_to(&mut self, to: Point) -> Result<(), Infallible> {
        let (x, y) = (self.x(to), self.y(to));
        self.path.push_str(&format!("L{x:.3} {y:.3} "));
        Ok(())
    }

    fn arc(&mut self, center: Point, radius: f64, _start: f64, end: f64) -> Result<(), Infallible> {
        let to = on_circle(center, radius, end);
        let (x, y) = (self.x(to), self.y(to));
        let r = radius * POINTS_PER_MM;
        // counter-clockwise with y up is sweep 0 once y points down
        self.path.push_str(&format!("A{r:.3} {r:.3} 0 0 0 {x:.3} {y:.3} "));
        Ok(())
    }

    fn close_path(&mut self, _start: Point) -> Result<(), Infallible> {
        self.path.push_str("Z ");
        Ok(())
    }

    fn stroke(&mut self) -> Result<(), Infallible> {
        let style = format!(
            "fill=\"none\" stroke=\"{}\" stroke-width=\"{:.3}\"",
            hex(self.color),
            self.line_width * POINTS_PER_MM
        );
        self.emit(style);
        Ok(())
    }

    fn fill(&mut self) -> Result<(), Infallible> {
        let style = format!("fill=\"{}\"", hex(self.color));
        self.emit(style);
        Ok(())
    }
}
