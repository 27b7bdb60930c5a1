//! Printable sheet geometry.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A printable page, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub width: f64,
    pub height: f64,
    /// Margin around the page and between stacked segments.
    pub border: f64,
    /// Blank strip before the first hole.
    pub lead_in: f64,
    /// Blank strip after the last hole.
    pub lead_out: f64,
}

/// Named paper sizes, already reduced by the printer's unprintable edge
/// where that matters.
pub const PRESETS: &[(&str, f64, f64)] = &[
    // US Letter with a 10mm border
    ("letter", 269.4, 205.9),
    ("letter-full", 279.4, 215.9),
    ("legal", 356.0, 215.9),
    ("legal-narrow", 336.0, 195.9),
    // 2x A4
    ("a4x2", 420.0, 297.0),
];

impl Default for Sheet {
    fn default() -> Self {
        Sheet {
            width: 269.4,
            height: 205.9,
            border: 4.0,
            lead_in: 20.0,
            lead_out: 20.0,
        }
    }
}

impl Sheet {
    /// Look up a named paper size with default margins and leads.
    pub fn preset(name: &str) -> Option<Sheet> {
        PRESETS
            .iter()
            .find(|(preset, _, _)| *preset == name)
            .map(|&(_, width, height)| Sheet {
                width,
                height,
                ..Sheet::default()
            })
    }

    pub fn printable_width(&self) -> f64 {
        self.width - 2.0 * self.border
    }

    /// A sheet of the same width, tall enough to stack `segments` strips of
    /// `strip_height` on one page.
    pub fn unpaged(&self, segments: usize, strip_height: f64) -> Sheet {
        Sheet {
            height: segments as f64 * (strip_height + self.border) + self.border + 1.0,
            ..*self
        }
    }

    /// Reject sheets that cannot hold a single strip.
    pub fn validate(&self, strip_height: f64) -> Result<()> {
        let width = self.printable_width();
        if width.is_nan() || width <= 0.0 {
            return Err(Error::InvalidSheet(format!(
                "printable width {width:.1}mm is not positive"
            )));
        }
        if self.lead_in < 0.0 || self.lead_out < 0.0 {
            return Err(Error::InvalidSheet("lead-in and lead-out must not be negative".to_string()));
        }
        if strip_height + 2.0 * self.border > self.height {
            return Err(Error::InvalidSheet(format!(
                "a {strip_height:.1}mm strip does not fit a {:.1}mm page",
                self.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_letter() {
        assert_eq!(Sheet::preset("letter"), Some(Sheet::default()));
        assert!((Sheet::default().printable_width() - 261.4).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_preset() {
        assert_eq!(Sheet::preset("tabloid"), None);
    }

    #[test]
    fn test_unpaged_holds_all_segments() {
        let sheet = Sheet::default().unpaged(3, 70.0);
        assert!((sheet.height - (3.0 * 74.0 + 5.0)).abs() < 1e-9);
        assert_eq!(sheet.width, Sheet::default().width);
    }

    #[test]
    fn test_validate() {
        assert!(Sheet::default().validate(70.0).is_ok());
        assert!(Sheet::default().validate(200.0).is_err());

        let narrow = Sheet {
            width: 8.0,
            ..Sheet::default()
        };
        assert!(narrow.validate(41.0).is_err());
    }
}
