//! Strip layout: pin firing ticks to hole positions on a paper strip cut
//! into segments that fit a printable sheet.
//!
//! Coordinates are millimetres. `x` runs along the strip from its leading
//! edge, `y` across it from the edge nearest pin 0.

use std::iter;

use serde::Serialize;
use tracing::debug;

use crate::band::Bands;
use crate::profile::MechanismProfile;
use crate::sheet::Sheet;
use crate::{Error, Result};

/// Minimum length of one stroke of the top/bottom border.
pub const BORDER_RUN_MIN: f64 = 50.0;

/// A gap between holes wider than this many hole radii is a good place to
/// cut the strip.
const SILENCE_RADII: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hole {
    pub x: f64,
    pub y: f64,
    pub pin: usize,
    pub tick: u64,
}

/// One stroke of a segment's long edges, in segment-local `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BorderRun {
    pub from: f64,
    pub to: f64,
}

/// A slice `[x0, x1)` of the strip printed as one piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub x0: f64,
    pub x1: f64,
    /// Holes whose centre falls inside the segment, ordered by `x` then `y`.
    pub holes: Vec<Hole>,
    pub border_runs: Vec<BorderRun>,
}

impl Segment {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }
}

/// Where a segment lands on the printed output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub page: usize,
    /// Bottom edge of the segment, measured up from the bottom of the page.
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StripLayout {
    /// Millimetres of strip per tick.
    pub scale: f64,
    pub min_tick: u64,
    pub max_tick: u64,
    /// Total strip length including lead-in and lead-out.
    pub length: f64,
    pub segments: Vec<Segment>,
}

impl StripLayout {
    /// Lay out `bands` for `profile`, where `unit` ticks (the shortest
    /// repeat of any pin) span one `profile.step`.
    pub fn new(bands: &Bands, profile: &MechanismProfile, unit: u64, sheet: &Sheet) -> Result<Self> {
        sheet.validate(profile.height)?;

        let timeline = bands.timeline();
        let (min_tick, max_tick) = match (timeline.first(), timeline.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(Error::NoPlayableNotes),
        };

        let scale = profile.step / unit.max(1) as f64;
        let radius = profile.hole_radius();
        let position = |tick: u64| sheet.lead_in + (tick - min_tick) as f64 * scale;

        let splits = breakpoints(&timeline, scale, radius, sheet);
        let length = splits.last().copied().unwrap_or_default();

        let mut holes: Vec<Hole> = bands
            .iter()
            .flat_map(|(pin, ticks)| {
                ticks.iter().map(move |&tick| Hole {
                    x: position(tick),
                    y: profile.pin_y(pin),
                    pin,
                    tick,
                })
            })
            .collect();
        holes.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

        let mut holes = holes.into_iter().peekable();
        let count = splits.len() - 1;
        let segments: Vec<Segment> = splits
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let (x0, x1) = (w[0], w[1]);
                let seg_holes: Vec<Hole> = if i + 1 == count {
                    holes.by_ref().collect()
                } else {
                    iter::from_fn(|| holes.next_if(|h| h.x < x1)).collect()
                };
                let border_runs = border_runs(&seg_holes, x0, x1 - x0);
                Segment {
                    x0,
                    x1,
                    holes: seg_holes,
                    border_runs,
                }
            })
            .collect();

        debug!(
            segments = segments.len(),
            length_mm = length,
            scale,
            "strip laid out"
        );

        Ok(StripLayout {
            scale,
            min_tick,
            max_tick,
            length,
            segments,
        })
    }

    /// Segment boundaries along the strip, from 0 to `length`.
    pub fn breaks(&self) -> Vec<f64> {
        iter::once(0.0)
            .chain(self.segments.iter().map(|s| s.x1))
            .collect()
    }

    pub fn holes(&self) -> impl Iterator<Item = &Hole> {
        self.segments.iter().flat_map(|s| s.holes.iter())
    }

    /// Stack segments of `strip_height` down the sheet, starting a new page
    /// whenever the next one would not fit.
    pub fn paginate(&self, strip_height: f64, sheet: &Sheet) -> Vec<Placement> {
        let mut placements = Vec::with_capacity(self.segments.len());
        let mut page = 0;
        let mut y = sheet.border;

        for _ in &self.segments {
            placements.push(Placement { page, y });
            y += strip_height + sheet.border;
            if y + strip_height + sheet.border > sheet.height {
                page += 1;
                y = sheet.border;
            }
        }

        placements
    }
}

/// Segment boundaries for a sorted, de-duplicated `timeline`.
///
/// Each midpoint between consecutive ticks is a candidate cut. When a
/// segment would outgrow the printable width it is cut at the latest
/// silence (a gap wider than four hole radii), or failing that at the last
/// midpoint that still fit, so cuts avoid dense runs of holes. The strip
/// end is checked the same way, so every segment fits.
///
/// Positions are measured from the first tick, the same origin as the holes.
pub fn breakpoints(timeline: &[u64], scale: f64, radius: f64, sheet: &Sheet) -> Vec<f64> {
    let (start, end) = match (timeline.first(), timeline.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return vec![0.0, 2.0 * radius + sheet.lead_in + sheet.lead_out],
    };

    let width = sheet.printable_width();
    let length = (end - start) as f64 * scale + 2.0 * radius + sheet.lead_in + sheet.lead_out;
    let position = |tick: u64| sheet.lead_in + (tick - start) as f64 * scale;

    let midpoints = timeline.windows(2).map(|w| {
        let middle = (position(w[0]) + position(w[1])) / 2.0;
        let silence = (w[1] - w[0]) as f64 * scale > SILENCE_RADII * radius;
        (middle, silence)
    });

    let mut splits = vec![0.0];
    let mut seg_start = 0.0;
    let mut last_fit = 0.0;
    let mut silence_at = 0.0;

    for (checkpoint, silence) in midpoints.chain(iter::once((length, false))) {
        while checkpoint - seg_start > width {
            let cut = if silence_at > seg_start {
                silence_at
            } else if last_fit > seg_start {
                last_fit
            } else {
                // nothing to cut at inside a whole page width
                seg_start + width * (1.0 - 1e-12)
            };
            splits.push(cut);
            seg_start = cut;
        }
        last_fit = checkpoint;
        if silence {
            silence_at = checkpoint;
        }
    }

    splits.push(length);
    splits
}

fn border_runs(holes: &[Hole], x0: f64, width: f64) -> Vec<BorderRun> {
    let mut runs = Vec::new();
    let mut run_start = 0.0;

    for hole in holes {
        let x = hole.x - x0;
        if x - run_start >= BORDER_RUN_MIN {
            runs.push(BorderRun {
                from: run_start,
                to: x,
            });
            run_start = x;
        }
    }

    if run_start < width {
        runs.push(BorderRun {
            from: run_start,
            to: width,
        });
    }

    runs
}
