//! Subcommand implementations.

use anyhow::{Context, Result};
use spieluhr::render::pdf;
use spieluhr::{profile, ConvertOptions};
use spieluhr_conf::{ConfigSources, SpieluhrConfig};
use tracing::{debug, info};

use crate::ConvertArgs;

/// Run the conversion and write every requested artifact.
///
/// Everything that can fail on content is computed before the first file is
/// opened, so a bad tune leaves no partial output behind.
pub fn convert(args: &ConvertArgs, mut config: SpieluhrConfig) -> Result<()> {
    if let Some(paper) = &args.paper {
        config.sheet.paper = paper.clone();
    }
    let sheet = config.sheet.to_sheet()?;

    let box_type = args.box_type.as_deref().unwrap_or(&config.conversion.box_type);
    let mechanism = profile::lookup(box_type)?;

    let options = ConvertOptions {
        filter_ticks: args.filter.unwrap_or(config.conversion.filter),
        transpose: args.transpose.or(config.conversion.transpose),
        search: args.search.unwrap_or(config.conversion.search),
    };

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let conversion = spieluhr::convert(&bytes, mechanism, &options)
        .with_context(|| format!("failed to convert {}", args.input.display()))?;

    let layout = conversion.layout(&sheet)?;
    let pages = layout
        .paginate(mechanism.height, &sheet)
        .last()
        .map_or(0, |p| p.page + 1);
    debug!(segments = layout.segments.len(), pages, "strip laid out");

    let midi = args.midi.as_ref().map(|_| conversion.to_midi());
    let svg = match &args.svg {
        Some(_) => Some(conversion.to_svg(&sheet)?),
        None => None,
    };
    let ops = args.pdf.as_ref().map(|_| conversion.draw(&layout, &sheet));

    println!("box:        {}", mechanism.name);
    println!("notes:      {}", conversion.notes);
    println!("suppressed: {}", conversion.suppressed);
    match conversion.report {
        Some(report) => println!(
            "transpose:  {} octaves {} halftones ({} unplayable before folding)",
            report.octaves(),
            report.halftones(),
            report.unplayable
        ),
        None => println!("transpose:  {} semitones (fixed)", conversion.transpose),
    }
    println!("unmapped:   {}", conversion.unmapped());
    println!("holes:      {}", conversion.bands.hole_count());
    println!(
        "strip:      {:.1} mm in {} segments on {} pages",
        layout.length,
        layout.segments.len(),
        pages
    );

    if let (Some(path), Some(midi)) = (&args.midi, midi) {
        std::fs::write(path, midi).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote MIDI");
    }
    if let (Some(path), Some(svg)) = (&args.svg, svg) {
        std::fs::write(path, svg).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote SVG");
    }
    if let (Some(path), Some(ops)) = (&args.pdf, ops) {
        pdf::write_pdf(path, &ops, &sheet).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote PDF");
    }

    Ok(())
}

/// Print the mechanism registry.
pub fn boxes() {
    println!("{:<10} {:>4}  {:<8} {:>9} {:>6}", "BOX", "PINS", "RANGE", "STRIP mm", "STEP");
    for mechanism in profile::all() {
        let pitches = mechanism.pitches();
        let range = match (pitches.first(), pitches.last()) {
            (Some(lo), Some(hi)) => format!("{lo}-{hi}"),
            _ => "-".to_string(),
        };
        let marker = if mechanism.name == profile::DEFAULT_PROFILE { " (default)" } else { "" };
        println!(
            "{:<10} {:>4}  {:<8} {:>9.1} {:>6.1}{}",
            mechanism.name,
            mechanism.pin_count(),
            range,
            mechanism.height,
            mechanism.step,
            marker
        );
    }
}

/// Print the effective configuration, noting where it came from.
pub fn print_config(config: &SpieluhrConfig, sources: &ConfigSources) {
    for file in &sources.files {
        println!("# loaded from {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# overridden by ${var}");
    }
    print!("{}", config.to_toml());
}
