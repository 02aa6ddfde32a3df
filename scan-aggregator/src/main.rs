/// Scan log aggregation entry point
mod aggregator;
mod bounds;
mod constants;
mod ply;

use aggregator::{ExportOptions, ScanAggregator};
use crate::constants::{CENTIMETRES_TO_FEET, DEFAULT_PLY_SCALE};
use std::env;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <output-root> [--ply] [--scale <factor> | --feet]", program);
    std::process::exit(1);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("scan-aggregator");
    if args.len() < 2 {
        usage(program);
    }

    let output_root = &args[1];
    let mut options = ExportOptions {
        ply: false,
        scale: DEFAULT_PLY_SCALE,
    };

    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--ply" => options.ply = true,
            "--feet" => options.scale = CENTIMETRES_TO_FEET,
            "--scale" => {
                let Some(value) = rest.next() else {
                    usage(program);
                };
                options.scale = value.parse()?;
            }
            _ => usage(program),
        }
    }

    let aggregator = ScanAggregator::new(output_root)?;
    let summary = aggregator.aggregate(&options)?;
    println!(
        "Aggregation complete: {} points from {} scans",
        summary.total_points,
        summary.scans.len()
    );

    Ok(())
}
