/// Combines every scan log under an output root into one point cloud
use crate::bounds::ScanBounds;
use crate::constants::{BOUNDS_CHUNK_SIZE, PROGRESS_CHARS};
use crate::ply::write_ascii_ply;
use constants::paths::{SCAN_DATA_DIR, SCAN_PLY_FILE, SCAN_SUMMARY_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use surround_scan::point_log::{LidarPoint, combine_scan_files, list_scan_files};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Also write an ASCII PLY next to the combined log
    pub ply: bool,
    /// Multiplier applied to PLY coordinates
    pub scale: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanFileSummary {
    pub index: u32,
    pub path: PathBuf,
    pub points: usize,
    pub skipped_lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateSummary {
    pub scans: Vec<ScanFileSummary>,
    pub total_points: usize,
    pub bounds: Option<ScanBounds>,
    pub combined: PathBuf,
    pub ply: Option<PathBuf>,
}

struct ParsedScan {
    summary: ScanFileSummary,
    points: Vec<LidarPoint>,
}

pub struct ScanAggregator {
    scan_dir: PathBuf,
}

impl ScanAggregator {
    pub fn new(output_root: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let scan_dir = Path::new(output_root).join(SCAN_DATA_DIR);
        if !scan_dir.is_dir() {
            return Err(format!("No scan directory at {}", scan_dir.display()).into());
        }
        Ok(Self { scan_dir })
    }

    /// Rebuild the combined log, report bounds and write the summary (and
    /// optionally a PLY) next to it.
    pub fn aggregate(
        &self,
        options: &ExportOptions,
    ) -> Result<AggregateSummary, Box<dyn std::error::Error>> {
        let files = list_scan_files(&self.scan_dir)?;
        println!(
            "Found {} scan files in {}",
            files.len(),
            self.scan_dir.display()
        );

        let scans = self.parse_scans(&files)?;
        let points: Vec<LidarPoint> = scans.iter().flat_map(|scan| scan.points.clone()).collect();

        let combined = combine_scan_files(&self.scan_dir)?;
        println!(
            "Saved {} ({} lines from {} files)",
            combined.path.display(),
            combined.lines,
            combined.files
        );

        let bounds = calculate_bounds(&points);
        match &bounds {
            Some(bounds) => print_bounds(bounds),
            None => println!("No points to bound"),
        }

        let ply = if options.ply {
            let path = self.scan_dir.join(SCAN_PLY_FILE);
            write_ascii_ply(&path, &points, options.scale)?;
            println!("Saved {} (scale {})", path.display(), options.scale);
            Some(path)
        } else {
            None
        };

        let summary = AggregateSummary {
            total_points: points.len(),
            scans: scans.into_iter().map(|scan| scan.summary).collect(),
            bounds,
            combined: combined.path,
            ply,
        };

        let summary_path = self.scan_dir.join(SCAN_SUMMARY_FILE);
        fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
        println!("Saved {}", summary_path.display());

        Ok(summary)
    }

    /// Parse every scan file in parallel, keeping index order.
    fn parse_scans(
        &self,
        files: &[(u32, PathBuf)],
    ) -> Result<Vec<ParsedScan>, Box<dyn std::error::Error>> {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} scans ({percent}%) {msg}")?
                .progress_chars(PROGRESS_CHARS),
        );
        pb.set_message("Parsing scans");

        let scans = files
            .par_iter()
            .map(|(index, path)| -> std::io::Result<ParsedScan> {
                let text = fs::read_to_string(path)?;
                let mut points = Vec::new();
                let mut skipped_lines = 0;
                for line in text.lines().filter(|line| !line.trim().is_empty()) {
                    match LidarPoint::parse_line(line) {
                        Some(point) => points.push(point),
                        None => skipped_lines += 1,
                    }
                }

                pb.inc(1);
                Ok(ParsedScan {
                    summary: ScanFileSummary {
                        index: *index,
                        path: path.clone(),
                        points: points.len(),
                        skipped_lines,
                    },
                    points,
                })
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        pb.finish_with_message("Scans parsed");
        Ok(scans)
    }
}

/// Bounds of every point, computed in parallel chunks.
fn calculate_bounds(points: &[LidarPoint]) -> Option<ScanBounds> {
    let pb = ProgressBar::new(points.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{bar:40.green/blue}] {pos}/{len} points ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars(PROGRESS_CHARS));
    }
    pb.set_message("Calculating bounds");

    let bounds = points
        .par_chunks(BOUNDS_CHUNK_SIZE)
        .map(|chunk| {
            let mut local = ScanBounds::new();
            for point in chunk {
                let p = point.position;
                local.update(p.x as f64, p.y as f64, p.z as f64);
            }
            pb.inc(chunk.len() as u64);
            local
        })
        .reduce_with(ScanBounds::merge);

    pb.finish_with_message("Bounds calculated");
    bounds.filter(|bounds| !bounds.is_empty())
}

fn print_bounds(bounds: &ScanBounds) {
    let (width, height, depth) = bounds.dimensions();
    println!("Scan bounds:");
    println!("  X: {:.2} to {:.2}", bounds.min_x, bounds.max_x);
    println!("  Y: {:.2} to {:.2} (elevation)", bounds.min_y, bounds.max_y);
    println!("  Z: {:.2} to {:.2}", bounds.min_z, bounds.max_z);
    println!("  Size: {:.2} x {:.2} x {:.2}", width, height, depth);
}
