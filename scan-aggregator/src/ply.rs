/// ASCII PLY export of coloured scan points
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use surround_scan::point_log::LidarPoint;

/// Write `points` as an ASCII PLY vertex list with per-vertex colour.
/// Coordinates are multiplied by `scale`.
pub fn write_ascii_ply(path: &Path, points: &[LidarPoint], scale: f64) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", points.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(writer, "property float {axis}")?;
    }
    for channel in ["red", "green", "blue"] {
        writeln!(writer, "property uchar {channel}")?;
    }
    writeln!(writer, "end_header")?;

    for point in points {
        let p = point.position.as_dvec3() * scale;
        writeln!(
            writer,
            "{:.6} {:.6} {:.6} {} {} {}",
            p.x, p.y, p.z, point.colour.r, point.colour.g, point.colour.b
        )?;
    }

    writer.flush()
}
