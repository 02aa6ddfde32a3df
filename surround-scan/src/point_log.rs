/// Plain-text point logs written at the end of each scan
use crate::colour_map::Rgba8;
use bevy::prelude::*;
use constants::paths::{COMBINED_SCAN_FILE, SCAN_FILE_EXTENSION, SCAN_FILE_PREFIX};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Coloured world-space sample produced by a scan ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LidarPoint {
    pub position: Vec3,
    pub colour: Rgba8,
}

impl LidarPoint {
    pub fn new(position: Vec3, colour: Rgba8) -> Self {
        Self { position, colour }
    }

    /// `x y z r g b`, alpha is not stored.
    pub fn to_line(&self) -> String {
        format!(
            "{:.6} {:.6} {:.6} {} {} {}",
            self.position.x,
            self.position.y,
            self.position.z,
            self.colour.r,
            self.colour.g,
            self.colour.b
        )
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let x = fields.next()?.parse().ok()?;
        let y = fields.next()?.parse().ok()?;
        let z = fields.next()?.parse().ok()?;
        let r = fields.next()?.parse().ok()?;
        let g = fields.next()?.parse().ok()?;
        let b = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self::new(Vec3::new(x, y, z), Rgba8::new(r, g, b, 255)))
    }
}

/// Write every point, one per line, replacing `path` in a single rename so
/// readers never observe a partial log.
pub fn write_point_log(path: &Path, points: &[LidarPoint]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let staging = path.with_extension("partial");
    {
        let mut writer = BufWriter::new(fs::File::create(&staging)?);
        for point in points {
            writeln!(writer, "{}", point.to_line())?;
        }
        writer.flush()?;
    }
    fs::rename(&staging, path)
}

pub fn read_point_log(path: &Path) -> io::Result<Vec<LidarPoint>> {
    let text = fs::read_to_string(path)?;
    Ok(text.lines().filter_map(LidarPoint::parse_line).collect())
}

/// Index `N` of a `scan_points_N.txt` file name.
pub fn scan_file_index(path: &Path) -> Option<u32> {
    if path.extension()? != SCAN_FILE_EXTENSION {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(SCAN_FILE_PREFIX)?
        .parse()
        .ok()
}

/// Scan logs in `dir`, ascending by index. A missing directory has none.
pub fn list_scan_files(dir: &Path) -> io::Result<Vec<(u32, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if let Some(index) = scan_file_index(&path) {
            files.push((index, path));
        }
    }
    files.sort_by_key(|(index, _)| *index);
    Ok(files)
}

/// First index not used by an existing scan log.
pub fn next_free_scan_index(dir: &Path) -> io::Result<u32> {
    Ok(list_scan_files(dir)?
        .last()
        .map_or(0, |(index, _)| index.saturating_add(1)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedLog {
    pub path: PathBuf,
    pub files: usize,
    pub lines: usize,
}

/// Concatenate every scan log in `dir` into `CombinedMapPoints.txt`, in
/// ascending index order.
pub fn combine_scan_files(dir: &Path) -> io::Result<CombinedLog> {
    let files = list_scan_files(dir)?;
    fs::create_dir_all(dir)?;

    let path = dir.join(COMBINED_SCAN_FILE);
    let staging = path.with_extension("partial");
    let mut lines = 0;
    {
        let mut writer = BufWriter::new(fs::File::create(&staging)?);
        for (_, file) in &files {
            let text = fs::read_to_string(file)?;
            for line in text.lines().filter(|line| !line.trim().is_empty()) {
                writeln!(writer, "{line}")?;
                lines += 1;
            }
        }
        writer.flush()?;
    }
    fs::rename(&staging, &path)?;

    Ok(CombinedLog {
        path,
        files: files.len(),
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_drop_alpha_and_parse_back() {
        let point = LidarPoint::new(Vec3::new(1.5, -2.0, 0.25), Rgba8::new(10, 20, 30, 40));
        let line = point.to_line();
        assert_eq!(line, "1.500000 -2.000000 0.250000 10 20 30");

        let parsed = LidarPoint::parse_line(&line).unwrap();
        assert_eq!(parsed.position, point.position);
        assert_eq!(parsed.colour, Rgba8::new(10, 20, 30, 255));
        assert!(LidarPoint::parse_line("1 2 3 4 5").is_none());
        assert!(LidarPoint::parse_line("1 2 3 4 5 300").is_none());
    }

    #[test]
    fn log_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ScannedData").join("scan_points_0.txt");
        let points = vec![LidarPoint::new(Vec3::ONE, Rgba8::new(255, 255, 255, 255))];

        write_point_log(&path, &points).unwrap();

        assert_eq!(read_point_log(&path).unwrap(), points);
        assert!(!path.with_extension("partial").exists());
    }

    #[test]
    fn scan_files_sort_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for index in [10, 2, 0] {
            let point = LidarPoint::new(Vec3::splat(index as f32), Rgba8::default());
            write_point_log(&dir.path().join(format!("scan_points_{index}.txt")), &[point])
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let indices: Vec<u32> = list_scan_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        assert_eq!(indices, vec![0, 2, 10]);
        assert_eq!(next_free_scan_index(dir.path()).unwrap(), 11);
        assert_eq!(next_free_scan_index(&dir.path().join("absent")).unwrap(), 0);
    }

    #[test]
    fn combined_log_concatenates_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = LidarPoint::new(Vec3::ZERO, Rgba8::new(1, 1, 1, 255));
        let second = LidarPoint::new(Vec3::X, Rgba8::new(2, 2, 2, 255));
        write_point_log(&dir.path().join("scan_points_1.txt"), &[second]).unwrap();
        write_point_log(&dir.path().join("scan_points_0.txt"), &[first, first]).unwrap();

        let combined = combine_scan_files(dir.path()).unwrap();

        assert_eq!(combined.files, 2);
        assert_eq!(combined.lines, 3);
        let points = read_point_log(&combined.path).unwrap();
        assert_eq!(points, vec![first, first, second]);
    }
}
