/// Default output root when no configuration is supplied
pub const DEFAULT_OUTPUT_ROOT: &str = "Saved";

/// Directory under the output root holding baked colour maps, one folder per map
pub const BAKED_DATA_DIR: &str = "BakedMatData";

/// Directory under the output root holding scan point logs
pub const SCAN_DATA_DIR: &str = "ScannedData";

/// Scan logs are named `<prefix><index>.<extension>`
pub const SCAN_FILE_PREFIX: &str = "scan_points_";
pub const SCAN_FILE_EXTENSION: &str = "txt";

/// Concatenation of every scan log in the scan directory
pub const COMBINED_SCAN_FILE: &str = "CombinedMapPoints.txt";

/// Aggregator summary written next to the combined file
pub const SCAN_SUMMARY_FILE: &str = "scan_summary.json";

/// Point cloud export written by the aggregator
pub const SCAN_PLY_FILE: &str = "CombinedMapPoints.ply";
