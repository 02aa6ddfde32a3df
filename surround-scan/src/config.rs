/// Runtime settings and on-disk layout for baking and scanning
use bevy::prelude::*;
use constants::bake::{
    BAKE_RESOLUTION, BAKE_SETTLE_AFTER_CAPTURE_MS, BAKE_SETTLE_BEFORE_CAPTURE_MS,
    BAKED_RECORD_EXTENSION, EDITOR_SESSION_PREFIX, UNNAMED_MATERIAL, UNNAMED_MESH,
};
use constants::paths::{
    BAKED_DATA_DIR, COMBINED_SCAN_FILE, DEFAULT_OUTPUT_ROOT, SCAN_DATA_DIR, SCAN_FILE_EXTENSION,
    SCAN_FILE_PREFIX,
};
use constants::scan::{
    COVERAGE_BUCKET_DEGREES, SCAN_FAN_RAYS, SCAN_FAN_WIDTH_DEGREES, SCAN_ITERATION_PAUSE_MS,
    SCAN_PITCH_STEP_DEGREES, SCAN_RAY_RANGE, SCAN_VERTICAL_FOV_DEGREES,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeSettings {
    pub resolution: u32,
    pub settle_before_capture_ms: u64,
    pub settle_after_capture_ms: u64,
    pub editor_session_prefix: String,
}

impl Default for BakeSettings {
    fn default() -> Self {
        Self {
            resolution: BAKE_RESOLUTION,
            settle_before_capture_ms: BAKE_SETTLE_BEFORE_CAPTURE_MS,
            settle_after_capture_ms: BAKE_SETTLE_AFTER_CAPTURE_MS,
            editor_session_prefix: EDITOR_SESSION_PREFIX.to_string(),
        }
    }
}

impl BakeSettings {
    pub fn settle_before_capture(&self) -> Duration {
        Duration::from_millis(self.settle_before_capture_ms)
    }

    pub fn settle_after_capture(&self) -> Duration {
        Duration::from_millis(self.settle_after_capture_ms)
    }
}

/// Geometry and pacing of the background ray sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    pub range: f32,
    pub vertical_fov_degrees: f32,
    pub pitch_step_degrees: f32,
    pub fan_rays: u32,
    pub fan_width_degrees: f32,
    pub iteration_pause_ms: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            range: SCAN_RAY_RANGE,
            vertical_fov_degrees: SCAN_VERTICAL_FOV_DEGREES,
            pitch_step_degrees: SCAN_PITCH_STEP_DEGREES,
            fan_rays: SCAN_FAN_RAYS,
            fan_width_degrees: SCAN_FAN_WIDTH_DEGREES,
            iteration_pause_ms: SCAN_ITERATION_PAUSE_MS,
        }
    }
}

impl SweepSettings {
    pub fn iteration_pause(&self) -> Duration {
        Duration::from_millis(self.iteration_pause_ms)
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurroundScanConfig {
    pub output_root: PathBuf,
    pub bake: BakeSettings,
    pub sweep: SweepSettings,
    pub coverage_bucket_degrees: f32,
}

impl Default for SurroundScanConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            bake: BakeSettings::default(),
            sweep: SweepSettings::default(),
            coverage_bucket_degrees: COVERAGE_BUCKET_DEGREES,
        }
    }
}

impl SurroundScanConfig {
    /// Defaults with a different output root.
    pub fn with_output_root(root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: root.into(),
            ..Default::default()
        }
    }

    /// Load a JSON config. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bake.resolution == 0 {
            return Err(ConfigError::Invalid("bake resolution must be non-zero".into()));
        }
        if !(self.coverage_bucket_degrees > 0.0 && self.coverage_bucket_degrees <= 360.0) {
            return Err(ConfigError::Invalid(format!(
                "coverage bucket of {} degrees",
                self.coverage_bucket_degrees
            )));
        }
        if self.sweep.fan_rays == 0 || self.sweep.range <= 0.0 {
            return Err(ConfigError::Invalid("sweep needs rays with positive range".into()));
        }
        if self.sweep.pitch_step_degrees <= 0.0 || self.sweep.vertical_fov_degrees <= 0.0 {
            return Err(ConfigError::Invalid("sweep pitch step and fov must be positive".into()));
        }
        Ok(())
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            root: self.output_root.clone(),
            editor_session_prefix: self.bake.editor_session_prefix.clone(),
        }
    }
}

/// Paths of everything written under the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    editor_session_prefix: String,
}

impl OutputLayout {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map identifier with the editor session prefix removed.
    pub fn sanitize_map_name<'a>(&self, map_name: &'a str) -> &'a str {
        if self.editor_session_prefix.is_empty() {
            return map_name;
        }
        map_name
            .strip_prefix(self.editor_session_prefix.as_str())
            .unwrap_or(map_name)
    }

    pub fn baked_dir(&self, map_name: &str) -> PathBuf {
        self.root
            .join(BAKED_DATA_DIR)
            .join(file_component(self.sanitize_map_name(map_name)))
    }

    /// `<root>/BakedMatData/<map>/<mesh>_<material>.bin`
    pub fn baked_record(
        &self,
        map_name: &str,
        mesh_name: Option<&str>,
        material_name: Option<&str>,
    ) -> PathBuf {
        let mesh = file_component(mesh_name.unwrap_or(UNNAMED_MESH));
        let material = file_component(material_name.unwrap_or(UNNAMED_MATERIAL));
        self.baked_dir(map_name)
            .join(format!("{mesh}_{material}.{BAKED_RECORD_EXTENSION}"))
    }

    pub fn scan_dir(&self) -> PathBuf {
        self.root.join(SCAN_DATA_DIR)
    }

    pub fn scan_file(&self, index: u32) -> PathBuf {
        self.scan_dir()
            .join(format!("{SCAN_FILE_PREFIX}{index}.{SCAN_FILE_EXTENSION}"))
    }

    pub fn combined_file(&self) -> PathBuf {
        self.scan_dir().join(COMBINED_SCAN_FILE)
    }
}

/// Path separators in names would escape the target directory.
fn file_component(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
