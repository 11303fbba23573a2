//! Configuration module.
//!
//! Handles loading, validating, and merging `fitframe.toml`. Stock defaults
//! are overridden by whatever the user file specifies; missing keys keep
//! their defaults and unknown keys are rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [defaults]
//! width = 1280                  # Target width when a request omits it
//! height = 720                  # Target height when a request omits it
//! policy = "stretch"            # stretch | crop-to-fill | pad-to-fit
//! preserve_aspect_ratio = false # Stretch only: letterbox instead of distorting
//! fill_color = "#FFFFFF"        # Padding color (#RGB, #RRGGBB, #RRGGBBAA, or a name)
//!
//! [limits]
//! max_image_dimension = 16384   # Reject sources wider or taller than this
//! max_alloc_mb = 512            # Decoder allocation ceiling
//! max_output_dimension = 16384  # Reject targets or scaled sizes wider or taller than this
//! max_output_megapixels = 100   # Reject targets or scaled sizes with more pixels than this
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//!
//! [logging]
//! level = "info"                # trace | debug | info | warn | error
//! format = "pretty"             # pretty | json
//! ```

use crate::imaging::{Dimensions, FillColor, FitPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `fitframe.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Values used for any field a transform request leaves out.
    pub defaults: DefaultsConfig,
    /// Decoder safety limits.
    pub limits: LimitsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.width == 0 || self.defaults.height == 0 {
            return Err(ConfigError::Validation(
                "defaults.width and defaults.height must be non-zero".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::Validation(
                "limits.max_image_dimension must be non-zero".into(),
            ));
        }
        if self.limits.max_alloc_mb == 0 {
            return Err(ConfigError::Validation(
                "limits.max_alloc_mb must be non-zero".into(),
            ));
        }
        if self.limits.max_output_dimension == 0 || self.limits.max_output_megapixels == 0 {
            return Err(ConfigError::Validation(
                "limits.max_output_dimension and limits.max_output_megapixels must be non-zero"
                    .into(),
            ));
        }
        if !self
            .limits
            .allows_output(Dimensions::new(self.defaults.width, self.defaults.height))
        {
            return Err(ConfigError::Validation(format!(
                "defaults {}x{} exceed the output limits",
                self.defaults.width, self.defaults.height
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {LOG_LEVELS:?}, got '{}'",
                self.logging.level
            )));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.format must be one of {LOG_FORMATS:?}, got '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Request defaults: 1280x720 stretch with white padding, the size the upload
/// endpoint assumes when a client sends only an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub width: u32,
    pub height: u32,
    pub policy: FitPolicy,
    pub preserve_aspect_ratio: bool,
    pub fill_color: FillColor,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            policy: FitPolicy::Stretch,
            preserve_aspect_ratio: false,
            fill_color: FillColor::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest accepted source width or height, in pixels.
    pub max_image_dimension: u32,
    /// Upper bound on decoder allocations, in MiB.
    pub max_alloc_mb: u64,
    /// Largest target or intermediate scaled width or height, in pixels.
    pub max_output_dimension: u32,
    /// Largest target or intermediate scaled area, in millions of pixels.
    pub max_output_megapixels: u32,
}

impl LimitsConfig {
    /// Whether a buffer of `size` fits the output budget.
    pub fn allows_output(&self, size: Dimensions) -> bool {
        size.width <= self.max_output_dimension
            && size.height <= self.max_output_dimension
            && size.area() <= u64::from(self.max_output_megapixels) * 1_000_000
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: 16384,
            max_alloc_mb: 512,
            max_output_dimension: 16384,
            max_output_megapixels: 100,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel transform workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`, falling back to stock defaults when
/// it does not exist.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `fitframe.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# fitframe Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Request defaults (used for any field a transform request leaves out)
# ---------------------------------------------------------------------------
[defaults]
width = 1280
height = 720

# How the source is fitted into width x height:
#   stretch       resample to the target size
#   crop-to-fill  cover the target, center-crop the overflow
#   pad-to-fit    fit inside the target, fill the margins with fill_color
policy = "stretch"

# Stretch only: letterbox inside the target box (like pad-to-fit) instead
# of distorting. The output is always exactly width x height.
preserve_aspect_ratio = false

# Padding color: #RGB, #RGBA, #RRGGBB, #RRGGBBAA, or a name like "transparent".
fill_color = "#FFFFFF"

# ---------------------------------------------------------------------------
# Decoder and output limits
# ---------------------------------------------------------------------------
[limits]
# Sources wider or taller than this are rejected as undecodable.
max_image_dimension = 16384

# Ceiling on decoder memory, in MiB.
max_alloc_mb = 512

# Targets, and the scaled image a policy needs on the way to them, must stay
# within these bounds. Oversized targets fail validation before decoding.
max_output_dimension = 16384
max_output_megapixels = 100

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of parallel workers for `batch`.
# Omit to use all CPU cores. Values above the core count are clamped down.
# max_processes = 4

# ---------------------------------------------------------------------------
# Logging (RUST_LOG overrides the level)
# ---------------------------------------------------------------------------
[logging]
# trace | debug | info | warn | error
level = "info"

# pretty | json
format = "pretty"
"##
}
