//! # Batch configuration
//!
//! [`Config`] gathers every tunable of the hit analysis pipeline: the classifier
//! thresholds, which passes run, the progress-log cadence, and the optional root
//! directory of the debug-image sink.
//!
//! ## Overview
//! -----------------
//! A [`Config`] is built either with [`Config::default`] or through the fluent,
//! validating [`ConfigBuilder`]:
//!
//! ```rust
//! use hitsieve::config::Config;
//!
//! let config = Config::builder()
//!     .out_dir("/tmp/hits-debug")
//!     .hot_pixel_often(4)
//!     .near_hot_pixel_distance(3.5)
//!     .build()
//!     .unwrap();
//! assert!(config.debug_enabled());
//! ```
//!
//! The configuration is owned by the caller and passed by reference into every
//! stage; no stage keeps global state.
//!
//! ## Logging
//! -----------------
//! [`Config::print_log`] logs a step through the `log` facade together with the
//! time elapsed since the previous step, and is silenced by `log = false`.
use std::time::Instant;

use camino::Utf8PathBuf;
use log::info;

use crate::{
    constants::{
        DEFAULT_BRIGHT_AREA_CUTOFF, DEFAULT_BRIGHT_THRESHOLD, DEFAULT_HOT_PIXEL_OFTEN,
        DEFAULT_LOG_EVERY, DEFAULT_NEAR_HOT_PIXEL_DISTANCE, DEFAULT_NEAR_HOT_PIXEL_OFTEN,
        DEFAULT_TIME_DIVISION, DEFAULT_TOO_OFTEN,
    },
    hitsieve_errors::HitSieveError,
    io::png_sink::store_png,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root of the debug-image sink; `None` disables every debug write.
    pub out_dir: Option<Utf8PathBuf>,
    pub log: bool,
    /// Elements seen by the extractor between two progress lines.
    pub log_every: usize,

    // --- Partitioning ---
    /// Time window (ms) of the "too often" pass and of the device-minute partition.
    pub time_division: i64,

    // --- Classifier thresholds ---
    pub hot_pixel_often: usize,
    pub near_hot_pixel_often: usize,
    pub near_hot_pixel_distance: f64,
    pub near_hot_pixel2_often: usize,
    pub near_hot_pixel2_distance: f64,
    pub too_often: usize,
    /// Pixel value from which a pixel counts toward the bright area.
    pub bright_threshold: u8,
    /// Bright area cutoff in per-mille of the image area.
    pub bright_area_cutoff: f64,

    // --- Pass toggles ---
    pub reconstruct: bool,
    pub hot_pixel: bool,
    pub near_hot_pixel: bool,
    pub near_hot_pixel2: bool,
    pub too_often_enabled: bool,
    pub too_large_bright_area: bool,
    /// Drop decoded rasters once every pass is done.
    pub release_images: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            out_dir: None,
            log: true,
            log_every: DEFAULT_LOG_EVERY,
            time_division: DEFAULT_TIME_DIVISION,
            hot_pixel_often: DEFAULT_HOT_PIXEL_OFTEN,
            near_hot_pixel_often: DEFAULT_NEAR_HOT_PIXEL_OFTEN,
            near_hot_pixel_distance: DEFAULT_NEAR_HOT_PIXEL_DISTANCE,
            near_hot_pixel2_often: DEFAULT_NEAR_HOT_PIXEL_OFTEN,
            near_hot_pixel2_distance: DEFAULT_NEAR_HOT_PIXEL_DISTANCE,
            too_often: DEFAULT_TOO_OFTEN,
            bright_threshold: DEFAULT_BRIGHT_THRESHOLD,
            bright_area_cutoff: DEFAULT_BRIGHT_AREA_CUTOFF,
            reconstruct: true,
            hot_pixel: true,
            near_hot_pixel: true,
            near_hot_pixel2: true,
            too_often_enabled: true,
            too_large_bright_area: true,
            release_images: true,
        }
    }
}

impl Config {
    /// Construct a new [`Config`] with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`ConfigBuilder`] initialized with the default values.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Check the rules enforced by [`ConfigBuilder::build`].
    ///
    /// The fields are public, so a hand-assembled [`Config`] can skip the builder; the
    /// batch entry points call this before using it.
    pub fn validate(&self) -> Result<(), HitSieveError> {
        if self.log_every == 0 {
            return Err(invalid("log_every must be at least 1"));
        }
        if self.time_division <= 0 {
            return Err(invalid("time_division must be positive"));
        }
        for (name, v) in [
            ("hot_pixel_often", self.hot_pixel_often),
            ("near_hot_pixel_often", self.near_hot_pixel_often),
            ("near_hot_pixel2_often", self.near_hot_pixel2_often),
            ("too_often", self.too_often),
        ] {
            if v == 0 {
                return Err(invalid(&format!("{name} must be at least 1")));
            }
        }
        for (name, v) in [
            ("near_hot_pixel_distance", self.near_hot_pixel_distance),
            ("near_hot_pixel2_distance", self.near_hot_pixel2_distance),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(invalid(&format!("{name} must be finite and positive")));
            }
        }
        if !self.bright_area_cutoff.is_finite() || self.bright_area_cutoff < 0.0 {
            return Err(invalid("bright_area_cutoff must be finite and non-negative"));
        }
        Ok(())
    }

    /// `true` when a debug-image root is configured.
    pub fn debug_enabled(&self) -> bool {
        self.out_dir.is_some()
    }

    /// Log one pipeline step and its timing.
    ///
    /// Arguments
    /// -----------------
    /// * `message`: the step description.
    /// * `since`: start of the step being reported; when given, the elapsed time is appended.
    ///
    /// Return
    /// ----------
    /// * The current instant, to be passed as `since` of the next step.
    pub fn print_log(&self, message: &str, since: Option<Instant>) -> Instant {
        if self.log {
            log_step(message, since);
        }
        Instant::now()
    }

    /// Store a PNG payload under `<out_dir>/<path...>/<name>.png`.
    ///
    /// Does nothing when no `out_dir` is configured.
    pub fn store_png<S: AsRef<str>>(
        &self,
        path: &[S],
        name: impl std::fmt::Display,
        png: &[u8],
    ) -> Result<(), HitSieveError> {
        match &self.out_dir {
            Some(root) => store_png(root, path, name, png),
            None => Ok(()),
        }
    }
}

/// Builder for [`Config`], with validation.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn out_dir(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.config.out_dir = Some(v.into());
        self
    }
    pub fn maybe_out_dir(mut self, v: Option<Utf8PathBuf>) -> Self {
        self.config.out_dir = v;
        self
    }
    pub fn log(mut self, v: bool) -> Self {
        self.config.log = v;
        self
    }
    pub fn log_every(mut self, v: usize) -> Self {
        self.config.log_every = v;
        self
    }
    pub fn time_division(mut self, v: i64) -> Self {
        self.config.time_division = v;
        self
    }

    // --- Thresholds ---
    pub fn hot_pixel_often(mut self, v: usize) -> Self {
        self.config.hot_pixel_often = v;
        self
    }
    pub fn near_hot_pixel_often(mut self, v: usize) -> Self {
        self.config.near_hot_pixel_often = v;
        self
    }
    pub fn near_hot_pixel_distance(mut self, v: f64) -> Self {
        self.config.near_hot_pixel_distance = v;
        self
    }
    pub fn near_hot_pixel2_often(mut self, v: usize) -> Self {
        self.config.near_hot_pixel2_often = v;
        self
    }
    pub fn near_hot_pixel2_distance(mut self, v: f64) -> Self {
        self.config.near_hot_pixel2_distance = v;
        self
    }
    pub fn too_often(mut self, v: usize) -> Self {
        self.config.too_often = v;
        self
    }
    pub fn bright_threshold(mut self, v: u8) -> Self {
        self.config.bright_threshold = v;
        self
    }
    pub fn bright_area_cutoff(mut self, v: f64) -> Self {
        self.config.bright_area_cutoff = v;
        self
    }

    // --- Toggles ---
    pub fn reconstruct(mut self, v: bool) -> Self {
        self.config.reconstruct = v;
        self
    }
    pub fn hot_pixel(mut self, v: bool) -> Self {
        self.config.hot_pixel = v;
        self
    }
    pub fn near_hot_pixel(mut self, v: bool) -> Self {
        self.config.near_hot_pixel = v;
        self
    }
    pub fn near_hot_pixel2(mut self, v: bool) -> Self {
        self.config.near_hot_pixel2 = v;
        self
    }
    pub fn too_often_enabled(mut self, v: bool) -> Self {
        self.config.too_often_enabled = v;
        self
    }
    pub fn too_large_bright_area(mut self, v: bool) -> Self {
        self.config.too_large_bright_area = v;
        self
    }
    pub fn release_images(mut self, v: bool) -> Self {
        self.config.release_images = v;
        self
    }

    /// Finalize the builder and produce a [`Config`].
    ///
    /// Validation rules
    /// -----------------
    /// * `log_every ≥ 1`, `time_division > 0`.
    /// * Every `*_often` threshold is `≥ 1` (a threshold of 0 would flag empty groups).
    /// * Both near-pixel distances are finite and `> 0`.
    /// * `bright_area_cutoff` is finite and `≥ 0`.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(Config)` or `Err(HitSieveError::InvalidConfig)` naming the first failing rule.
    pub fn build(self) -> Result<Config, HitSieveError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Emit one `info!` progress line, with the elapsed time since `since` when given.
pub(crate) fn log_step(message: &str, since: Option<Instant>) {
    match since {
        Some(t) => info!("{message} ({:.3}s)", t.elapsed().as_secs_f64()),
        None => info!("{message}"),
    }
}

fn invalid(msg: &str) -> HitSieveError {
    HitSieveError::InvalidConfig(msg.to_string())
}
