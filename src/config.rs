//! Detector configuration: level thresholds and optional debug WAV taps.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Which FSK sub-detector algorithm variant `package()` should run during
/// the first AM pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FskPulseDetectMode {
    /// Schmitt-trigger variant that requires an explicit wrap-up call to
    /// flush its last pending pulse/gap.
    Classic,
    /// Running min/max peak-follower variant; self-flushing, no wrap-up.
    MinMax,
}

/// Debug-output verbosity. Higher levels do strictly more than lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verbosity {
    /// No per-sample or per-package diagnostics.
    Quiet,
    /// Accumulate the per-sample attenuation histogram and log level
    /// snapshots at package emission.
    Notice,
    /// Also log the histogram at package emission.
    Info,
    /// Also log the histogram on plain buffer exhaustion (no package yet).
    Debug,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Quiet
    }
}

/// Threshold/estimator configuration, set once via
/// [`crate::detector::PulseDetector::set_levels`].
///
/// A negative `fixed_high_level_db` engages a manual (static-mode) OOK
/// threshold; zero or positive means automatic (peak-follower mode).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    /// Whether the envelope stream is a magnitude (`true`) or amplitude
    /// (`false`) estimator. Selects `DB_TO_MAG`/`DB_TO_AMP` scaling.
    pub use_mag_est: bool,
    /// Manual high-level override in dB; negative engages it, >=0 disables
    /// (auto/peak-follower mode is used instead).
    pub fixed_high_level_db: f32,
    /// Minimum estimate of the OOK high level, in dB.
    pub min_high_level_db: f32,
    /// Default ratio between high and low (noise) level, in dB.
    pub high_low_ratio_db: f32,
    /// Diagnostic verbosity.
    pub verbosity: Verbosity,
}

impl Default for Levels {
    /// Matches the original detector's creation-time defaults:
    /// amplitude estimator, auto high level, -12.1442 dB minimum, 9 dB ratio.
    fn default() -> Self {
        Self {
            use_mag_est: false,
            fixed_high_level_db: 0.0,
            min_high_level_db: -12.1442,
            high_low_ratio_db: 9.0,
            verbosity: Verbosity::Quiet,
        }
    }
}

impl Levels {
    /// Builder-style setter for [`Levels::use_mag_est`].
    pub fn with_use_mag_est(mut self, use_mag_est: bool) -> Self {
        self.use_mag_est = use_mag_est;
        self
    }

    /// Builder-style setter for [`Levels::fixed_high_level_db`].
    pub fn with_fixed_high_level_db(mut self, db: f32) -> Self {
        self.fixed_high_level_db = db;
        self
    }

    /// Builder-style setter for [`Levels::min_high_level_db`].
    pub fn with_min_high_level_db(mut self, db: f32) -> Self {
        self.min_high_level_db = db;
        self
    }

    /// Builder-style setter for [`Levels::high_low_ratio_db`].
    pub fn with_high_low_ratio_db(mut self, db: f32) -> Self {
        self.high_low_ratio_db = db;
        self
    }

    /// Builder-style setter for [`Levels::verbosity`].
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Load levels from a JSON file, falling back to [`Levels::default`] for
    /// a file that doesn't exist yet.
    pub fn load_from_json(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read levels config at {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse levels config at {}", path.display()))
    }

    /// Serialize to a pretty-printed JSON file.
    pub fn save_to_json(&self, path: &Path) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(self).context("failed to serialize levels")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write levels config at {}", path.display()))
    }
}

/// Where (if anywhere) to write optional debug WAV taps.
///
/// Default is `None` — taps are a pure debugging aid and must never be a
/// required side effect of running the detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavTapConfig {
    #[default]
    None,
    /// Write the six named debug taps under this directory.
    Directory(PathBuf),
}

/// Convert a dB value to a full-scale-relative amplitude level (power
/// ratio, `/10`): `10^(db/10) * 32767`.
pub fn db_to_amp(db: f32) -> i32 {
    (10f32.powf(db / 10.0) * 32767.0) as i32
}

/// Convert a dB value to a full-scale-relative magnitude level (voltage
/// ratio, `/20`): `10^(db/20) * 32767`.
pub fn db_to_mag(db: f32) -> i32 {
    (10f32.powf(db / 20.0) * 32767.0) as i32
}

/// Convert a dB value to an unscaled amplitude power ratio: `10^(db/10)`.
/// Used for the high/low ratio, which multiplies an existing level estimate
/// rather than a full-scale reference.
pub fn db_to_amp_ratio(db: f32) -> i32 {
    10f32.powf(db / 10.0) as i32
}

/// Convert a dB value to an unscaled magnitude voltage ratio: `10^(db/20)`.
pub fn db_to_mag_ratio(db: f32) -> i32 {
    10f32.powf(db / 20.0) as i32
}
