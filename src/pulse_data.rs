//! Fixed-capacity pulse/gap package produced by the OOK/FSK detector.

use serde::{Deserialize, Serialize};

/// Maximum number of (pulse, gap) pairs a single package can hold.
pub const PD_MAX_PULSES: usize = 4000;

fn serialize_fixed_i32<S>(arr: &[i32; PD_MAX_PULSES], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    arr.as_slice().serialize(serializer)
}

fn deserialize_fixed_i32<'de, D>(deserializer: D) -> Result<[i32; PD_MAX_PULSES], D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v: Vec<i32> = Vec::deserialize(deserializer)?;
    let mut out = [0i32; PD_MAX_PULSES];
    let n = v.len().min(PD_MAX_PULSES);
    out[..n].copy_from_slice(&v[..n]);
    Ok(out)
}

/// A bounded sequence of pulse/gap sample-count durations plus metadata,
/// emitted by [`crate::detector::PulseDetector::package`] when an OOK or
/// FSK package is complete.
///
/// Packages are caller-owned: the detector only reads and writes the fields
/// during a `package()` call, never allocates or frees one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseData {
    /// Sample rate the durations below are expressed in.
    pub sample_rate: u32,
    /// Sample offset of the package start, relative to the start of the
    /// overall input stream.
    pub offset: u64,
    /// Samples from the start of the current input buffer to the package
    /// start (aging counter carried across buffer boundaries).
    pub start_ago: u64,
    /// Samples from the start of the current input buffer to the package
    /// end; set when the package completes.
    pub end_ago: u64,
    /// Number of valid `(pulse[i], gap[i])` pairs.
    pub num_pulses: usize,
    /// Pulse durations, in samples.
    #[serde(
        serialize_with = "serialize_fixed_i32",
        deserialize_with = "deserialize_fixed_i32"
    )]
    pub pulse: [i32; PD_MAX_PULSES],
    /// Gap durations, in samples.
    #[serde(
        serialize_with = "serialize_fixed_i32",
        deserialize_with = "deserialize_fixed_i32"
    )]
    pub gap: [i32; PD_MAX_PULSES],
    /// FSK carrier frequency estimate 1 (only meaningful for FSK packages).
    pub fsk_f1_est: i32,
    /// FSK carrier frequency estimate 2 (only meaningful for FSK packages).
    pub fsk_f2_est: i32,
    /// Snapshot of the OOK low (noise) level estimate at package emission.
    pub ook_low_estimate: i32,
    /// Snapshot of the OOK high level estimate at package emission.
    pub ook_high_estimate: i32,
}

impl Default for PulseData {
    fn default() -> Self {
        Self {
            sample_rate: 0,
            offset: 0,
            start_ago: 0,
            end_ago: 0,
            num_pulses: 0,
            pulse: [0; PD_MAX_PULSES],
            gap: [0; PD_MAX_PULSES],
            fsk_f1_est: 0,
            fsk_f2_est: 0,
            ook_low_estimate: 0,
            ook_high_estimate: 0,
        }
    }
}

impl PulseData {
    /// Create an empty package.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the empty state, preserving no prior package data. Matches
    /// `pulse_data_clear()` in the original C: called on entry into a fresh
    /// package, not between buffers.
    pub fn clear(&mut self) {
        self.sample_rate = 0;
        self.offset = 0;
        self.start_ago = 0;
        self.end_ago = 0;
        self.num_pulses = 0;
        self.fsk_f1_est = 0;
        self.fsk_f2_est = 0;
        self.ook_low_estimate = 0;
        self.ook_high_estimate = 0;
        // pulse/gap contents beyond num_pulses are never read; no need to zero them.
    }

    /// Valid pulse durations (`pulse[0..num_pulses]`).
    pub fn pulses(&self) -> &[i32] {
        &self.pulse[..self.num_pulses]
    }

    /// Valid gap durations (`gap[0..num_pulses]`).
    pub fn gaps(&self) -> &[i32] {
        &self.gap[..self.num_pulses]
    }
}
