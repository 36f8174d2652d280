//! OOK/FSK pulse detection core for SDR baseband envelope streams.
//!
//! Turns a pair of envelope streams (AM magnitude/amplitude and FM
//! instantaneous frequency) into discrete pulse packages for downstream
//! protocol decoders. See [`detector::PulseDetector`] for the entry point.
//!
//! This crate does not install a `tracing` subscriber itself — embedders
//! are expected to do that the way an application, not a library, should.

pub mod config;
pub mod dc_blocker;
pub mod detector;
pub mod error;
pub mod fsk;
pub mod median_filter;
pub mod peak_follower;
pub mod pulse_data;
pub mod wav_tap;

pub use config::{FskPulseDetectMode, Levels, Verbosity, WavTapConfig};
pub use dc_blocker::DcBlocker;
pub use detector::{
    PackageResult, PulseDetector, PD_MAX_GAP_MS, PD_MAX_GAP_RATIO, PD_MAX_PULSES, PD_MIN_GAP_MS,
    PD_MIN_PULSES, PD_MIN_PULSE_SAMPLES, PULSE_DATA_FSK, PULSE_DATA_OOK,
};
pub use error::{Error, Result};
pub use fsk::{Classic, FskSubDetector, MinMax};
pub use median_filter::MedianFilter;
pub use peak_follower::PeakFollower;
pub use pulse_data::PulseData;
pub use wav_tap::WavTap;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_surface_constructs_a_default_detector() {
        let mut detector = PulseDetector::new();
        detector.set_levels(Levels::default());
        let am = vec![0i16; 100];
        let fm = vec![0i16; 100];
        let mut pulses = PulseData::new();
        let mut fsk_pulses = PulseData::new();
        let result = detector.package(&am, &fm, 250_000, 0, &mut pulses, &mut fsk_pulses, FskPulseDetectMode::MinMax);
        assert_eq!(result, PackageResult::NeedMoreInput);
    }
}
