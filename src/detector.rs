//! Top-level OOK/FSK pulse detector: state machine, adaptive thresholds,
//! level estimation, FSK hand-off.

use std::path::Path;

use crate::config::{db_to_amp, db_to_amp_ratio, db_to_mag, db_to_mag_ratio, Levels, Verbosity, WavTapConfig};
use crate::fsk::{Classic, FskSubDetector, MinMax};
use crate::median_filter::MedianFilter;
use crate::peak_follower::PeakFollower;
use crate::pulse_data::PulseData;
use crate::wav_tap::WavTap;

/// Minimum number of samples a pulse or gap must span to be counted, rather
/// than rejected/folded as spurious.
pub const PD_MIN_PULSE_SAMPLES: i32 = 10;
/// Minimum number of FSK sub-pulses required before a long AM pulse is
/// treated as an FSK (rather than OOK) transmission.
pub const PD_MIN_PULSES: usize = 3;
/// Maximum number of `(pulse, gap)` pairs a package may hold before a forced
/// end-of-package. Re-exported from [`crate::pulse_data`].
pub const PD_MAX_PULSES: usize = crate::pulse_data::PD_MAX_PULSES;
/// Minimum gap length, in milliseconds, that combined with the gap/pulse
/// ratio can end a package.
pub const PD_MIN_GAP_MS: i32 = 10;
/// Maximum gap length, in milliseconds, that unconditionally ends a package.
pub const PD_MAX_GAP_MS: i32 = 50;
/// Gap-to-largest-pulse ratio that, combined with `PD_MIN_GAP_MS`, ends a
/// package.
pub const PD_MAX_GAP_RATIO: i32 = 10;

/// Slowness constant for the OOK high-level estimator's leaky filter.
const OOK_EST_HIGH_RATIO: i32 = 64;
/// Slowness constant for the OOK low-level (noise) estimator's leaky filter.
const OOK_EST_LOW_RATIO: i32 = 1024;
/// Minimum accepted signal strength for the peak follower, in dB.
const MIN_DB: f64 = -20.0;

/// Wire-compatible discriminator for an emitted OOK package.
pub const PULSE_DATA_OOK: u32 = 1;
/// Wire-compatible discriminator for an emitted FSK package.
pub const PULSE_DATA_FSK: u32 = 2;

/// Result of a [`PulseDetector::package`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageResult {
    /// The input buffer was fully consumed without completing a package.
    NeedMoreInput,
    /// An OOK package was completed; `pulses` holds its contents.
    Ook,
    /// An FSK package was completed; `fsk_pulses` holds its contents.
    Fsk,
}

impl From<PackageResult> for u32 {
    fn from(r: PackageResult) -> Self {
        match r {
            PackageResult::NeedMoreInput => 0,
            PackageResult::Ook => PULSE_DATA_OOK,
            PackageResult::Fsk => PULSE_DATA_FSK,
        }
    }
}

impl TryFrom<u32> for PackageResult {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PackageResult::NeedMoreInput),
            PULSE_DATA_OOK => Ok(PackageResult::Ook),
            PULSE_DATA_FSK => Ok(PackageResult::Fsk),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OokState {
    Idle,
    Pulse,
    GapStart,
    Gap,
}

/// Six named debug taps, mirroring the original's `dump*.wav` files, lazily
/// created under a configured directory on first use.
struct Taps {
    am_demod: Option<WavTap>,
    fm_demod: Option<WavTap>,
    am_peak_high: Option<WavTap>,
    am_peak_low: Option<WavTap>,
    am_decoded: Option<WavTap>,
    fm_decoded: Option<WavTap>,
}

impl Taps {
    fn create(dir: &Path, samp_rate: u32) -> Self {
        let open = |name: &str| match WavTap::create(dir.join(name), samp_rate, 4096) {
            Ok(tap) => Some(tap),
            Err(e) => {
                tracing::warn!(path = %dir.join(name).display(), error = %e, "disabling wav tap");
                None
            }
        };
        Self {
            am_demod: open("am_demod.wav"),
            fm_demod: open("fm_demod.wav"),
            am_peak_high: open("am_peak_high.wav"),
            am_peak_low: open("am_peak_low.wav"),
            am_decoded: open("am_decoded.wav"),
            fm_decoded: open("fm_decoded.wav"),
        }
    }

    fn write(tap: &mut Option<WavTap>, sample: i16) {
        if let Some(t) = tap {
            t.write_sample(sample);
        }
    }
}

/// Top-level OOK/FSK pulse detector.
///
/// Owns its sub-objects exclusively (median filter, dual AM/FM peak
/// followers, optional debug taps) and is fed buffer-by-buffer via
/// [`PulseDetector::package`]. `am`/`fm` input slices and the output
/// `pulses`/`fsk_pulses` records are caller-owned.
pub struct PulseDetector {
    levels: Levels,
    ook_fixed_high_level: i32,
    ook_min_high_level: i32,
    ook_high_low_ratio: i32,

    ook_state: OokState,
    pulse_length: i32,
    max_pulse: i32,
    data_counter: usize,
    lead_in_counter: i32,

    ook_low_estimate: i32,
    ook_high_estimate: i32,

    median_filter: MedianFilter,
    peak_follower_am: PeakFollower,
    peak_follower_fm: PeakFollower,
    use_peak_follower: bool,

    fsk: Box<dyn FskSubDetector + Send>,

    out_am: i16,
    out_fm: i16,

    wav_tap_config: WavTapConfig,
    taps: Option<Taps>,
}

impl PulseDetector {
    /// Create a detector with default thresholds (amplitude estimator,
    /// automatic high level, -12.1442 dB minimum, 9 dB ratio).
    pub fn new() -> Self {
        let levels = Levels::default();
        let mut detector = Self {
            levels,
            ook_fixed_high_level: 0,
            ook_min_high_level: 0,
            ook_high_low_ratio: 0,
            ook_state: OokState::Idle,
            pulse_length: 0,
            max_pulse: 0,
            data_counter: 0,
            lead_in_counter: 0,
            ook_low_estimate: 0,
            ook_high_estimate: 0,
            median_filter: MedianFilter::new(15),
            peak_follower_am: PeakFollower::new(0.05, 0.99999, MIN_DB),
            peak_follower_fm: PeakFollower::new(0.05, 0.99999, MIN_DB),
            use_peak_follower: true,
            fsk: Box::new(MinMax::default()),
            out_am: 0,
            out_fm: 0,
            wav_tap_config: WavTapConfig::None,
            taps: None,
        };
        detector.apply_levels();
        detector
    }

    /// Re-parameterise detection thresholds and verbosity.
    pub fn set_levels(&mut self, levels: Levels) {
        self.levels = levels;
        self.apply_levels();
    }

    /// Configure (or disable) the six debug WAV taps. Taking effect lazily,
    /// on the next `package()` call.
    pub fn set_wav_tap_config(&mut self, config: WavTapConfig) {
        self.wav_tap_config = config;
        self.taps = None;
    }

    fn apply_levels(&mut self) {
        let (amp, amp_ratio) = if self.levels.use_mag_est {
            (db_to_mag as fn(f32) -> i32, db_to_mag_ratio as fn(f32) -> i32)
        } else {
            (db_to_amp as fn(f32) -> i32, db_to_amp_ratio as fn(f32) -> i32)
        };
        self.ook_fixed_high_level = if self.levels.fixed_high_level_db < 0.0 {
            amp(self.levels.fixed_high_level_db)
        } else {
            0
        };
        self.ook_min_high_level = amp(self.levels.min_high_level_db);
        self.ook_high_low_ratio = amp_ratio(self.levels.high_low_ratio_db);
    }

    fn ook_max_high_level(&self) -> i32 {
        if self.levels.use_mag_est {
            db_to_mag(0.0)
        } else {
            db_to_amp(0.0)
        }
    }

    /// Process one buffer of AM/FM samples, advancing the OOK state machine.
    ///
    /// Returns [`PackageResult::NeedMoreInput`] when the buffer is fully
    /// consumed without completing a package, otherwise the kind of package
    /// that was just completed (its contents are in `pulses` or
    /// `fsk_pulses`, matching the return value).
    #[allow(clippy::too_many_arguments)]
    pub fn package(
        &mut self,
        am: &[i16],
        fm: &[i16],
        samp_rate: u32,
        sample_offset: u64,
        pulses: &mut PulseData,
        fsk_pulses: &mut PulseData,
        fpdm: crate::config::FskPulseDetectMode,
    ) -> PackageResult {
        let len = am.len().min(fm.len());
        let samples_per_ms = (samp_rate / 1000).max(1) as i32;

        self.ook_high_estimate = self.ook_high_estimate.max(self.ook_min_high_level);

        if matches!(self.wav_tap_config, WavTapConfig::Directory(_)) && self.taps.is_none() {
            if let WavTapConfig::Directory(dir) = &self.wav_tap_config {
                self.taps = Some(Taps::create(dir, samp_rate));
            }
        }

        let mut att_hist = [0u32; 37];
        let track_hist = self.levels.verbosity >= Verbosity::Notice;

        if self.data_counter == 0 {
            pulses.start_ago += len as u64;
            fsk_pulses.start_ago += len as u64;
        }

        let mut eop_on_spurious = false;

        while self.data_counter < len {
            let am_raw = am[self.data_counter];
            let mut am_n = self.median_filter.process(am_raw);
            if let Some(taps) = &mut self.taps {
                Taps::write(&mut taps.am_demod, am_n);
            }

            let fm_n = fm[self.data_counter];
            if let Some(taps) = &mut self.taps {
                Taps::write(&mut taps.fm_demod, fm_n);
            }

            if track_hist {
                let att = if self.levels.use_mag_est {
                    mag_to_att(am_n)
                } else {
                    amp_to_att(am_n)
                };
                att_hist[att] += 1;
            }

            let (ook_threshold_hi, ook_threshold_lo) = if self.use_peak_follower {
                let (high, low) = self.peak_follower_am.process(am_n);
                // Promote to i32 for the arithmetic, narrowing back to i16 only
                // at each assignment, mirroring the original C's int promotion
                // of int16_t operands (avoids overflow panics on full-scale
                // signed input; see peak_follower.c's analogous computation).
                let amplitude = ((high as i32 - low as i32) / 2) as i16;
                let center = (low as i32 + amplitude as i32) as i16;

                if high == 0 {
                    am_n = 0;
                }

                let thr_hi = (center as i32 + amplitude as i32 / 4) as i16;
                let thr_lo = (center as i32 - amplitude as i32 / 4) as i16;

                let (high_fm, low_fm) = self.peak_follower_fm.process(fm_n);
                let amplitude_fm = ((high_fm as i32 - low_fm as i32) / 2) as i16;
                let center_fm = (low_fm as i32 + amplitude_fm as i32) as i16;
                let thr_hi_fm = (center_fm as i32 + amplitude_fm as i32 / 4) as i16;
                let thr_lo_fm = (center_fm as i32 - amplitude_fm as i32 / 4) as i16;

                if thr_hi != 0 {
                    if am_n > thr_hi {
                        self.out_am = 32767;
                    } else if am_n < thr_lo {
                        self.out_am = 0;
                    }
                }

                if fm_n > thr_hi_fm {
                    self.out_fm = 32767;
                } else if fm_n < thr_lo_fm {
                    self.out_fm = 0;
                }
                self.out_fm = if self.out_am != 0 { self.out_fm } else { 0 };

                if let Some(taps) = &mut self.taps {
                    Taps::write(&mut taps.am_peak_high, thr_hi_fm);
                    Taps::write(&mut taps.am_peak_low, thr_lo_fm);
                    Taps::write(&mut taps.am_decoded, self.out_am);
                    Taps::write(&mut taps.fm_decoded, self.out_fm);
                }

                (thr_hi, thr_lo)
            } else {
                let mut threshold = (self.ook_low_estimate + self.ook_high_estimate) / 2;
                if self.ook_fixed_high_level != 0 {
                    threshold = self.ook_fixed_high_level;
                }
                let hysteresis = threshold / 8;
                ((threshold + hysteresis) as i16, (threshold - hysteresis) as i16)
            };

            match self.ook_state {
                OokState::Idle => {
                    if am_n as i32 > ook_threshold_hi as i32 && self.lead_in_counter > OOK_EST_LOW_RATIO {
                        pulses.clear();
                        fsk_pulses.clear();
                        pulses.sample_rate = samp_rate;
                        fsk_pulses.sample_rate = samp_rate;
                        pulses.offset = sample_offset + self.data_counter as u64;
                        fsk_pulses.offset = sample_offset + self.data_counter as u64;
                        pulses.start_ago = (len - self.data_counter) as u64;
                        fsk_pulses.start_ago = (len - self.data_counter) as u64;
                        self.pulse_length = 0;
                        self.max_pulse = 0;
                        self.fsk = match fpdm {
                            crate::config::FskPulseDetectMode::Classic => Box::new(Classic::default()),
                            crate::config::FskPulseDetectMode::MinMax => Box::new(MinMax::default()),
                        };
                        self.fsk.init();
                        self.ook_state = OokState::Pulse;
                    } else {
                        let delta = am_n as i32 - self.ook_low_estimate;
                        self.ook_low_estimate += delta / OOK_EST_LOW_RATIO;
                        self.ook_low_estimate += if delta > 0 { 1 } else { -1 };
                        self.ook_high_estimate = self.ook_high_low_ratio * self.ook_low_estimate;
                        self.ook_high_estimate = self.ook_high_estimate.max(self.ook_min_high_level);
                        self.ook_high_estimate = self.ook_high_estimate.min(self.ook_max_high_level());
                        if self.lead_in_counter <= OOK_EST_LOW_RATIO {
                            self.lead_in_counter += 1;
                        }
                    }
                }
                OokState::Pulse => {
                    self.pulse_length += 1;
                    if (am_n as i32) < ook_threshold_lo as i32 {
                        if self.pulse_length < PD_MIN_PULSE_SAMPLES {
                            if pulses.num_pulses <= 1 {
                                self.ook_state = OokState::Idle;
                            } else {
                                eop_on_spurious = true;
                                self.ook_state = OokState::Gap;
                            }
                        } else {
                            pulses.pulse[pulses.num_pulses] = self.pulse_length;
                            self.max_pulse = self.max_pulse.max(self.pulse_length);
                            self.pulse_length = 0;
                            self.ook_state = OokState::GapStart;
                        }
                    } else {
                        self.ook_high_estimate +=
                            am_n as i32 / OOK_EST_HIGH_RATIO - self.ook_high_estimate / OOK_EST_HIGH_RATIO;
                        self.ook_high_estimate = self.ook_high_estimate.max(self.ook_min_high_level);
                        self.ook_high_estimate = self.ook_high_estimate.min(self.ook_max_high_level());
                        pulses.fsk_f1_est += fm_n as i32 / OOK_EST_HIGH_RATIO - pulses.fsk_f1_est / OOK_EST_HIGH_RATIO;
                    }
                    if pulses.num_pulses == 0 {
                        self.fsk.update(fm_n as i32, fsk_pulses);
                    }
                }
                OokState::GapStart => {
                    self.pulse_length += 1;
                    if am_n as i32 > ook_threshold_hi as i32 {
                        self.pulse_length += pulses.pulse[pulses.num_pulses];
                        self.ook_state = OokState::Pulse;
                    } else if self.pulse_length >= PD_MIN_PULSE_SAMPLES {
                        self.ook_state = OokState::Gap;
                        if fsk_pulses.num_pulses > PD_MIN_PULSES {
                            if fpdm == crate::config::FskPulseDetectMode::Classic {
                                self.fsk.wrap_up(fsk_pulses);
                            }
                            fsk_pulses.fsk_f1_est = self.fsk.f1_est();
                            fsk_pulses.fsk_f2_est = self.fsk.f2_est();
                            fsk_pulses.ook_low_estimate = self.ook_low_estimate;
                            fsk_pulses.ook_high_estimate = self.ook_high_estimate;
                            pulses.end_ago = (len - self.data_counter) as u64;
                            fsk_pulses.end_ago = (len - self.data_counter) as u64;
                            self.ook_state = OokState::Idle;
                            self.log_package_levels("PULSE_DATA_FSK", &att_hist, ook_threshold_hi, ook_threshold_lo);
                            return PackageResult::Fsk;
                        }
                    }
                    if pulses.num_pulses == 0 {
                        self.fsk.update(fm_n as i32, fsk_pulses);
                    }
                }
                OokState::Gap => {
                    self.pulse_length += 1;
                    if am_n as i32 > ook_threshold_hi as i32 {
                        pulses.gap[pulses.num_pulses] = self.pulse_length;
                        pulses.num_pulses += 1;

                        if pulses.num_pulses >= PD_MAX_PULSES {
                            self.ook_state = OokState::Idle;
                            pulses.ook_low_estimate = self.ook_low_estimate;
                            pulses.ook_high_estimate = self.ook_high_estimate;
                            pulses.end_ago = (len - self.data_counter) as u64;
                            self.log_package_levels("PULSE_DATA_OOK MAX_PULSES", &att_hist, ook_threshold_hi, ook_threshold_lo);
                            return PackageResult::Ook;
                        }

                        self.pulse_length = 0;
                        self.ook_state = OokState::Pulse;
                    }

                    if eop_on_spurious
                        || (self.pulse_length > PD_MAX_GAP_RATIO * self.max_pulse
                            && self.pulse_length > PD_MIN_GAP_MS * samples_per_ms)
                        || self.pulse_length > PD_MAX_GAP_MS * samples_per_ms
                    {
                        pulses.gap[pulses.num_pulses] = self.pulse_length;
                        pulses.num_pulses += 1;
                        self.ook_state = OokState::Idle;
                        pulses.ook_low_estimate = self.ook_low_estimate;
                        pulses.ook_high_estimate = self.ook_high_estimate;
                        pulses.end_ago = (len - self.data_counter) as u64;
                        self.log_package_levels("PULSE_DATA_OOK EOP", &att_hist, ook_threshold_hi, ook_threshold_lo);
                        return PackageResult::Ook;
                    }
                }
            }

            self.data_counter += 1;
        }

        self.data_counter = 0;
        if self.levels.verbosity >= Verbosity::Debug {
            log_att_hist("Out of data", &att_hist);
        }
        PackageResult::NeedMoreInput
    }

    fn log_package_levels(&self, label: &str, att_hist: &[u32; 37], thr_hi: i16, thr_lo: i16) {
        if self.levels.verbosity >= Verbosity::Info {
            log_att_hist(label, att_hist);
        }
        if self.levels.verbosity >= Verbosity::Notice {
            tracing::debug!(
                low_db = -(mag_to_att(self.ook_low_estimate as i16) as i32),
                high_db = -(mag_to_att(self.ook_high_estimate as i16) as i32),
                thr_lo_db = -(mag_to_att(thr_lo) as i32),
                thr_hi_db = -(mag_to_att(thr_hi) as i32),
                "pulse detector levels"
            );
        }
    }
}

impl Default for PulseDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn log_att_hist(label: &str, att_hist: &[u32; 37]) {
    tracing::info!(label, ?att_hist, "attenuation histogram");
}

/// Convert amplitude (full-scale 32767) to attenuation in integer dB,
/// offset by +3, bucketed into 37 entries.
fn amp_to_att(a: i16) -> usize {
    const THRESHOLDS: [i32; 36] = [
        32690, 25967, 20626, 16383, 13014, 10338, 8211, 6523, 5181, 4115, 3269, 2597, 2063, 1638,
        1301, 1034, 821, 652, 518, 412, 327, 260, 206, 164, 130, 103, 82, 65, 52, 41, 33, 26, 21,
        16, 13, 10,
    ];
    let a = a as i32;
    for (i, &t) in THRESHOLDS.iter().enumerate() {
        if a > t {
            return i;
        }
    }
    36
}

/// Convert magnitude (full-scale 32767) to attenuation in integer dB,
/// offset by +3, bucketed into 37 entries.
fn mag_to_att(m: i16) -> usize {
    const THRESHOLDS: [i32; 36] = [
        23143, 20626, 18383, 16383, 14602, 13014, 11599, 10338, 9213, 8211, 7318, 6523, 5813,
        5181, 4618, 4115, 3668, 3269, 2914, 2597, 2314, 2063, 1838, 1638, 1460, 1301, 1160, 1034,
        921, 821, 732, 652, 581, 518, 462, 412,
    ];
    let m = m as i32;
    for (i, &t) in THRESHOLDS.iter().enumerate() {
        if m > t {
            return i;
        }
    }
    36
}
