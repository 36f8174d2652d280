//! End-to-end scenario tests for the OOK/FSK pulse detector.

use pulse_core::{FskPulseDetectMode, PackageResult, PulseData, PulseDetector, PD_MAX_PULSES};

fn run(
    detector: &mut PulseDetector,
    am: &[i16],
    fm: &[i16],
    pulses: &mut PulseData,
    fsk_pulses: &mut PulseData,
) -> PackageResult {
    let mut result = PackageResult::NeedMoreInput;
    for _ in 0..10 {
        result = detector.package(am, fm, 250_000, 0, pulses, fsk_pulses, FskPulseDetectMode::MinMax);
        if result != PackageResult::NeedMoreInput {
            break;
        }
    }
    result
}

#[test]
fn scenario_1_silence() {
    let mut detector = PulseDetector::new();
    let am = vec![0i16; 10_000];
    let fm = vec![0i16; 10_000];
    let mut pulses = PulseData::new();
    let mut fsk_pulses = PulseData::new();

    let result = detector.package(&am, &fm, 250_000, 0, &mut pulses, &mut fsk_pulses, FskPulseDetectMode::MinMax);

    assert_eq!(result, PackageResult::NeedMoreInput);
    assert_eq!(pulses.num_pulses, 0);
}

#[test]
fn scenario_2_single_ook_burst() {
    let mut am = Vec::new();
    am.extend(std::iter::repeat(0i16).take(5000));
    am.extend(std::iter::repeat(20000i16).take(500));
    am.extend(std::iter::repeat(0i16).take(50 * 250 + 100));
    let fm = vec![0i16; am.len()];

    let mut detector = PulseDetector::new();
    let mut pulses = PulseData::new();
    let mut fsk_pulses = PulseData::new();

    let result = run(&mut detector, &am, &fm, &mut pulses, &mut fsk_pulses);

    assert_eq!(result, PackageResult::Ook);
    assert_eq!(pulses.num_pulses, 1);
    assert!((pulses.pulse[0] - 500).abs() <= 5, "pulse[0] = {}", pulses.pulse[0]);
    assert!(pulses.gap[0] >= 50 * 250, "gap[0] = {}", pulses.gap[0]);
}

#[test]
fn scenario_3_spurious_glitch_rejection() {
    // A valid pulse, a valid gap, then a 5-sample glitch (below
    // PD_MIN_PULSE_SAMPLES) must force package emission rather than start a
    // new pulse.
    let mut am = Vec::new();
    am.extend(std::iter::repeat(0i16).take(5000));
    am.extend(std::iter::repeat(20000i16).take(1000));
    am.extend(std::iter::repeat(0i16).take(200));
    am.extend(std::iter::repeat(20000i16).take(1000));
    am.extend(std::iter::repeat(0i16).take(200));
    am.extend(std::iter::repeat(20000i16).take(5)); // spurious glitch
    am.extend(std::iter::repeat(0i16).take(50 * 250 + 100));
    let fm = vec![0i16; am.len()];

    let mut detector = PulseDetector::new();
    let mut pulses = PulseData::new();
    let mut fsk_pulses = PulseData::new();

    let result = run(&mut detector, &am, &fm, &mut pulses, &mut fsk_pulses);

    assert_eq!(result, PackageResult::Ook);
    // The two genuine pulses survive untouched; the glitch forced an
    // end-of-package rather than being counted as a third full pulse.
    assert!((pulses.pulse[0] - 1000).abs() <= 5, "pulse[0] = {}", pulses.pulse[0]);
    assert!((pulses.pulse[1] - 1000).abs() <= 5, "pulse[1] = {}", pulses.pulse[1]);
}

#[test]
fn scenario_4_spurious_gap_folding() {
    // A pulse, a 4-sample dip below threshold, then continuation: these
    // must merge into a single pulse.
    let mut am = Vec::new();
    am.extend(std::iter::repeat(0i16).take(5000));
    am.extend(std::iter::repeat(20000i16).take(800));
    am.extend(std::iter::repeat(0i16).take(4));
    am.extend(std::iter::repeat(20000i16).take(300));
    am.extend(std::iter::repeat(0i16).take(50 * 250 + 100));
    let fm = vec![0i16; am.len()];

    let mut detector = PulseDetector::new();
    let mut pulses = PulseData::new();
    let mut fsk_pulses = PulseData::new();

    let result = run(&mut detector, &am, &fm, &mut pulses, &mut fsk_pulses);

    assert_eq!(result, PackageResult::Ook);
    assert_eq!(pulses.num_pulses, 1);
    assert!(
        (pulses.pulse[0] - (800 + 4 + 300)).abs() <= 5,
        "expected folded pulse near 1104, got {}",
        pulses.pulse[0]
    );
}

#[test]
fn scenario_5_max_pulses_overflow() {
    let mut am = Vec::new();
    am.extend(std::iter::repeat(0i16).take(5000));
    for _ in 0..(PD_MAX_PULSES + 10) {
        am.extend(std::iter::repeat(20000i16).take(20));
        am.extend(std::iter::repeat(0i16).take(20));
    }
    let fm = vec![0i16; am.len()];

    let mut detector = PulseDetector::new();
    let mut pulses = PulseData::new();
    let mut fsk_pulses = PulseData::new();

    let result = run(&mut detector, &am, &fm, &mut pulses, &mut fsk_pulses);

    assert_eq!(result, PackageResult::Ook);
    assert_eq!(pulses.num_pulses, PD_MAX_PULSES);
    assert!(pulses.end_ago > 0);
}

#[test]
fn scenario_6_fsk_hand_off() {
    // One long AM pulse; an FM waveform that toggles often enough to
    // produce more than PD_MIN_PULSES FSK sub-pulses before the AM gap
    // becomes real.
    let mut am = Vec::new();
    am.extend(std::iter::repeat(0i16).take(5000));
    am.extend(std::iter::repeat(20000i16).take(4000));
    am.extend(std::iter::repeat(0i16).take(50 * 250 + 100));

    let mut fm = vec![0i16; 5000];
    let mut toggle = true;
    for _ in 0..4000 {
        fm.push(if toggle { 5000 } else { -5000 });
        toggle = !toggle;
    }
    fm.extend(std::iter::repeat(0i16).take(am.len() - fm.len()));

    let mut detector = PulseDetector::new();
    let mut pulses = PulseData::new();
    let mut fsk_pulses = PulseData::new();

    let result = run(&mut detector, &am, &fm, &mut pulses, &mut fsk_pulses);

    assert_eq!(result, PackageResult::Fsk);
    assert_ne!(fsk_pulses.fsk_f1_est, 0);
}
