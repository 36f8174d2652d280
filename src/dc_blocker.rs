//! Running-mean DC blocker (high-pass) over a circular `i16` buffer.

/// Running-mean high-pass filter.
///
/// Maintains a circular buffer of the last `N` samples and their running
/// sum; each call subtracts the truncated-toward-zero mean from the input.
/// Overflow saturation is intentionally not performed — callers are expected
/// to keep the running mean small relative to `i16::MAX`.
pub struct DcBlocker {
    buffer: Vec<i16>,
    sum: i32,
    index: usize,
}

impl DcBlocker {
    /// Create a new blocker with a circular buffer of `buffer_length` samples.
    pub fn new(buffer_length: usize) -> Self {
        Self {
            buffer: vec![0; buffer_length],
            sum: 0,
            index: 0,
        }
    }

    /// Filter one sample: update the running sum/buffer, then subtract the
    /// current mean from the input.
    pub fn filter(&mut self, sample: i16) -> i16 {
        self.sum -= self.buffer[self.index] as i32;
        self.buffer[self.index] = sample;
        self.sum += sample as i32;
        self.index = (self.index + 1) % self.buffer.len();

        let mean = (self.sum / self.buffer.len() as i32) as i16;
        sample.wrapping_sub(mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_converges_to_zero() {
        let mut blocker = DcBlocker::new(16);
        let mut last = 0i16;
        for _ in 0..1000 {
            last = blocker.filter(1000);
        }
        assert!(last.abs() <= 1, "expected near-zero output, got {}", last);
    }

    #[test]
    fn zero_input_stays_zero() {
        let mut blocker = DcBlocker::new(8);
        for _ in 0..20 {
            assert_eq!(blocker.filter(0), 0);
        }
    }

    #[test]
    fn tracks_step_change() {
        let mut blocker = DcBlocker::new(4);
        for _ in 0..100 {
            blocker.filter(500);
        }
        // Step down to a new constant level; mean should re-converge.
        let mut last = 0i16;
        for _ in 0..100 {
            last = blocker.filter(-500);
        }
        assert!(last.abs() <= 1, "expected re-convergence, got {}", last);
    }
}
