//! Sliding-window median filter for impulse-noise suppression on AM samples.

/// Sliding window of size `W` over the most recent `W` samples.
///
/// Each call shifts the window right by one (oldest sample discarded),
/// inserts the new sample at index 0, and returns the element at the upper
/// middle index (`W / 2`, matching the original's `window_size / 2`) of the
/// sorted window. The initial window is all zeros.
pub struct MedianFilter {
    values: Vec<i16>,
    scratch: Vec<i16>,
}

impl MedianFilter {
    /// Create a filter with the given window size (typically 15).
    pub fn new(window_size: usize) -> Self {
        Self {
            values: vec![0; window_size],
            scratch: vec![0; window_size],
        }
    }

    /// Process one sample, returning the window's (upper) median.
    pub fn process(&mut self, sample: i16) -> i16 {
        for i in (1..self.values.len()).rev() {
            self.values[i] = self.values[i - 1];
        }
        self.values[0] = sample;

        self.scratch.copy_from_slice(&self.values);
        self.scratch.sort_unstable();

        self.scratch[self.values.len() / 2]
    }
}
