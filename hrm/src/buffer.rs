/// Enough for a little over ten seconds at 24Hz.
pub const SAMPLE_CAPACITY: usize = 256;

/// History of quantized samples.
///
/// Storage is fixed and cleared in place after each estimate. If nobody
/// asks for an estimate the oldest sample makes room for the newest one.
///
/// Every sample is written twice, `SAMPLE_CAPACITY` apart, so the window
/// starting at `head` is always contiguous.
pub struct SampleBuffer {
    storage: [i8; 2 * SAMPLE_CAPACITY],
    head: usize,
    len: usize,
    overflowing: bool,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self {
            storage: [0; 2 * SAMPLE_CAPACITY],
            head: 0,
            len: 0,
            overflowing: false,
        }
    }

    pub fn push(&mut self, v: i8) {
        let i = if self.len < SAMPLE_CAPACITY {
            self.len += 1;
            (self.head + self.len - 1) % SAMPLE_CAPACITY
        } else {
            if !self.overflowing {
                defmt_or_log::warn!("hrm: sample buffer full, dropping oldest samples");
                self.overflowing = true;
            }
            let oldest = self.head;
            self.head = (self.head + 1) % SAMPLE_CAPACITY;
            oldest
        };
        self.storage[i] = v;
        self.storage[i + SAMPLE_CAPACITY] = v;
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.overflowing = false;
    }

    pub fn as_slice(&self) -> &[i8] {
        &self.storage[self.head..self.head + self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == SAMPLE_CAPACITY
    }

    /// Whether samples were dropped since the last `clear`.
    pub fn is_overflowing(&self) -> bool {
        self.overflowing
    }
}
