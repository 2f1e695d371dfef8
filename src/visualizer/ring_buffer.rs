/// Number of amplitude samples the visualizer keeps.
pub const LEVEL_HISTORY_LEN: usize = 200;

/// Fixed-capacity sliding window, oldest value first.
///
/// The window starts full of `T::default()` so readers always get a
/// full-length sequence. Pushing onto a full window evicts the oldest value.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    write_pos: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity.max(1)],
            write_pos: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.data[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % self.data.len();
    }

    /// Copy out the window in chronological order.
    pub fn snapshot(&self) -> Vec<T> {
        let (newer, older) = self.data.split_at(self.write_pos);
        let mut out = Vec::with_capacity(self.data.len());
        out.extend_from_slice(older);
        out.extend_from_slice(newer);
        out
    }

    /// The most recently pushed value, or the fill value before any push.
    pub fn latest(&self) -> T {
        let len = self.data.len();
        self.data[(self.write_pos + len - 1) % len]
    }

    /// Refill the window with `T::default()`.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
        self.write_pos = 0;
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl<T: Copy + Default> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(LEVEL_HISTORY_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full_of_zeros() {
        let buffer = RingBuffer::<f32>::default();
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), LEVEL_HISTORY_LEN);
        assert!(snapshot.iter().all(|&value| value == 0.0));
    }

    #[test]
    fn length_stays_at_capacity_and_last_is_newest() {
        let mut buffer = RingBuffer::<f32>::new(4);
        for step in 1..=11 {
            buffer.push(step as f32);
            let snapshot = buffer.snapshot();
            assert_eq!(snapshot.len(), 4);
            assert_eq!(*snapshot.last().unwrap(), step as f32);
            assert_eq!(buffer.latest(), step as f32);
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut buffer = RingBuffer::<f32>::new(3);
        for value in [1.0, 2.0, 3.0, 4.0] {
            buffer.push(value);
        }
        assert_eq!(buffer.snapshot(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn partially_filled_window_keeps_leading_zeros() {
        let mut buffer = RingBuffer::<f32>::new(4);
        buffer.push(0.5);
        buffer.push(0.25);
        assert_eq!(buffer.snapshot(), vec![0.0, 0.0, 0.5, 0.25]);
    }

    #[test]
    fn clear_refills_with_zeros() {
        let mut buffer = RingBuffer::<f32>::new(3);
        buffer.push(0.9);
        buffer.clear();
        assert_eq!(buffer.snapshot(), vec![0.0; 3]);
        assert_eq!(buffer.latest(), 0.0);
    }
}
