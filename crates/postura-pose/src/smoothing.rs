//! Landmark smoothing - rolling mean over the last few frames

use std::collections::VecDeque;

use postura_core::{Frame, Landmark};

/// Frames averaged by default
pub const SMOOTHING_FRAMES: usize = 3;

/// Low-pass filter over tracker frames
///
/// The window is FIFO and size-bounded. Each output landmark is the mean of
/// the buffered frames that reported that index; absent entries are skipped,
/// never zero-filled.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    window: VecDeque<Frame>,
    capacity: usize,
}

impl LandmarkSmoother {
    pub fn new() -> Self {
        Self::with_capacity(SMOOTHING_FRAMES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        LandmarkSmoother {
            window: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Push a frame and return its smoothed version
    pub fn smooth(&mut self, frame: Frame) -> Frame {
        self.window.push_back(frame);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        let current = match self.window.back() {
            Some(current) => current,
            None => return Frame::default(),
        };

        // First sample passes through untouched
        if self.window.len() == 1 {
            return current.clone();
        }

        current
            .slots()
            .iter()
            .enumerate()
            .map(|(idx, slot)| slot.map(|raw| self.mean_at(idx).unwrap_or(raw)))
            .collect()
    }

    fn mean_at(&self, idx: usize) -> Option<Landmark> {
        let mut sum = Landmark::new(0.0, 0.0, 0.0, 0.0);
        let mut count = 0usize;

        for lm in self.window.iter().filter_map(|f| f.get_index(idx)) {
            sum.x += lm.x;
            sum.y += lm.y;
            sum.z += lm.z;
            sum.visibility += lm.visibility;
            count += 1;
        }

        if count == 0 {
            return None;
        }
        let n = count as f32;
        Some(Landmark::new(sum.x / n, sum.y / n, sum.z / n, sum.visibility / n))
    }

    /// Frames currently buffered
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postura_core::Keypoint;
    use proptest::prelude::*;

    fn single(x: f32, y: f32, vis: f32) -> Frame {
        Frame::from_landmarks(vec![Landmark::new(x, y, 0.0, vis)])
    }

    #[test]
    fn test_first_frame_passes_through() {
        let mut smoother = LandmarkSmoother::new();
        let frame = single(0.3, 0.7, 0.8);
        assert_eq!(smoother.smooth(frame.clone()), frame);
    }

    #[test]
    fn test_mean_over_window() {
        let mut smoother = LandmarkSmoother::new();
        smoother.smooth(single(0.0, 0.0, 1.0));
        let out = smoother.smooth(single(1.0, 0.5, 0.5));

        let lm = out.get(Keypoint::Nose).unwrap();
        assert!((lm.x - 0.5).abs() < 1e-6);
        assert!((lm.y - 0.25).abs() < 1e-6);
        assert!((lm.visibility - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut smoother = LandmarkSmoother::new();
        for x in [10.0, 0.0, 0.0, 0.0] {
            smoother.smooth(single(x, 0.0, 1.0));
        }
        assert_eq!(smoother.len(), SMOOTHING_FRAMES);

        // The 10.0 sample was evicted
        let out = smoother.smooth(single(0.0, 0.0, 1.0));
        assert_eq!(out.get(Keypoint::Nose).unwrap().x, 0.0);
    }

    #[test]
    fn test_absent_entries_are_skipped() {
        let mut smoother = LandmarkSmoother::new();
        smoother.smooth(Frame::new(vec![None]));
        smoother.smooth(single(0.2, 0.2, 1.0));
        let out = smoother.smooth(single(0.4, 0.4, 1.0));

        // Mean of the two frames that had the landmark, not of three
        let lm = out.get(Keypoint::Nose).unwrap();
        assert!((lm.x - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_absent_in_current_stays_absent() {
        let mut smoother = LandmarkSmoother::new();
        smoother.smooth(single(0.2, 0.2, 1.0));
        let out = smoother.smooth(Frame::new(vec![None]));
        assert!(out.get(Keypoint::Nose).is_none());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_reset_empties_window() {
        let mut smoother = LandmarkSmoother::new();
        smoother.smooth(single(0.9, 0.9, 1.0));
        smoother.reset();
        assert!(smoother.is_empty());

        let frame = single(0.1, 0.1, 1.0);
        assert_eq!(smoother.smooth(frame.clone()), frame);
    }

    proptest! {
        #[test]
        fn prop_static_input_converges(
            x in 0.0f32..1.0, y in 0.0f32..1.0, z in -0.5f32..0.5, vis in 0.0f32..1.0,
        ) {
            let frame = Frame::from_landmarks(vec![Landmark::new(x, y, z, vis); 33]);
            let mut smoother = LandmarkSmoother::new();
            let mut out = Frame::default();
            for _ in 0..SMOOTHING_FRAMES + 1 {
                out = smoother.smooth(frame.clone());
            }
            for (a, b) in out.slots().iter().zip(frame.slots()) {
                let (a, b) = (a.unwrap(), b.unwrap());
                prop_assert!((a.x - b.x).abs() < 1e-5);
                prop_assert!((a.y - b.y).abs() < 1e-5);
                prop_assert!((a.z - b.z).abs() < 1e-5);
                prop_assert!((a.visibility - b.visibility).abs() < 1e-5);
            }
        }
    }
}
