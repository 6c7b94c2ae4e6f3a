//! Frame admission for the detection loop

use postura_core::SessionTime;

/// Decides which captured frames reach the detector
///
/// A frame is admitted when it lands on the stride and carries a video
/// timestamp not seen last time. The driver awaits each detection before
/// pulling the next capture, so at most one is ever in flight.
#[derive(Debug, Clone)]
pub struct FrameGate {
    stride: u32,
    counter: u64,
    last_video_time: Option<SessionTime>,
}

impl FrameGate {
    pub fn new(stride: u32) -> Self {
        FrameGate {
            stride: stride.max(1),
            counter: 0,
            last_video_time: None,
        }
    }

    pub fn admit(&mut self, video_time: SessionTime) -> bool {
        self.counter += 1;
        if self.counter % u64::from(self.stride) != 0 {
            return false;
        }
        if self.last_video_time == Some(video_time) {
            return false;
        }
        self.last_video_time = Some(video_time);
        true
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.last_video_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(ms: i64) -> SessionTime {
        SessionTime::from_millis(ms)
    }

    #[test]
    fn test_every_second_frame() {
        let mut gate = FrameGate::new(2);
        let admitted: Vec<bool> = (0..6).map(|i| gate.admit(t(i * 33))).collect();
        assert_eq!(admitted, vec![false, true, false, true, false, true]);
    }

    #[test]
    fn test_duplicate_video_time_is_skipped() {
        let mut gate = FrameGate::new(1);
        assert!(gate.admit(t(33)));
        assert!(!gate.admit(t(33)));
        assert!(gate.admit(t(66)));
    }

    #[test]
    fn test_reset_forgets_counter_and_timestamp() {
        let mut gate = FrameGate::new(2);
        assert!(!gate.admit(t(0)));
        assert!(gate.admit(t(33)));
        gate.reset();
        assert!(!gate.admit(t(33)));
        assert!(gate.admit(t(33)));
    }

    #[test]
    fn test_zero_stride_is_clamped() {
        let mut gate = FrameGate::new(0);
        assert_eq!(gate.stride(), 1);
        assert!(gate.admit(t(0)));
    }

    proptest! {
        #[test]
        fn prop_admits_one_per_stride(stride in 1u32..6, frames in 1u64..200) {
            let mut gate = FrameGate::new(stride);
            let admitted = (0..frames)
                .filter(|&i| gate.admit(SessionTime::from_millis(i as i64 * 16)))
                .count() as u64;
            prop_assert_eq!(admitted, frames / u64::from(stride));
        }
    }
}
