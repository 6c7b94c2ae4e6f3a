//! Landmark sources
//!
//! A source yields video ticks and runs pose detection on them. Cameras and
//! detector models live outside this crate; [`RecordedSource`] replays a
//! JSON-lines recording instead.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use postura_core::{Frame, Landmark, ManualClock, PosturaError, PosturaResult, SessionTime};

/// One captured video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTick {
    /// Sequence number within the source
    pub index: u64,
    /// Presentation time of the video frame
    pub video_time: SessionTime,
}

/// Camera plus pose detector
#[async_trait]
pub trait LandmarkSource: Send {
    /// Next captured frame; `None` when the camera stops
    async fn next_capture(&mut self) -> Option<VideoTick>;

    /// Detect the first pose in a captured frame; `Ok(None)` when nobody is there
    async fn detect(&mut self, tick: &VideoTick) -> PosturaResult<Option<Frame>>;
}

/// One line of a landmark recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub video_time_ms: i64,
    /// `null` when no pose was detected
    #[serde(default)]
    pub landmarks: Option<Vec<Option<Landmark>>>,
}

/// Replays a JSON-lines landmark recording
///
/// With a clock attached, each capture moves the clock to the frame's video
/// time and yields, so spawned narration tasks get to run between frames.
#[derive(Debug, Clone, Default)]
pub struct RecordedSource {
    frames: Vec<RecordedFrame>,
    cursor: usize,
    clock: Option<ManualClock>,
}

impl RecordedSource {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        RecordedSource {
            frames,
            cursor: 0,
            clock: None,
        }
    }

    pub fn with_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Parse a recording; blank lines are ignored
    pub fn from_json_lines(text: &str) -> PosturaResult<Self> {
        let mut frames = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let frame: RecordedFrame =
                serde_json::from_str(line).map_err(|e| PosturaError::MalformedRecording {
                    line: index + 1,
                    reason: e.to_string(),
                })?;
            if let Some(landmarks) = &frame.landmarks {
                if landmarks.len() > postura_core::Keypoint::COUNT {
                    return Err(PosturaError::MalformedRecording {
                        line: index + 1,
                        reason: format!("{} landmarks", landmarks.len()),
                    });
                }
            }
            frames.push(frame);
        }
        Ok(Self::new(frames))
    }

    pub fn from_file(path: impl AsRef<Path>) -> PosturaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_lines(&text)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[async_trait]
impl LandmarkSource for RecordedSource {
    async fn next_capture(&mut self) -> Option<VideoTick> {
        let frame = self.frames.get(self.cursor)?;
        let tick = VideoTick {
            index: self.cursor as u64,
            video_time: SessionTime::from_millis(frame.video_time_ms),
        };
        if let Some(clock) = &self.clock {
            clock.set(tick.video_time);
            tokio::task::yield_now().await;
        }
        // Advance only once the capture is delivered
        self.cursor += 1;
        Some(tick)
    }

    async fn detect(&mut self, tick: &VideoTick) -> PosturaResult<Option<Frame>> {
        let recorded = usize::try_from(tick.index)
            .ok()
            .and_then(|i| self.frames.get(i))
            .ok_or_else(|| PosturaError::Detector(format!("no recorded frame {}", tick.index)))?;
        match &recorded.landmarks {
            Some(landmarks) => Frame::try_new(landmarks.clone()).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postura_core::Keypoint;

    const RECORDING: &str = r#"
{"video_time_ms": 0, "landmarks": [{"x": 0.5, "y": 0.3, "visibility": 0.9}]}
{"video_time_ms": 33, "landmarks": null}

{"video_time_ms": 66}
"#;

    #[tokio::test]
    async fn test_replays_recording() {
        let mut source = RecordedSource::from_json_lines(RECORDING).unwrap();
        assert_eq!(source.len(), 3);

        let tick = source.next_capture().await.unwrap();
        assert_eq!(tick.video_time, SessionTime::ZERO);
        let frame = source.detect(&tick).await.unwrap().unwrap();
        assert_eq!(frame.get(Keypoint::Nose).unwrap().visibility, 0.9);
        assert_eq!(frame.get(Keypoint::Nose).unwrap().z, 0.0);

        let tick = source.next_capture().await.unwrap();
        assert_eq!(tick.video_time, SessionTime::from_millis(33));
        assert!(source.detect(&tick).await.unwrap().is_none());

        let tick = source.next_capture().await.unwrap();
        assert!(source.detect(&tick).await.unwrap().is_none());
        assert!(source.next_capture().await.is_none());
    }

    #[tokio::test]
    async fn test_clock_follows_video_time() {
        use postura_core::Clock;

        let clock = ManualClock::new();
        let mut source = RecordedSource::from_json_lines(RECORDING)
            .unwrap()
            .with_clock(clock.clone());
        source.next_capture().await;
        source.next_capture().await;
        assert_eq!(clock.now(), SessionTime::from_millis(33));
    }

    #[test]
    fn test_reports_malformed_line() {
        let err = RecordedSource::from_json_lines("{\"video_time_ms\": 0}\nnope").unwrap_err();
        assert!(matches!(err, PosturaError::MalformedRecording { line: 2, .. }));
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let landmarks = vec![serde_json::json!({"x": 0.0, "y": 0.0}); 34];
        let line = serde_json::json!({"video_time_ms": 0, "landmarks": landmarks}).to_string();
        assert!(matches!(
            RecordedSource::from_json_lines(&line),
            Err(PosturaError::MalformedRecording { line: 1, .. })
        ));
    }
}
