//! Narration and effect playback

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use postura_core::{PosturaError, PosturaResult};
use postura_experience::{NarrationTicket, PlaybackOutcome};

/// Plays an audio clip to the end
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Resolves once playback finishes or fails
    async fn play(&self, audio_ref: &str) -> PosturaResult<()>;
}

/// Completion event for one narration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationCompletion {
    pub ticket: NarrationTicket,
    pub outcome: PlaybackOutcome,
}

/// Runs narrations one at a time
///
/// Starting a narration aborts the current one. Aborted narrations never
/// report completion.
pub struct Narrator {
    player: Arc<dyn AudioPlayer>,
    current: Option<(NarrationTicket, JoinHandle<()>)>,
    completions: mpsc::UnboundedSender<NarrationCompletion>,
}

impl Narrator {
    pub fn new(player: Arc<dyn AudioPlayer>) -> (Self, mpsc::UnboundedReceiver<NarrationCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let narrator = Narrator {
            player,
            current: None,
            completions: tx,
        };
        (narrator, rx)
    }

    /// Start a narration. Must be called within a tokio runtime.
    pub fn play(&mut self, ticket: NarrationTicket, audio_ref: String) {
        self.stop();

        let player = Arc::clone(&self.player);
        let completions = self.completions.clone();
        let handle = tokio::spawn(async move {
            let outcome = match player.play(&audio_ref).await {
                Ok(()) => PlaybackOutcome::Completed,
                Err(e) => {
                    warn!(%ticket, audio_ref = %audio_ref, error = %e, "narration playback failed");
                    PlaybackOutcome::Failed(e.to_string())
                }
            };
            // The receiver only goes away with the driver
            let _ = completions.send(NarrationCompletion { ticket, outcome });
        });
        self.current = Some((ticket, handle));
    }

    /// Fire-and-forget sound effect
    pub fn play_effect(&self, audio_ref: String) {
        let player = Arc::clone(&self.player);
        tokio::spawn(async move {
            if let Err(e) = player.play(&audio_ref).await {
                warn!(audio_ref = %audio_ref, error = %e, "effect playback failed");
            }
        });
    }

    pub fn stop(&mut self) {
        if let Some((ticket, handle)) = self.current.take() {
            if !handle.is_finished() {
                debug!(%ticket, "narration stopped");
            }
            handle.abort();
        }
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Player with no output device; every clip lasts a fixed time
#[derive(Debug, Clone, Default)]
pub struct SilentAudioPlayer {
    clip_length: Duration,
}

impl SilentAudioPlayer {
    pub fn new(clip_length: Duration) -> Self {
        SilentAudioPlayer { clip_length }
    }
}

#[async_trait]
impl AudioPlayer for SilentAudioPlayer {
    async fn play(&self, audio_ref: &str) -> PosturaResult<()> {
        debug!(audio_ref, "silent playback");
        if !self.clip_length.is_zero() {
            tokio::time::sleep(self.clip_length).await;
        }
        Ok(())
    }
}

/// Player that records requests and fails the clips it is told to fail
#[derive(Debug, Default)]
pub struct ScriptedAudioPlayer {
    played: Mutex<Vec<String>>,
    failing: Vec<String>,
}

impl ScriptedAudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, audio_ref: impl Into<String>) -> Self {
        self.failing.push(audio_ref.into());
        self
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().clone()
    }
}

#[async_trait]
impl AudioPlayer for ScriptedAudioPlayer {
    async fn play(&self, audio_ref: &str) -> PosturaResult<()> {
        self.played.lock().push(audio_ref.to_string());
        if self.failing.iter().any(|f| f == audio_ref) {
            return Err(PosturaError::AudioPlayback {
                audio_ref: audio_ref.to_string(),
                reason: "scripted failure".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completion_is_reported() {
        let player = Arc::new(ScriptedAudioPlayer::new());
        let (mut narrator, mut rx) = Narrator::new(player.clone());
        narrator.play(NarrationTicket(1), "intro.wav".into());

        let done = rx.recv().await.unwrap();
        assert_eq!(
            done,
            NarrationCompletion {
                ticket: NarrationTicket(1),
                outcome: PlaybackOutcome::Completed
            }
        );
        assert_eq!(player.played(), vec!["intro.wav".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_counts_as_completion() {
        let player = Arc::new(ScriptedAudioPlayer::new().failing("missing.wav"));
        let (mut narrator, mut rx) = Narrator::new(player);
        narrator.play(NarrationTicket(7), "missing.wav".into());

        let done = rx.recv().await.unwrap();
        assert_eq!(done.ticket, NarrationTicket(7));
        assert!(matches!(done.outcome, PlaybackOutcome::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_narration_aborts_previous() {
        let player = Arc::new(SilentAudioPlayer::new(Duration::from_secs(5)));
        let (mut narrator, mut rx) = Narrator::new(player);
        narrator.play(NarrationTicket(1), "long.wav".into());
        tokio::task::yield_now().await;
        narrator.play(NarrationTicket(2), "next.wav".into());

        let done = rx.recv().await.unwrap();
        assert_eq!(done.ticket, NarrationTicket(2));
        assert!(rx.try_recv().is_err());
    }
}
