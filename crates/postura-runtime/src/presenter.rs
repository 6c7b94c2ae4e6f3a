//! Presentation of cues and progress

use parking_lot::Mutex;
use tracing::{debug, info};

use postura_experience::{Cue, Progress, SkeletonTint};
use postura_pose::LiftingAnalysis;

/// Where cues and per-frame progress end up
///
/// Audio cues are also passed here after the driver has acted on them.
pub trait Presenter: Send + Sync {
    fn present(&self, cue: &Cue);

    fn progress(&self, progress: Option<&Progress>, tint: SkeletonTint);

    fn lifting(&self, _analysis: &LiftingAnalysis) {}
}

/// Presents everything as log events
#[derive(Debug, Default)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn present(&self, cue: &Cue) {
        match cue {
            Cue::PhaseNotification { name } => info!(phase = %name, "phase"),
            Cue::Subtitle { text } if !text.is_empty() => info!(%text, "subtitle"),
            Cue::ShowLightingWarning => info!("low light: face the light source"),
            other => debug!(cue = ?other, "cue"),
        }
    }

    fn progress(&self, progress: Option<&Progress>, tint: SkeletonTint) {
        if let Some(Progress::Holding {
            is_valid,
            current,
            total,
            name,
            jitter_tolerance,
        }) = progress
        {
            debug!(
                phase = %name,
                is_valid,
                held_ms = current.as_millis() as u64,
                total_ms = total.as_millis() as u64,
                jitter_tolerance,
                ?tint,
                "hold"
            );
        }
    }

    fn lifting(&self, analysis: &LiftingAnalysis) {
        debug!(score = analysis.score, feedback = %analysis.feedback_line(), "lifting");
    }
}

/// Keeps everything it is shown, for tests and replays
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    cues: Mutex<Vec<Cue>>,
    progress: Mutex<Vec<Option<Progress>>>,
    tints: Mutex<Vec<SkeletonTint>>,
    lifting: Mutex<Vec<LiftingAnalysis>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.cues.lock().clone()
    }

    pub fn progress_reports(&self) -> Vec<Option<Progress>> {
        self.progress.lock().clone()
    }

    pub fn tints(&self) -> Vec<SkeletonTint> {
        self.tints.lock().clone()
    }

    pub fn lifting_reports(&self) -> Vec<LiftingAnalysis> {
        self.lifting.lock().clone()
    }

    pub fn phase_notifications(&self) -> Vec<String> {
        self.cues
            .lock()
            .iter()
            .filter_map(|cue| match cue {
                Cue::PhaseNotification { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&self, cue: &Cue) {
        self.cues.lock().push(cue.clone());
    }

    fn progress(&self, progress: Option<&Progress>, tint: SkeletonTint) {
        self.progress.lock().push(progress.cloned());
        self.tints.lock().push(tint);
    }

    fn lifting(&self, analysis: &LiftingAnalysis) {
        self.lifting.lock().push(analysis.clone());
    }
}
