//! Experience driver - the frame loop
//!
//! Each admitted capture goes through detection, smoothing, optional lifting
//! analysis and the phase machine. Cues the machine queues are dispatched
//! right after: audio cues to the [`Narrator`], all cues to the [`Presenter`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{info, warn};

use postura_core::{Clock, Frame, LiftingThresholds, PosturaResult, SessionTime};
use postura_experience::{Cue, PhaseMachine, Progress, SkeletonTint};
use postura_pose::{analyze_lifting_posture, LandmarkSmoother};

use crate::audio::{AudioPlayer, NarrationCompletion, Narrator};
use crate::config::RuntimeConfig;
use crate::gate::FrameGate;
use crate::presenter::Presenter;
use crate::source::{LandmarkSource, VideoTick};

#[derive(Clone, Debug, Default)]
pub struct DriverStats {
    pub captures: u64,
    pub frames_skipped: u64,
    pub frames_processed: u64,
    pub poses_detected: u64,
    pub detector_errors: u64,
    pub narrations_applied: u64,
    pub last_frame_duration: Duration,
}

enum LoopEvent {
    Narration(NarrationCompletion),
    Capture(Option<VideoTick>),
}

/// Drives one guided session
pub struct ExperienceDriver {
    machine: PhaseMachine,
    smoother: LandmarkSmoother,
    gate: FrameGate,
    narrator: Narrator,
    completions: mpsc::UnboundedReceiver<NarrationCompletion>,
    presenter: Arc<dyn Presenter>,
    clock: Arc<dyn Clock>,
    lifting: Option<LiftingThresholds>,
    stats: DriverStats,
}

impl ExperienceDriver {
    pub fn new(
        machine: PhaseMachine,
        player: Arc<dyn AudioPlayer>,
        presenter: Arc<dyn Presenter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_parts(machine, &RuntimeConfig::default(), player, presenter, clock)
    }

    /// Build from configuration, loading the phase table it names
    pub fn with_config(
        config: &RuntimeConfig,
        player: Arc<dyn AudioPlayer>,
        presenter: Arc<dyn Presenter>,
        clock: Arc<dyn Clock>,
    ) -> PosturaResult<Self> {
        config.validate()?;
        let machine = PhaseMachine::new(config.phase_table()?, config.thresholds())
            .with_max_frame_interval(config.max_frame_interval());
        Ok(Self::with_parts(machine, config, player, presenter, clock))
    }

    fn with_parts(
        machine: PhaseMachine,
        config: &RuntimeConfig,
        player: Arc<dyn AudioPlayer>,
        presenter: Arc<dyn Presenter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (narrator, completions) = Narrator::new(player);
        let lifting = config
            .lifting_trainer
            .then(|| machine.thresholds().lifting);
        ExperienceDriver {
            machine,
            smoother: LandmarkSmoother::with_capacity(config.smoothing_window),
            gate: FrameGate::new(config.frame_stride()),
            narrator,
            completions,
            presenter,
            clock,
            lifting,
            stats: DriverStats::default(),
        }
    }

    /// Run one detected frame (or its absence) through the pipeline
    pub fn process_frame(&mut self, raw: Option<Frame>, now: SessionTime) -> Option<Progress> {
        let start = Instant::now();
        self.stats.frames_processed += 1;

        let smoothed = raw.map(|frame| {
            self.stats.poses_detected += 1;
            self.smoother.smooth(frame)
        });

        if let (Some(thresholds), Some(frame)) = (&self.lifting, &smoothed) {
            if let Some(analysis) = analyze_lifting_posture(frame, thresholds) {
                self.presenter.lifting(&analysis);
            }
        }

        let progress = self.machine.update(smoothed.as_ref(), now);
        self.dispatch_cues();
        self.presenter
            .progress(progress.as_ref(), SkeletonTint::for_progress(progress.as_ref()));

        self.stats.last_frame_duration = start.elapsed();
        progress
    }

    /// Apply narration completions that have already arrived
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(done) = self.completions.try_recv() {
            self.apply_completion(done);
            applied += 1;
        }
        applied
    }

    fn apply_completion(&mut self, done: NarrationCompletion) {
        let now = self.clock.now();
        if self.machine.narration_finished(done.ticket, done.outcome, now) {
            self.stats.narrations_applied += 1;
        }
        self.dispatch_cues();
    }

    fn dispatch_cues(&mut self) {
        let cues: Vec<Cue> = self.machine.drain_cues().collect();
        for cue in cues {
            match &cue {
                Cue::PlayNarration { ticket, audio_ref } => {
                    self.narrator.play(*ticket, audio_ref.clone())
                }
                Cue::PlayEffect { audio_ref } => self.narrator.play_effect(audio_ref.clone()),
                Cue::StopNarration => self.narrator.stop(),
                _ => {}
            }
            self.presenter.present(&cue);
        }
    }

    /// Detect on an admitted capture; the `&mut self` borrow spans the
    /// await, so the next capture waits for this detection
    async fn handle_capture<S: LandmarkSource + ?Sized>(&mut self, source: &mut S, tick: VideoTick) {
        self.stats.captures += 1;
        if !self.gate.admit(tick.video_time) {
            self.stats.frames_skipped += 1;
            return;
        }

        let detected = match source.detect(&tick).await {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.detector_errors += 1;
                warn!(index = tick.index, error = %e, "detection failed, treating as no pose");
                None
            }
        };

        let now = self.clock.now();
        self.process_frame(detected, now);
    }

    /// Pull one capture from the source, after applying pending completions
    ///
    /// Returns `false` once the source has stopped.
    pub async fn step<S: LandmarkSource + ?Sized>(&mut self, source: &mut S) -> bool {
        self.drain_completions();
        match source.next_capture().await {
            Some(tick) => {
                self.handle_capture(source, tick).await;
                true
            }
            None => false,
        }
    }

    /// Run until the source stops
    ///
    /// Narration completions are applied as soon as they arrive, even while
    /// waiting for the next capture. The session is not reset on exit.
    pub async fn run<S: LandmarkSource + ?Sized>(&mut self, source: &mut S) {
        info!(phase = self.machine.current_phase(), "session loop started");
        loop {
            let event = tokio::select! {
                biased;
                Some(done) = self.completions.recv() => LoopEvent::Narration(done),
                tick = source.next_capture() => LoopEvent::Capture(tick),
            };
            match event {
                LoopEvent::Narration(done) => self.apply_completion(done),
                LoopEvent::Capture(Some(tick)) => self.handle_capture(source, tick).await,
                LoopEvent::Capture(None) => break,
            }
        }
        info!(
            phase = self.machine.current_phase(),
            processed = self.stats.frames_processed,
            "session loop stopped"
        );
    }

    /// Back to phase -1 with a clean smoother and gate
    pub fn reset(&mut self) {
        self.narrator.stop();
        self.machine.reset();
        self.smoother.reset();
        self.gate.reset();
        self.dispatch_cues();
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    pub fn current_phase(&self) -> i32 {
        self.machine.current_phase()
    }
}
