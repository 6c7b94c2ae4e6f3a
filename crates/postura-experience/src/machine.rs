//! Phase Machine - the guided session state
//!
//! Per processed frame the machine:
//! 1. Enters phase 0 on the first frame of a session
//! 2. Reports `AudioPlaying` and does nothing else while narration plays
//! 3. Otherwise runs the current phase's trigger (pose hold or timed delay)
//!
//! Side effects are queued as [`Cue`]s. Narration completion arrives through
//! [`PhaseMachine::narration_finished`] and is applied exactly once per ticket.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, info, warn};

use postura_core::{Frame, Keypoint, SessionTime, Thresholds};
use postura_pose::{BackBaseline, PoseCheck, PredicateContext, PredicateId};

use crate::cue::{Cue, NarrationTicket, PlaybackOutcome};
use crate::phase::{PhaseTable, Trigger};
use crate::progress::Progress;

/// Consecutive failing frames absorbed before a hold resets
pub const MAX_JITTER_FRAMES: u32 = 5;

/// Phase id before the first frame arrives
pub const NOT_STARTED: i32 = -1;

/// Longest frame gap credited to the first frame of a hold
pub const DEFAULT_MAX_FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Mutable session state
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseMachineState {
    pub current_phase: i32,
    pub phase_started_at: SessionTime,
    /// When narration last finished (or the phase began, if it had none)
    pub audio_finished_at: SessionTime,
    pub audio_playing: bool,
    pub hold_started_at: Option<SessionTime>,
    pub jitter_count: u32,
    /// The last pose evaluation in this phase failed
    pub last_check_failed: bool,
    pub back_baseline: Option<BackBaseline>,
    pub pending_narration: Option<NarrationTicket>,
    pub last_frame_at: Option<SessionTime>,
}

impl Default for PhaseMachineState {
    fn default() -> Self {
        PhaseMachineState {
            current_phase: NOT_STARTED,
            phase_started_at: SessionTime::ZERO,
            audio_finished_at: SessionTime::ZERO,
            audio_playing: false,
            hold_started_at: None,
            jitter_count: 0,
            last_check_failed: false,
            back_baseline: None,
            pending_narration: None,
            last_frame_at: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MachineStats {
    pub updates: u64,
    pub predicate_evaluations: u64,
    pub transitions: u64,
    pub jitter_absorbed: u64,
    pub hold_resets: u64,
    pub narrations_started: u64,
    pub narrations_completed: u64,
    pub narrations_failed: u64,
    pub stale_completions: u64,
    pub baselines_captured: u64,
}

/// Guided-session state machine
pub struct PhaseMachine {
    table: PhaseTable,
    thresholds: Thresholds,
    max_frame_interval: Duration,
    state: PhaseMachineState,
    cues: VecDeque<Cue>,
    next_ticket: u64,
    /// Last lighting state sent to the presenter
    lighting_warning_shown: bool,
    /// Validation chime fires on the next full success
    chime_armed: bool,
    stats: MachineStats,
}

impl PhaseMachine {
    pub fn new(table: PhaseTable, thresholds: Thresholds) -> Self {
        PhaseMachine {
            table,
            thresholds,
            max_frame_interval: DEFAULT_MAX_FRAME_INTERVAL,
            state: PhaseMachineState::default(),
            cues: VecDeque::new(),
            next_ticket: 1,
            lighting_warning_shown: false,
            chime_armed: true,
            stats: MachineStats::default(),
        }
    }

    /// Cap on the gap credited to a hold's first frame
    pub fn with_max_frame_interval(mut self, interval: Duration) -> Self {
        self.max_frame_interval = interval;
        self
    }

    /// Process one frame (or its absence) at `now`
    pub fn update(&mut self, frame: Option<&Frame>, now: SessionTime) -> Option<Progress> {
        self.stats.updates += 1;
        let previous_frame_at = self.state.last_frame_at.replace(now);

        if self.state.current_phase == NOT_STARTED {
            if frame.is_some() {
                self.transition_to(0, now);
            }
            return None;
        }

        let phase = self.table.get(self.state.current_phase)?;
        let name = phase.name.clone();

        if self.state.audio_playing {
            self.state.hold_started_at = None;
            return Some(Progress::AudioPlaying { name });
        }

        let trigger = phase.trigger;
        match trigger {
            Trigger::Pose => {
                let predicate = phase.predicate?;
                let hold = phase.hold_duration();
                let calibration = phase.calibration;
                Some(self.update_pose(
                    frame,
                    now,
                    previous_frame_at,
                    PoseStep {
                        name,
                        predicate,
                        hold,
                        calibration,
                    },
                ))
            }
            Trigger::Time => {
                let delay = phase.delay();
                if frame.is_some() && now.since(self.state.audio_finished_at) > delay {
                    self.transition_to(self.state.current_phase + 1, now);
                }
                Some(Progress::Waiting { name })
            }
            Trigger::AutoAfterAudio | Trigger::End => None,
        }
    }

    fn update_pose(
        &mut self,
        frame: Option<&Frame>,
        now: SessionTime,
        previous_frame_at: Option<SessionTime>,
        step: PoseStep,
    ) -> Progress {
        let check = match frame {
            Some(frame) => {
                self.stats.predicate_evaluations += 1;
                self.update_lighting(frame);
                self.evaluate(step.predicate, frame, now)
            }
            None => {
                self.set_lighting_warning(false);
                PoseCheck::fail()
            }
        };

        let previous_failed =
            std::mem::replace(&mut self.state.last_check_failed, !check.achieved);
        let progress = if check.achieved {
            self.state.jitter_count = 0;
            let credit = match previous_frame_at {
                Some(previous) if !previous_failed => {
                    now.since(previous).min(self.max_frame_interval)
                }
                _ => Duration::ZERO,
            };
            let audio_finished_at = self.state.audio_finished_at;
            let started = *self.state.hold_started_at.get_or_insert_with(|| {
                // One frame interval at most, never before narration ended
                now.saturating_sub(credit).max(audio_finished_at).min(now)
            });
            Progress::Holding {
                is_valid: true,
                current: now.since(started),
                total: step.hold,
                name: step.name,
                jitter_tolerance: false,
            }
        } else {
            self.state.jitter_count += 1;
            if self.state.jitter_count > MAX_JITTER_FRAMES {
                if self.state.hold_started_at.take().is_some() {
                    self.stats.hold_resets += 1;
                }
                self.state.jitter_count = 0;
                Progress::Holding {
                    is_valid: false,
                    current: Duration::ZERO,
                    total: step.hold,
                    name: step.name,
                    jitter_tolerance: false,
                }
            } else {
                self.stats.jitter_absorbed += 1;
                Progress::Holding {
                    is_valid: false,
                    current: self
                        .state
                        .hold_started_at
                        .map(|started| now.since(started))
                        .unwrap_or(Duration::ZERO),
                    total: step.hold,
                    name: step.name,
                    jitter_tolerance: true,
                }
            }
        };

        if step.calibration {
            self.calibration_feedback(&check, step.predicate, &progress);
        }

        if let Progress::Holding {
            is_valid: true,
            current,
            total,
            ..
        } = &progress
        {
            if current >= total {
                self.transition_to(self.state.current_phase + 1, now);
            }
        }
        progress
    }

    fn evaluate(&mut self, predicate: PredicateId, frame: &Frame, now: SessionTime) -> PoseCheck {
        let had_baseline = self.state.back_baseline.is_some();
        let mut ctx = PredicateContext {
            thresholds: &self.thresholds,
            baseline: &mut self.state.back_baseline,
            now,
        };
        let check = predicate.evaluate(frame, &mut ctx);
        if !had_baseline && self.state.back_baseline.is_some() {
            self.stats.baselines_captured += 1;
        }
        check
    }

    fn update_lighting(&mut self, frame: &Frame) {
        let dim = frame
            .get(Keypoint::Nose)
            .map(|nose| nose.visibility < self.thresholds.lighting_visibility_min)
            .unwrap_or(false);
        self.set_lighting_warning(dim);
    }

    fn set_lighting_warning(&mut self, show: bool) {
        if show == self.lighting_warning_shown {
            return;
        }
        self.lighting_warning_shown = show;
        self.cues.push_back(if show {
            Cue::ShowLightingWarning
        } else {
            Cue::HideLightingWarning
        });
    }

    fn calibration_feedback(&mut self, check: &PoseCheck, predicate: PredicateId, progress: &Progress) {
        if predicate == PredicateId::CalibrationFit {
            self.cues.push_back(Cue::CalibrationStatus {
                is_correct: check.achieved,
                percent: (progress.fraction() * 100.0).round() as u8,
            });
        }

        let guides = check.guides();
        self.cues.push_back(Cue::GuideFeedback {
            face_valid: guides.face_valid,
            shoulders_valid: guides.shoulders_valid,
        });

        if check.achieved && self.chime_armed {
            self.chime_armed = false;
            self.cues.push_back(Cue::ValidationChime);
        } else if !check.achieved {
            self.chime_armed = true;
        }
    }

    fn transition_to(&mut self, phase_id: i32, now: SessionTime) {
        if phase_id == self.state.current_phase {
            return;
        }
        let Some(phase) = self.table.get(phase_id).cloned() else {
            warn!(phase = phase_id, "transition to unknown phase ignored");
            return;
        };

        let from = self.state.current_phase;
        self.state.current_phase = phase_id;
        self.state.phase_started_at = now;
        self.state.hold_started_at = None;
        self.state.jitter_count = 0;
        self.state.last_check_failed = false;
        self.chime_armed = true;
        self.stats.transitions += 1;
        self.set_lighting_warning(false);

        if phase.calibration {
            self.state.back_baseline = None;
            info!(phase = phase_id, "back baseline reset");
            self.cues.push_back(Cue::ShowCalibrationGuides);
        } else {
            self.cues.push_back(Cue::HideCalibrationGuides);
        }

        info!(from, to = phase_id, name = %phase.name, "phase transition");

        self.cues.push_back(Cue::PhaseNotification {
            name: phase.name.clone(),
        });
        self.cues.push_back(Cue::Subtitle {
            text: phase.prompt_text.clone(),
        });

        if let Some(effect) = phase.effect_audio_ref {
            self.cues.push_back(Cue::PlayEffect { audio_ref: effect });
        }

        match phase.audio_ref {
            Some(audio_ref) => {
                let ticket = NarrationTicket(self.next_ticket);
                self.next_ticket += 1;
                self.state.pending_narration = Some(ticket);
                self.state.audio_playing = true;
                self.stats.narrations_started += 1;
                debug!(%ticket, audio_ref = %audio_ref, "narration requested");
                self.cues.push_back(Cue::PlayNarration { ticket, audio_ref });
            }
            None => {
                if self.state.pending_narration.take().is_some() {
                    self.cues.push_back(Cue::StopNarration);
                }
                self.state.audio_playing = false;
                self.state.audio_finished_at = now;
            }
        }
    }

    /// Apply a narration completion
    ///
    /// Returns `false` for a ticket that is not the pending one. Failed
    /// playback counts as completion. Auto-after-audio phases advance here.
    pub fn narration_finished(
        &mut self,
        ticket: NarrationTicket,
        outcome: PlaybackOutcome,
        now: SessionTime,
    ) -> bool {
        if self.state.pending_narration != Some(ticket) {
            self.stats.stale_completions += 1;
            debug!(%ticket, "stale narration completion ignored");
            return false;
        }

        self.state.pending_narration = None;
        self.state.audio_playing = false;
        self.state.audio_finished_at = now;
        self.stats.narrations_completed += 1;

        match outcome {
            PlaybackOutcome::Completed => info!(%ticket, phase = self.state.current_phase, "narration finished"),
            PlaybackOutcome::Failed(reason) => {
                self.stats.narrations_failed += 1;
                warn!(%ticket, phase = self.state.current_phase, %reason, "narration failed, continuing");
            }
        }

        let auto_advance = self
            .table
            .get(self.state.current_phase)
            .map(|phase| phase.trigger == Trigger::AutoAfterAudio)
            .unwrap_or(false);
        if auto_advance {
            self.transition_to(self.state.current_phase + 1, now);
        }
        true
    }

    /// Return to the pre-session state; the next frame re-enters phase 0
    pub fn reset(&mut self) {
        if self.state.pending_narration.is_some() {
            self.cues.push_back(Cue::StopNarration);
        }
        self.set_lighting_warning(false);
        self.state = PhaseMachineState::default();
        self.chime_armed = true;
        self.cues.push_back(Cue::Subtitle {
            text: String::new(),
        });
        info!("session reset");
    }

    pub fn pop_cue(&mut self) -> Option<Cue> {
        self.cues.pop_front()
    }

    pub fn drain_cues(&mut self) -> std::collections::vec_deque::Drain<'_, Cue> {
        self.cues.drain(..)
    }

    pub fn current_phase(&self) -> i32 {
        self.state.current_phase
    }

    pub fn is_finished(&self) -> bool {
        self.state.current_phase == self.table.final_id()
    }

    pub fn is_audio_playing(&self) -> bool {
        self.state.audio_playing
    }

    pub fn pending_narration(&self) -> Option<NarrationTicket> {
        self.state.pending_narration
    }

    pub fn back_baseline(&self) -> Option<BackBaseline> {
        self.state.back_baseline
    }

    pub fn state(&self) -> &PhaseMachineState {
        &self.state
    }

    pub fn table(&self) -> &PhaseTable {
        &self.table
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn max_frame_interval(&self) -> Duration {
        self.max_frame_interval
    }

    pub fn stats(&self) -> &MachineStats {
        &self.stats
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new(PhaseTable::default_script(), Thresholds::default())
    }
}

struct PoseStep {
    name: String,
    predicate: PredicateId,
    hold: Duration,
    calibration: bool,
}
