//! Session simulator for guided-session testing
//!
//! Drives a [`PhaseMachine`] frame by frame on a manual clock. Narration is
//! simulated as a fixed-length clip, and tracking dropouts are drawn from a
//! seeded RNG so every run is reproducible.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use postura_core::{Clock, DeviceClass, Frame, ManualClock, SessionTime, Thresholds};
use postura_experience::{
    Cue, NarrationTicket, PhaseMachine, PhaseTable, PlaybackOutcome, Progress,
};
use postura_pose::{LandmarkSmoother, PredicateId};

use crate::fixtures;

/// Simulated capture and playback conditions
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Time between processed frames
    pub frame_interval: Duration,
    /// Length of every narration clip
    pub narration_length: Duration,
    /// Probability a frame loses its pose (0.0 - 1.0)
    pub dropout_rate: f64,
    /// Narration fails instead of completing
    pub narration_fails: bool,
    pub seed: u64,
    pub device: DeviceClass,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::ideal()
    }
}

impl SimulatorConfig {
    /// 30 fps desktop capture, no dropouts
    pub fn ideal() -> Self {
        SimulatorConfig {
            frame_interval: Duration::from_millis(33),
            narration_length: Duration::from_millis(1500),
            dropout_rate: 0.0,
            narration_fails: false,
            seed: 0,
            device: DeviceClass::Desktop,
        }
    }

    /// Tracker loses the user on roughly one frame in seven
    pub fn flaky() -> Self {
        SimulatorConfig {
            dropout_rate: 0.15,
            seed: 7,
            ..Self::ideal()
        }
    }

    /// Phone capture: fewer processed frames, mobile guides
    pub fn mobile() -> Self {
        SimulatorConfig {
            frame_interval: Duration::from_millis(50),
            device: DeviceClass::Mobile,
            ..Self::ideal()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_dropout(mut self, rate: f64) -> Self {
        self.dropout_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_failing_narration(mut self) -> Self {
        self.narration_fails = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatorStats {
    pub steps: u64,
    pub dropped_frames: u64,
    pub narrations_started: u64,
    pub narrations_completed: u64,
    /// Narrations replaced or stopped before their clip ended
    pub narrations_cut: u64,
}

/// Deterministic guided session
pub struct SessionSimulator {
    config: SimulatorConfig,
    machine: PhaseMachine,
    smoother: LandmarkSmoother,
    clock: ManualClock,
    rng: StdRng,
    /// Playing narration and when its clip ends
    narration: Option<(NarrationTicket, SessionTime)>,
    cues: Vec<Cue>,
    phases_visited: Vec<i32>,
    stats: SimulatorStats,
}

impl SessionSimulator {
    /// Simulate the built-in script
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_table(config, PhaseTable::default_script())
    }

    pub fn with_table(config: SimulatorConfig, table: PhaseTable) -> Self {
        let thresholds = Thresholds::for_device(config.device);
        SessionSimulator {
            rng: StdRng::seed_from_u64(config.seed),
            machine: PhaseMachine::new(table, thresholds),
            smoother: LandmarkSmoother::new(),
            clock: ManualClock::new(),
            narration: None,
            cues: Vec::new(),
            phases_visited: Vec::new(),
            stats: SimulatorStats::default(),
            config,
        }
    }

    /// Advance one frame interval and process `frame`
    pub fn step(&mut self, frame: Option<&Frame>) -> Option<Progress> {
        let now = self.clock.advance(self.config.frame_interval);
        self.stats.steps += 1;
        self.complete_due_narration(now);

        let dropped = frame.is_some()
            && self.config.dropout_rate > 0.0
            && self.rng.gen_bool(self.config.dropout_rate);
        if dropped {
            self.stats.dropped_frames += 1;
        }
        let tracked = frame.filter(|_| !dropped);

        let smoothed = tracked.map(|f| self.smoother.smooth(f.clone()));
        let progress = self.machine.update(smoothed.as_ref(), now);
        self.collect_cues(now);
        progress
    }

    /// Step with a user who does what the current phase asks
    pub fn step_cooperative(&mut self) -> Option<Progress> {
        let frame = self.cooperative_frame();
        self.step(Some(&frame))
    }

    /// The pose the current phase asks for; seated when it asks for none
    pub fn cooperative_frame(&self) -> Frame {
        let predicate = self
            .machine
            .table()
            .get(self.machine.current_phase())
            .and_then(|phase| phase.predicate);
        match (predicate, self.config.device) {
            (None, DeviceClass::Mobile) => fixtures::mobile_framed(),
            (None, DeviceClass::Desktop) => fixtures::seated(),
            (Some(predicate), _) => self.posed(predicate),
        }
    }

    fn posed(&self, predicate: PredicateId) -> Frame {
        match (predicate, self.config.device) {
            (PredicateId::CalibrationFit | PredicateId::StraightBack, DeviceClass::Mobile) => {
                fixtures::mobile_framed()
            }
            _ => fixtures::satisfying(predicate),
        }
    }

    /// Step until the machine reaches `phase`; returns the steps taken
    pub fn run_until_phase<F>(&mut self, phase: i32, max_steps: u64, mut poses: F) -> Option<u64>
    where
        F: FnMut(&Self) -> Option<Frame>,
    {
        for taken in 1..=max_steps {
            let frame = poses(self);
            self.step(frame.as_ref());
            if self.machine.current_phase() == phase {
                return Some(taken);
            }
        }
        None
    }

    /// Cooperative user until the final phase; returns the steps taken
    pub fn run_session(&mut self, max_steps: u64) -> Option<u64> {
        let last = self.machine.table().final_id();
        self.run_until_phase(last, max_steps, |sim| Some(sim.cooperative_frame()))
    }

    fn complete_due_narration(&mut self, now: SessionTime) {
        let Some((ticket, due)) = self.narration else {
            return;
        };
        if now < due {
            return;
        }
        self.narration = None;
        self.stats.narrations_completed += 1;
        let outcome = if self.config.narration_fails {
            PlaybackOutcome::Failed("simulated playback failure".into())
        } else {
            PlaybackOutcome::Completed
        };
        self.machine.narration_finished(ticket, outcome, now);
        self.collect_cues(now);
    }

    fn collect_cues(&mut self, now: SessionTime) {
        let cues: Vec<Cue> = self.machine.drain_cues().collect();
        for cue in cues {
            match &cue {
                Cue::PlayNarration { ticket, .. } => {
                    if self.narration.is_some() {
                        self.stats.narrations_cut += 1;
                    }
                    self.stats.narrations_started += 1;
                    self.narration = Some((*ticket, now + self.config.narration_length));
                }
                Cue::StopNarration => {
                    if self.narration.take().is_some() {
                        self.stats.narrations_cut += 1;
                    }
                }
                Cue::PhaseNotification { .. } => {
                    self.phases_visited.push(self.machine.current_phase());
                }
                _ => {}
            }
            self.cues.push(cue);
        }
    }

    pub fn now(&self) -> SessionTime {
        self.clock.now()
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut PhaseMachine {
        &mut self.machine
    }

    /// Every cue emitted so far, in order
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Phase ids in the order they were entered
    pub fn phases_visited(&self) -> &[i32] {
        &self.phases_visited
    }

    pub fn narration_playing(&self) -> Option<NarrationTicket> {
        self.narration.map(|(ticket, _)| ticket)
    }

    pub fn stats(&self) -> &SimulatorStats {
        &self.stats
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}
