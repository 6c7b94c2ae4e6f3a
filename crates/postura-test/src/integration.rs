//! End-to-end Session Scenarios
//!
//! Scenarios that run a complete guided session:
//! - Cooperative user through the default script
//! - Tracking dropouts absorbed by the jitter tolerance
//! - Mobile framing against the mobile guides
//! - A user who never lines up with the guides
//! - A recorded session replayed through the async driver

use std::sync::Arc;
use std::time::Duration;

use postura_core::{Clock, Frame, ManualClock, PosturaResult, SessionTime};
use postura_experience::{PhaseTable, NOT_STARTED};
use postura_runtime::{
    ExperienceDriver, RecordedFrame, RecordedSource, RecordingPresenter, RuntimeConfig,
    ScriptedAudioPlayer,
};

use crate::fixtures;
use crate::simulator::{SessionSimulator, SimulatorConfig};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Scenario configuration
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub name: &'static str,
    pub simulator: SimulatorConfig,
    /// Give up after this many frames
    pub max_steps: u64,
}

impl ScenarioConfig {
    /// Ideal capture
    pub fn minimal() -> Self {
        Self {
            name: "minimal",
            simulator: SimulatorConfig::ideal(),
            max_steps: 2_000,
        }
    }

    /// Realistic tracking dropouts
    pub fn standard() -> Self {
        Self {
            name: "standard",
            simulator: SimulatorConfig::flaky(),
            max_steps: 3_000,
        }
    }

    /// Heavy dropouts: holds may reset, the session must still finish
    pub fn stress() -> Self {
        Self {
            name: "stress",
            simulator: SimulatorConfig::flaky().with_dropout(0.3).with_seed(99),
            max_steps: 10_000,
        }
    }

    pub fn with_simulator(mut self, simulator: SimulatorConfig) -> Self {
        self.simulator = simulator;
        self
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// What a scenario observed
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: &'static str,
    pub steps: u64,
    pub final_phase: i32,
    pub finished: bool,
    /// Phase ids in the order they were entered
    pub phases_visited: Vec<i32>,
    pub session_time: Duration,
    pub dropped_frames: u64,
    pub jitter_absorbed: u64,
    pub hold_resets: u64,
    pub narrations_completed: u64,
}

impl ScenarioResult {
    /// Finished, having entered every phase once and in order
    pub fn passed(&self) -> bool {
        self.finished && self.visited_in_order()
    }

    pub fn visited_in_order(&self) -> bool {
        self.phases_visited
            .iter()
            .enumerate()
            .all(|(i, &phase)| phase == i as i32)
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Runs a cooperative user through a simulated session
pub struct ScenarioHarness {
    config: ScenarioConfig,
    simulator: SessionSimulator,
}

impl ScenarioHarness {
    pub fn new(config: ScenarioConfig) -> Self {
        let simulator = SessionSimulator::new(config.simulator.clone());
        Self { config, simulator }
    }

    pub fn with_table(config: ScenarioConfig, table: PhaseTable) -> Self {
        let simulator = SessionSimulator::with_table(config.simulator.clone(), table);
        Self { config, simulator }
    }

    /// Cooperative user until the session ends or the step budget runs out
    pub fn run(&mut self) -> ScenarioResult {
        self.simulator.run_session(self.config.max_steps);
        self.result()
    }

    /// Feed the same frame until the budget runs out
    pub fn run_with(&mut self, frame: &Frame) -> ScenarioResult {
        let last = self.simulator.machine().table().final_id();
        self.simulator
            .run_until_phase(last, self.config.max_steps, |_| Some(frame.clone()));
        self.result()
    }

    pub fn result(&self) -> ScenarioResult {
        let machine = self.simulator.machine();
        let stats = self.simulator.stats();
        ScenarioResult {
            name: self.config.name,
            steps: stats.steps,
            final_phase: machine.current_phase(),
            finished: machine.is_finished(),
            phases_visited: self.simulator.phases_visited().to_vec(),
            session_time: self.simulator.now().since(SessionTime::ZERO),
            dropped_frames: stats.dropped_frames,
            jitter_absorbed: machine.stats().jitter_absorbed,
            hold_resets: machine.stats().hold_resets,
            narrations_completed: stats.narrations_completed,
        }
    }

    pub fn simulator(&self) -> &SessionSimulator {
        &self.simulator
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// Default script, ideal capture
pub fn scenario_full_session() -> ScenarioResult {
    ScenarioHarness::new(ScenarioConfig::minimal()).run()
}

/// Default script, seeded tracking dropouts
pub fn scenario_session_with_dropouts() -> ScenarioResult {
    ScenarioHarness::new(ScenarioConfig::standard()).run()
}

/// Phone framing against the mobile guides
pub fn scenario_mobile_session() -> ScenarioResult {
    ScenarioHarness::new(ScenarioConfig::minimal().with_simulator(SimulatorConfig::mobile())).run()
}

/// User sits off to the side for the whole session
pub fn scenario_calibration_refused() -> ScenarioResult {
    let mut config = ScenarioConfig::minimal();
    config.name = "calibration_refused";
    config.max_steps = 300;
    ScenarioHarness::new(config).run_with(&fixtures::off_center())
}

/// Recording for [`scenario_recorded_session`]: 100 ms apart, seated through
/// the timed phases, then arms open, then a smile
pub fn cooperative_recording() -> Vec<RecordedFrame> {
    let poses = (0..140)
        .map(|_| fixtures::seated())
        .chain((0..30).map(|_| fixtures::arms_open()))
        .chain((0..30).map(|_| fixtures::smiling()));
    poses
        .enumerate()
        .map(|(i, frame)| RecordedFrame {
            video_time_ms: i as i64 * 100,
            landmarks: Some(frame.slots().to_vec()),
        })
        .collect()
}

/// Replay [`cooperative_recording`] through the async driver
///
/// Narration completes as soon as it starts, so the session follows the
/// recording's clock.
pub async fn scenario_recorded_session() -> PosturaResult<(ScenarioResult, Arc<RecordingPresenter>)> {
    let config = RuntimeConfig {
        frame_stride: Some(1),
        ..Default::default()
    };
    let presenter = Arc::new(RecordingPresenter::new());
    let clock = ManualClock::new();

    let mut source = RecordedSource::new(cooperative_recording()).with_clock(clock.clone());
    let captures = source.len() as u64;

    let mut driver = ExperienceDriver::with_config(
        &config,
        Arc::new(ScriptedAudioPlayer::new()),
        presenter.clone(),
        Arc::new(clock.clone()),
    )?;
    driver.run(&mut source).await;

    let table = driver.machine().table();
    let phases_visited = presenter
        .phase_notifications()
        .iter()
        .filter_map(|name| table.phases().iter().position(|p| &p.name == name))
        .map(|i| i as i32)
        .collect();

    let machine = driver.machine();
    let result = ScenarioResult {
        name: "recorded_session",
        steps: captures,
        final_phase: machine.current_phase(),
        finished: machine.is_finished(),
        phases_visited,
        session_time: Duration::from_millis(clock.now().as_millis().max(0) as u64),
        dropped_frames: 0,
        jitter_absorbed: machine.stats().jitter_absorbed,
        hold_resets: machine.stats().hold_resets,
        narrations_completed: driver.stats().narrations_applied,
    };
    Ok((result, presenter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use postura_experience::{Cue, SkeletonTint};

    #[test]
    fn test_full_session() {
        let result = scenario_full_session();
        assert!(result.passed(), "{result:?}");
        assert_eq!(result.phases_visited, (0..8).collect::<Vec<_>>());
        assert_eq!(result.hold_resets, 0);
        // Calibration has no narration; the closing clip is still playing
        assert_eq!(result.narrations_completed, 6);
    }

    #[test]
    fn test_session_with_dropouts() {
        let result = scenario_session_with_dropouts();
        assert!(result.passed(), "{result:?}");
        assert!(result.dropped_frames > 0);
        assert!(result.jitter_absorbed > 0);
        assert!(result.session_time >= scenario_full_session().session_time);
    }

    #[test]
    fn test_stress_session_finishes() {
        let result = ScenarioHarness::new(ScenarioConfig::stress()).run();
        assert!(result.passed(), "{result:?}");
    }

    #[test]
    fn test_mobile_session() {
        let result = scenario_mobile_session();
        assert!(result.passed(), "{result:?}");
    }

    #[test]
    fn test_calibration_refused() {
        let result = scenario_calibration_refused();
        assert_eq!(result.final_phase, 0);
        assert_eq!(result.phases_visited, vec![0]);
        assert!(!result.passed());
    }

    #[test]
    fn test_session_starts_only_with_a_person() {
        let mut harness = ScenarioHarness::new(ScenarioConfig::minimal());
        let last = harness.simulator.machine().table().final_id();
        harness.simulator.run_until_phase(last, 20, |_| None);
        assert_eq!(harness.result().final_phase, NOT_STARTED);

        harness.simulator.step_cooperative();
        harness.simulator.step_cooperative();
        assert_eq!(harness.result().phases_visited, vec![0]);
    }

    #[test]
    fn test_scenario_is_reproducible() {
        let a = scenario_session_with_dropouts();
        let b = scenario_session_with_dropouts();
        assert_eq!(a.steps, b.steps);
        assert_eq!(a.dropped_frames, b.dropped_frames);
    }

    #[tokio::test]
    async fn test_recorded_session_through_driver() {
        let (result, presenter) = scenario_recorded_session().await.unwrap();
        assert!(result.passed(), "{result:?}");

        let cues = presenter.cues();
        assert!(cues.contains(&Cue::PlayEffect {
            audio_ref: "voiceoff/campana.wav".into()
        }));
        assert!(presenter.tints().contains(&SkeletonTint::Success));
        assert!(presenter
            .progress_reports()
            .iter()
            .flatten()
            .any(|p| p.name() == "Final gesture"));
    }
}
