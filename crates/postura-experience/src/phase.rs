//! Phase definitions and the phase table

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use postura_core::{PosturaError, PosturaResult};
use postura_pose::PredicateId;

/// Hold duration for pose phases that do not set one
pub const DEFAULT_HOLD_MS: u64 = 500;

/// What moves a phase forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Predicate held for the hold duration
    Pose,
    /// Fixed delay after narration finishes
    Time,
    /// Narration completion itself
    AutoAfterAudio,
    /// Terminal phase
    End,
}

impl Trigger {
    pub fn name(self) -> &'static str {
        match self {
            Trigger::Pose => "pose",
            Trigger::Time => "time",
            Trigger::AutoAfterAudio => "auto_after_audio",
            Trigger::End => "end",
        }
    }
}

/// One step of the guided session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: i32,
    pub name: String,
    /// Subtitle shown on entry
    pub prompt_text: String,
    #[serde(default)]
    pub audio_ref: Option<String>,
    pub trigger: Trigger,
    #[serde(default)]
    pub predicate: Option<PredicateId>,
    #[serde(default)]
    pub hold_duration_ms: Option<u64>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    /// Fire-and-forget sound played on entry
    #[serde(default)]
    pub effect_audio_ref: Option<String>,
    /// Shows the calibration guides and resets the back baseline on entry
    #[serde(default)]
    pub calibration: bool,
}

impl Phase {
    pub fn new(id: i32, name: impl Into<String>, prompt_text: impl Into<String>, trigger: Trigger) -> Self {
        Phase {
            id,
            name: name.into(),
            prompt_text: prompt_text.into(),
            audio_ref: None,
            trigger,
            predicate: None,
            hold_duration_ms: None,
            delay_ms: None,
            effect_audio_ref: None,
            calibration: false,
        }
    }

    pub fn with_audio(mut self, audio_ref: impl Into<String>) -> Self {
        self.audio_ref = Some(audio_ref.into());
        self
    }

    pub fn with_predicate(mut self, predicate: PredicateId) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_hold(mut self, hold_ms: u64) -> Self {
        self.hold_duration_ms = Some(hold_ms);
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn with_effect(mut self, effect_audio_ref: impl Into<String>) -> Self {
        self.effect_audio_ref = Some(effect_audio_ref.into());
        self
    }

    pub fn with_calibration(mut self) -> Self {
        self.calibration = true;
        self
    }

    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_duration_ms.unwrap_or(DEFAULT_HOLD_MS))
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.unwrap_or(0))
    }

    fn check(&self) -> PosturaResult<()> {
        let missing = match self.trigger {
            Trigger::Pose if self.predicate.is_none() => Some("predicate"),
            Trigger::Time if self.delay_ms.is_none() => Some("delay_ms"),
            Trigger::AutoAfterAudio if self.audio_ref.is_none() => Some("audio_ref"),
            _ => None,
        };
        match missing {
            Some(missing) => Err(PosturaError::IncompletePhase {
                phase: self.id,
                trigger: self.trigger.name(),
                missing,
            }),
            None => Ok(()),
        }
    }
}

/// Ordered, validated list of phases
///
/// Ids run 0..n without gaps and only the last phase may end the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PhaseTable {
    phases: Vec<Phase>,
}

impl PhaseTable {
    pub fn new(phases: Vec<Phase>) -> PosturaResult<Self> {
        let table = PhaseTable { phases };
        table.validate()?;
        Ok(table)
    }

    pub fn from_json(json: &str) -> PosturaResult<Self> {
        let phases: Vec<Phase> = serde_json::from_str(json)?;
        Self::new(phases)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> PosturaResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> PosturaResult<()> {
        let Some(last) = self.phases.last() else {
            return Err(PosturaError::InvalidPhaseTable("no phases".into()));
        };

        for (index, phase) in self.phases.iter().enumerate() {
            if phase.id != index as i32 {
                return Err(PosturaError::InvalidPhaseTable(format!(
                    "phase at position {index} has id {}; ids must run 0..{} in order",
                    phase.id,
                    self.phases.len()
                )));
            }
            if phase.trigger == Trigger::End && phase.id != last.id {
                return Err(PosturaError::InvalidPhaseTable(format!(
                    "phase {} ends the session but is not the last phase",
                    phase.id
                )));
            }
            phase.check()?;
        }

        if last.trigger != Trigger::End {
            return Err(PosturaError::InvalidPhaseTable(format!(
                "last phase {} must have an end trigger",
                last.id
            )));
        }
        Ok(())
    }

    pub fn get(&self, id: i32) -> Option<&Phase> {
        usize::try_from(id).ok().and_then(|i| self.phases.get(i))
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn final_id(&self) -> i32 {
        self.phases.len() as i32 - 1
    }

    /// The built-in eight-phase wellbeing session
    pub fn default_script() -> Self {
        PhaseTable {
            phases: vec![
                Phase::new(
                    0,
                    "Calibration",
                    "Sit about one metre from the screen and line up your face and shoulders with the guides.",
                    Trigger::Pose,
                )
                .with_predicate(PredicateId::CalibrationFit)
                .with_hold(2000)
                .with_calibration(),
                Phase::new(
                    1,
                    "Introduction",
                    "Hello. Learning is not only thinking: it is also breathing, feeling, paying attention and connecting with your own body. Let's share a short experience to help you learn.",
                    Trigger::AutoAfterAudio,
                )
                .with_audio("voiceoff/intro.wav"),
                Phase::new(
                    2,
                    "Posture",
                    "Let's begin. Sit comfortably, feet flat on the floor and your back straight.",
                    Trigger::Pose,
                )
                .with_audio("voiceoff/postura_1.wav")
                .with_predicate(PredicateId::StraightBack)
                .with_hold(2000)
                .with_calibration(),
                Phase::new(3, "Posture hold", "Very good, hold that posture.", Trigger::Time)
                    .with_audio("voiceoff/postura_2.wav")
                    .with_delay(2000),
                Phase::new(
                    4,
                    "Breathing",
                    "Now take one or two deep, slow breaths. In gently through the nose... and out through the mouth.",
                    Trigger::Time,
                )
                .with_audio("voiceoff/respiracion.wav")
                .with_delay(6000),
                Phase::new(
                    5,
                    "Connection",
                    "In this calm state, connect with a feeling of openness and confidence.",
                    Trigger::Pose,
                )
                .with_audio("voiceoff/conexion.wav")
                .with_predicate(PredicateId::OpenPosture)
                .with_hold(1500),
                Phase::new(6, "Final gesture", "Finally, look at the screen and smile.", Trigger::Pose)
                    .with_audio("voiceoff/sonrisa.wav")
                    .with_predicate(PredicateId::Smile)
                    .with_hold(1000),
                Phase::new(
                    7,
                    "Closing",
                    "Now that you have heard the bell, you are ready to begin. Good luck today!",
                    Trigger::End,
                )
                .with_audio("voiceoff/cierre.wav")
                .with_effect("voiceoff/campana.wav"),
            ],
        }
    }
}

impl Default for PhaseTable {
    fn default() -> Self {
        Self::default_script()
    }
}

impl<'de> Deserialize<'de> for PhaseTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let phases = Vec::<Phase>::deserialize(deserializer)?;
        PhaseTable::new(phases).map_err(serde::de::Error::custom)
    }
}
