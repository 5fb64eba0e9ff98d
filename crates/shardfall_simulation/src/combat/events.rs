//! Combat side-effect notifications.
//!
//! The core only emits these; VFX, audio, camera shake and the movement layer
//! consume them. Nothing in the core waits for a reply.

use bevy::prelude::*;

use super::arc_sweep::HitReport;
use super::beam::BeamMode;
use super::combo::{AttackStage, StagePhase};

#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    /// A combo stage started (resource already spent).
    StageStarted { stage: AttackStage, action_id: u64 },
    /// Windup → Active → Recovery transitions (telegraph, animation sync).
    PhaseChanged { stage: AttackStage, phase: StagePhase },
    /// Stage left the machine: normally (`completed`) or by teardown.
    StageEnded { stage: AttackStage, completed: bool },
    /// Damage applied once to `target` within the current action/invocation.
    Hit(HitReport),
    /// Root-motion step requested for the attacker (applied by the movement layer).
    MovementRequested { delta: Vec2 },
    /// Hit-stop granted by the slow-motion coordinator.
    HitStopRequested { factor: f32, duration: f32 },
    BeamModeChanged { from: BeamMode, to: BeamMode },
    /// Scatter volley: ray end points used as visual edge guides.
    ScatterFired {
        origin: Vec2,
        half_angle: f32,
        endpoints: Vec<Vec2>,
    },
    /// Converged beam polyline for this tick.
    BeamFired { points: Vec<Vec2>, reflected: bool },
}

/// ECS envelope: `CombatEvent` + who produced it.
#[derive(Event, Debug, Clone)]
pub struct CombatNotification {
    pub source: Entity,
    pub event: CombatEvent,
}

/// Событие: entity умер (health <= 0)
#[derive(Event, Debug, Clone)]
pub struct EntityDied {
    pub entity: Entity,
}
