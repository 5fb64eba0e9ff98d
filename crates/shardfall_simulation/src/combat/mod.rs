//! Combat module (melee arc sweeps, reflecting beams, hit-stop)
//!
//! Core (plain state, engine-agnostic):
//! - combo: 4-stage ComboStateMachine (windup → active → recovery)
//! - arc_sweep: wedge sampling → overlap queries → hits
//! - beam: bounce paths, scatter cone, Scatter/Collapsing/Beam mode machine
//! - slow_motion: глобальный time scale (most restrictive wins)
//! - hit_registry / targeting: at-most-once hits, soft lock
//!
//! Collaborators (world geometry, health, stamina, slow-motion) приходят через
//! `CombatContext`. ECS слой (systems) собирает контекст из ресурсов и
//! пересылает `CombatEvent` как `CombatNotification`.

use bevy::prelude::*;
use bevy::time::TimeSystem;

pub mod arc_sweep;
pub mod arena;
pub mod beam;
pub mod combo;
pub mod config;
pub mod events;
pub mod geometry;
pub mod hit_registry;
pub mod slow_motion;
pub mod systems;
pub mod targeting;
pub mod world;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod arc_sweep_tests;
#[cfg(test)]
mod beam_tests;

// Re-export основных типов
pub use arc_sweep::{ArcSweepResolver, HitReport, StrikeParams, Wedge};
pub use arena::Arena;
pub use beam::{BeamEmitter, BeamMode, BeamPath, BeamPathResolver, BeamTermination};
pub use combo::{AttackStage, ComboStateMachine, StagePhase};
pub use config::{
    ArcSweepConfig, BeamConfig, CombatConfig, ComboConfig, ConfigError, SlowMotionConfig,
    SoftLockConfig, StageProfile,
};
pub use events::{CombatEvent, CombatNotification, EntityDied};
pub use hit_registry::HitRegistry;
pub use slow_motion::{SlowMotionCoordinator, SlowMotionHandle};
pub use targeting::TargetAcquisition;
pub use world::{CollisionMask, CombatContext, Damageable, ResourceSource, WorldQuery};

use crate::components::{Actor, CombatInput, Health, Hurtbox, Stamina};

/// Combat Plugin
///
/// Порядок выполнения:
/// - First (после TimeSystem): tick_slow_motion → sync_virtual_time
/// - FixedUpdate (chain):
///   1. regenerate_stamina
///   2. sync_arena_bodies: hurtbox'ы → Arena
///   3. assist_aim: soft lock
///   4. update_combos / update_beams
///   5. detect_deaths → teardown_dead_combatants
///
/// Невалидный `CombatConfig` не паникует: error в лог + defaults.
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<Arena>() {
            app.init_resource::<Arena>();
        }
        let tolerance = app.world().resource::<Arena>().surface_tolerance();

        let config = app
            .world()
            .get_resource::<CombatConfig>()
            .cloned()
            .unwrap_or_default();
        let config = match config.validate(tolerance) {
            Ok(()) => config,
            Err(err) => {
                crate::logger::log_error(&format!(
                    "⚔️ CombatPlugin: invalid config ({}), falling back to defaults",
                    err
                ));
                CombatConfig::default()
            }
        };

        if !app.world().contains_resource::<SlowMotionCoordinator>() {
            app.insert_resource(SlowMotionCoordinator::new(config.slow_motion.clone()));
        }
        app.insert_resource(config);

        // Регистрация событий
        app.add_event::<CombatNotification>()
            .add_event::<EntityDied>();

        app.add_systems(
            First,
            (systems::tick_slow_motion, systems::sync_virtual_time)
                .chain()
                .after(TimeSystem),
        );

        app.add_systems(
            FixedUpdate,
            (
                systems::regenerate_stamina,
                systems::sync_arena_bodies,
                systems::assist_aim,
                systems::update_combos,
                systems::update_beams,
                systems::detect_deaths,
                systems::teardown_dead_combatants,
            )
                .chain(), // Последовательное выполнение
        );

        app.add_observer(systems::release_combo_on_remove)
            .add_observer(systems::release_beam_on_remove);
    }
}

/// Spawn combatant: Actor + hurtbox + combo + beam + soft lock
///
/// State machines знают своего owner'а (self-hit фильтр), поэтому
/// entity сначала резервируется, потом получает combat компоненты.
pub fn spawn_combatant(
    commands: &mut Commands,
    config: &CombatConfig,
    position: Vec2,
    faction_id: u64,
    hurtbox: Hurtbox,
) -> Entity {
    let entity = commands
        .spawn((
            Transform::from_translation(position.extend(0.0)),
            Actor { faction_id },
            hurtbox,
            CombatInput::default(),
        ))
        .id();

    commands.entity(entity).insert((
        ComboStateMachine::new(entity, config.combo.clone()),
        BeamEmitter::new(entity, config.beam.clone()),
        TargetAcquisition::new(config.soft_lock.clone()),
    ));

    entity
}

/// Spawn training dummy (без combat state, только Health + hurtbox)
pub fn spawn_dummy(commands: &mut Commands, position: Vec2, faction_id: u64, health: f32) -> Entity {
    commands
        .spawn((
            Transform::from_translation(position.extend(0.0)),
            Actor { faction_id },
            Health::new(health),
            Stamina::new(0.0),
            Hurtbox::enemy(0.4),
        ))
        .id()
}
