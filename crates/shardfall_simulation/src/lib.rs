//! SHARDFALL Simulation Core
//!
//! 2D combat core на Bevy 0.16 (ECS strategic layer):
//! melee combo с arc sweeps, отражающийся луч, hit-stop.
//!
//! Геометрию мира, здоровье, stamina и time scale combat core получает через
//! capability traits (`combat::world`), поэтому тот же код работает в
//! headless Arena, в тестах и поверх физики движка.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

// Публичные модули
pub mod combat;
pub mod components;
pub mod logger;

// Re-export базовых типов для удобства
pub use combat::{
    spawn_combatant, spawn_dummy, Arena, AttackStage, BeamEmitter, BeamMode, CollisionMask,
    CombatConfig, CombatEvent, CombatNotification, CombatPlugin, ComboStateMachine, EntityDied,
    SlowMotionCoordinator, TargetAcquisition,
};
pub use components::*;
pub use logger::{init_logger, log, log_error, log_info, log_warning};

/// Fixed simulation rate.
pub const SIMULATION_HZ: f64 = 60.0;

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ));

        // Детерминистичный RNG (seed по умолчанию, если app его ещё не задал)
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        app.add_plugins(CombatPlugin);
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время шагает вручную: один `app.update()` = ровно один fixed tick
/// (1/60 s real), поэтому прогоны детерминированы. `SimulationPlugin`
/// добавляется вызывающим.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / SIMULATION_HZ,
        )))
        .insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ)); // 60Hz FixedUpdate

    app
}
