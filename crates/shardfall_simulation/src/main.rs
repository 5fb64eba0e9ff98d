//! Headless дуэль SHARDFALL
//!
//! Игрок с комбо и лучом против манекенов в маленькой арене (стены + зеркала).
//! Печатает попадания, смерти и итоговое состояние.

use bevy::prelude::*;
use rand::Rng;
use shardfall_simulation::{
    create_headless_app, spawn_combatant, spawn_dummy, Arena, CombatConfig, CombatEvent,
    CombatInput, CombatNotification, DeterministicRng, EntityDied, Health, Hurtbox,
    SimulationPlugin, SlowMotionCoordinator,
};

const TICKS: usize = 900;
const DUMMIES: usize = 4;

fn main() {
    let seed = 42;
    println!("Starting SHARDFALL headless duel (seed: {})", seed);

    let mut app = create_headless_app(seed);
    build_arena(&mut app);
    app.add_plugins(SimulationPlugin);

    let config = app.world().resource::<CombatConfig>().clone();
    let player = {
        let mut commands = app.world_mut().commands();
        spawn_combatant(&mut commands, &config, Vec2::ZERO, 1, Hurtbox::player(0.45))
    };
    let positions: Vec<Vec2> = {
        let mut rng = app.world_mut().resource_mut::<DeterministicRng>();
        (0..DUMMIES)
            .map(|_| Vec2::new(rng.rng.gen_range(1.5..4.0), rng.rng.gen_range(-2.0..2.0)))
            .collect()
    };
    {
        let mut commands = app.world_mut().commands();
        for position in &positions {
            spawn_dummy(&mut commands, *position, 2, 60.0);
        }
    }
    app.world_mut().flush();

    let mut hits = 0usize;
    let mut deaths = 0usize;
    let mut beam_ticks = 0usize;

    for tick in 0..TICKS {
        drive_player(&mut app, player, tick);
        app.update();

        let world = app.world_mut();
        for notification in world.resource_mut::<Events<CombatNotification>>().drain() {
            match notification.event {
                CombatEvent::Hit(report) => {
                    hits += 1;
                    println!(
                        "Tick {}: {:?} hit {:?} for {:.1}",
                        tick, notification.source, report.target, report.damage
                    );
                }
                CombatEvent::StageStarted { stage, .. } => println!("Tick {}: stage {}", tick, stage),
                CombatEvent::BeamFired { .. } => beam_ticks += 1,
                _ => {}
            }
        }
        for died in world.resource_mut::<Events<EntityDied>>().drain() {
            deaths += 1;
            println!("Tick {}: {:?} died", tick, died.entity);
        }

        if tick % 100 == 0 {
            let scale = world.resource::<SlowMotionCoordinator>().time_scale();
            println!("Tick {}: time scale {:.2}", tick, scale);
        }
    }

    let world = app.world_mut();
    let survivors = world
        .query::<&Health>()
        .iter(world)
        .filter(|health| health.is_alive())
        .count();
    println!(
        "Duel complete: {} hits, {} beam ticks, {} deaths, {} actors alive",
        hits, beam_ticks, deaths, survivors
    );
}

/// Квадратная арена 16×16: стены по периметру, два зеркала за манекенами
fn build_arena(app: &mut App) {
    let mut arena = Arena::new();
    let h = 8.0;
    arena.add_wall(Vec2::new(-h, -h), Vec2::new(h, -h));
    arena.add_wall(Vec2::new(h, -h), Vec2::new(h, h));
    arena.add_wall(Vec2::new(h, h), Vec2::new(-h, h));
    arena.add_wall(Vec2::new(-h, h), Vec2::new(-h, -h));
    arena.add_mirror(Vec2::new(6.0, -3.0), Vec2::new(7.0, 0.0));
    arena.add_mirror(Vec2::new(7.0, 0.0), Vec2::new(6.0, 3.0));
    app.insert_resource(arena);
}

/// Скрипт игрока: комбо очередями, потом держим луч
fn drive_player(app: &mut App, player: Entity, tick: usize) {
    let Some(mut input) = app.world_mut().get_mut::<CombatInput>(player) else {
        return;
    };
    match tick {
        0..=400 => {
            input.attack_pressed = tick % 12 == 0;
            input.beam_held = false;
        }
        401..=700 => input.beam_held = true,
        _ => input.beam_held = false,
    }
}
