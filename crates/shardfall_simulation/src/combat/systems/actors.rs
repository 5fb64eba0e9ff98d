//! Actor upkeep: stamina, hurtbox → Arena sync, soft lock, deaths.

use bevy::prelude::*;

use crate::combat::arena::{Arena, ArenaBody};
use crate::combat::events::EntityDied;
use crate::combat::targeting::{TargetAcquisition, TargetCandidate};
use crate::components::{Actor, CombatInput, Dead, Health, Hurtbox, Stamina};

/// Система: regenerate stamina для всех живых entities
///
/// Работает в FixedUpdate (scaled время: во время hit-stop реген тоже замедлен).
pub fn regenerate_stamina(mut query: Query<&mut Stamina, Without<Dead>>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for mut stamina in query.iter_mut() {
        stamina.regenerate(delta);
    }
}

/// Система: hurtbox'ы живых акторов → `Arena` bodies
///
/// Мертвые убираются из world queries (по трупам не бьём и луч сквозь них идёт).
pub fn sync_arena_bodies(
    mut arena: ResMut<Arena>,
    query: Query<(Entity, &Transform, &Hurtbox), Without<Dead>>,
) {
    arena.set_bodies(query.iter().map(|(entity, transform, hurtbox)| ArenaBody {
        entity,
        center: transform.translation.truncate(),
        radius: hurtbox.radius,
        layers: hurtbox.layers,
    }));
}

/// Система: soft lock, пишет `CombatInput.assisted_aim` (raw aim не трогаем)
pub fn assist_aim(
    mut seekers: Query<
        (Entity, &Transform, &Actor, &mut TargetAcquisition, &mut CombatInput),
        Without<Dead>,
    >,
    candidates: Query<(Entity, &Transform, &Actor), (With<Hurtbox>, Without<Dead>)>,
) {
    for (entity, transform, actor, mut lock, mut input) in seekers.iter_mut() {
        let targets: Vec<TargetCandidate> = candidates
            .iter()
            .filter(|(other, _, other_actor)| {
                *other != entity && other_actor.faction_id != actor.faction_id
            })
            .map(|(other, other_transform, _)| TargetCandidate {
                entity: other,
                position: other_transform.translation.truncate(),
            })
            .collect();

        let origin = transform.translation.truncate();
        let raw = input.aim;
        input.assisted_aim = Some(lock.assist(origin, raw, &targets));
    }
}

/// Система: Health <= 0 → Dead + EntityDied
pub fn detect_deaths(
    mut commands: Commands,
    query: Query<(Entity, &Health), (Changed<Health>, Without<Dead>)>,
    mut died: EventWriter<EntityDied>,
) {
    for (entity, health) in query.iter() {
        if health.is_alive() {
            continue;
        }

        commands.entity(entity).insert(Dead);
        died.write(EntityDied { entity });
        crate::logger::log_info(&format!("💀 ECS: {:?} died", entity));
    }
}
