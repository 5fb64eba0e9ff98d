//! Combo + beam drivers, teardown.
//!
//! Системы собирают `CombatContext` из ECS (Arena, Query<&mut Health>,
//! Stamina, SlowMotionCoordinator), тикают plain state machines и пересылают
//! их outbox как `CombatNotification`.

use bevy::prelude::*;

use super::time::real_step;
use crate::combat::arena::Arena;
use crate::combat::beam::{BeamEmitter, BeamInput};
use crate::combat::combo::{ComboInput, ComboStateMachine};
use crate::combat::events::{CombatEvent, CombatNotification};
use crate::combat::slow_motion::SlowMotionCoordinator;
use crate::combat::world::CombatContext;
use crate::components::{CombatInput, Dead, Health, Stamina};

fn forward(
    notifications: &mut EventWriter<CombatNotification>,
    source: Entity,
    events: Vec<CombatEvent>,
) {
    if events.is_empty() {
        return;
    }
    notifications.write_batch(
        events
            .into_iter()
            .map(|event| CombatNotification { source, event }),
    );
}

/// Система: combo input + phase progression
///
/// Attack edge читается из `CombatInput` и сбрасывается. Phase таймеры:
/// fixed (scaled) delta, combo window: real delta того же шага.
pub fn update_combos(
    mut combatants: Query<
        (Entity, &Transform, &mut CombatInput, &mut ComboStateMachine, &mut Stamina),
        Without<Dead>,
    >,
    mut healths: Query<&mut Health>,
    arena: Res<Arena>,
    mut slow_motion: ResMut<SlowMotionCoordinator>,
    time: Res<Time<Fixed>>,
    virtual_time: Res<Time<Virtual>>,
    mut notifications: EventWriter<CombatNotification>,
) {
    let sim_dt = time.delta_secs();
    let real_dt = real_step(sim_dt, &virtual_time);

    for (entity, transform, mut input, mut combo, mut stamina) in combatants.iter_mut() {
        if input.attack_pressed {
            combo.press_attack();
            input.attack_pressed = false;
        }

        let combo_input = ComboInput {
            origin: transform.translation.truncate(),
            aim: input.effective_aim(),
        };
        let mut events = Vec::new();
        let mut ctx = CombatContext {
            world: &*arena,
            targets: &mut healths,
            resource: &mut *stamina,
            slow_motion: &mut *slow_motion,
            events: &mut events,
        };
        combo.tick(&combo_input, sim_dt, real_dt, &mut ctx);

        forward(&mut notifications, entity, events);
    }
}

/// Система: beam emitter mode machine
pub fn update_beams(
    mut combatants: Query<
        (Entity, &Transform, &CombatInput, &mut BeamEmitter, &mut Stamina),
        Without<Dead>,
    >,
    mut healths: Query<&mut Health>,
    arena: Res<Arena>,
    mut slow_motion: ResMut<SlowMotionCoordinator>,
    time: Res<Time<Fixed>>,
    mut notifications: EventWriter<CombatNotification>,
) {
    let dt = time.delta_secs();

    for (entity, transform, input, mut emitter, mut stamina) in combatants.iter_mut() {
        let beam_input = BeamInput {
            origin: transform.translation.truncate(),
            aim: input.effective_aim(),
            held: input.beam_held,
        };
        let mut events = Vec::new();
        let mut ctx = CombatContext {
            world: &*arena,
            targets: &mut healths,
            resource: &mut *stamina,
            slow_motion: &mut *slow_motion,
            events: &mut events,
        };
        emitter.tick(&beam_input, dt, &mut ctx);

        forward(&mut notifications, entity, events);
    }
}

/// Система: teardown комбо/луча у только что умерших
///
/// Отпускает hit-stop handle, чистит hit scopes, дропает буфер.
pub fn teardown_dead_combatants(
    mut query: Query<
        (
            Entity,
            Option<&mut ComboStateMachine>,
            Option<&mut BeamEmitter>,
            Option<&mut CombatInput>,
        ),
        Added<Dead>,
    >,
    mut slow_motion: ResMut<SlowMotionCoordinator>,
    mut notifications: EventWriter<CombatNotification>,
) {
    for (entity, combo, emitter, input) in query.iter_mut() {
        let mut events = Vec::new();
        if let Some(mut combo) = combo {
            combo.cancel(&mut *slow_motion, &mut events);
        }
        if let Some(mut emitter) = emitter {
            emitter.cancel(&mut events);
        }
        if let Some(mut input) = input {
            input.attack_pressed = false;
            input.beam_held = false;
        }

        crate::logger::log(&format!("⚔️ ECS: combat teardown for dead {:?}", entity));
        forward(&mut notifications, entity, events);
    }
}

/// Observer: despawn / remove ComboStateMachine → release held state
pub fn release_combo_on_remove(
    trigger: Trigger<OnRemove, ComboStateMachine>,
    mut combos: Query<&mut ComboStateMachine>,
    mut slow_motion: ResMut<SlowMotionCoordinator>,
    mut notifications: EventWriter<CombatNotification>,
) {
    let entity = trigger.target();
    let Ok(mut combo) = combos.get_mut(entity) else {
        return;
    };

    let mut events = Vec::new();
    combo.cancel(&mut *slow_motion, &mut events);
    forward(&mut notifications, entity, events);
}

/// Observer: despawn / remove BeamEmitter
pub fn release_beam_on_remove(
    trigger: Trigger<OnRemove, BeamEmitter>,
    mut emitters: Query<&mut BeamEmitter>,
    mut notifications: EventWriter<CombatNotification>,
) {
    let entity = trigger.target();
    let Ok(mut emitter) = emitters.get_mut(entity) else {
        return;
    };

    let mut events = Vec::new();
    emitter.cancel(&mut events);
    forward(&mut notifications, entity, events);
}
