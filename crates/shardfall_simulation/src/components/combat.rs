//! Combat компоненты (ECS-facing)
//!
//! Input collaborator пишет `CombatInput`, arena sync читает `Hurtbox`.

use bevy::prelude::*;

use crate::combat::world::CollisionMask;

/// Input snapshot для одного combatant (пишется input слоем каждый frame)
///
/// - `attack_pressed`: edge, сбрасывается после чтения `update_combos`
/// - `beam_held`: continuous, луч заряжается пока true
/// - `aim`: raw направление игрока, combat слой его не переписывает
/// - `assisted_aim`: результат soft lock за этот tick (`assist_aim`),
///   всегда считается заново от raw `aim`
#[derive(Component, Debug, Clone, Copy)]
pub struct CombatInput {
    pub attack_pressed: bool,
    pub beam_held: bool,
    pub aim: Vec2,
    pub assisted_aim: Option<Vec2>,
}

impl Default for CombatInput {
    fn default() -> Self {
        Self {
            attack_pressed: false,
            beam_held: false,
            aim: Vec2::X,
            assisted_aim: None,
        }
    }
}

impl CombatInput {
    pub fn aiming(aim: Vec2) -> Self {
        Self {
            aim,
            ..default()
        }
    }

    /// Направление для атак: soft lock, если он есть, иначе raw aim.
    pub fn effective_aim(&self) -> Vec2 {
        self.assisted_aim.unwrap_or(self.aim)
    }
}

/// Круглый hurtbox: синхронизируется в `Arena` каждый fixed tick
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Hurtbox {
    pub radius: f32,
    pub layers: CollisionMask,
}

impl Default for Hurtbox {
    fn default() -> Self {
        Self {
            radius: 0.4,
            layers: CollisionMask::ENEMY,
        }
    }
}

impl Hurtbox {
    pub fn player(radius: f32) -> Self {
        Self {
            radius,
            layers: CollisionMask::PLAYER,
        }
    }

    pub fn enemy(radius: f32) -> Self {
        Self {
            radius,
            layers: CollisionMask::ENEMY,
        }
    }
}

/// Компонент-маркер: entity мертв (Health <= 0)
///
/// Combatant с Dead теряет комбо/луч (`teardown_dead_combatants`),
/// hurtbox убирается из Arena. Деспавн не автоматический.
#[derive(Component, Debug)]
pub struct Dead;
