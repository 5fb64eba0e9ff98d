//! Collaborator contracts for the combat core.
//!
//! The core never talks to a physics backend, a health component or a time
//! resource directly. Everything goes through these capabilities, wired at
//! composition time (ECS systems, headless arena, tests).

use std::collections::HashMap;
use std::ops::BitOr;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::events::CombatEvent;
use super::slow_motion::SlowMotionHandle;

/// Collision layer bitmask used by world queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    pub const NONE: Self = Self(0);
    pub const TERRAIN: Self = Self(1 << 0);
    pub const MIRROR: Self = Self(1 << 1);
    pub const PLAYER: Self = Self(1 << 2);
    pub const ENEMY: Self = Self(1 << 3);
    pub const ACTORS: Self = Self(Self::PLAYER.0 | Self::ENEMY.0);
    pub const ALL: Self = Self(u32::MAX);

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for CollisionMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Result of [`WorldQuery::cast_ray`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub point: Vec2,
    /// Unit normal facing against the ray.
    pub normal: Vec2,
    /// Distance travelled from the ray origin.
    pub distance: f32,
    /// Entity owning the surface, if any (static walls may have none).
    pub entity: Option<Entity>,
    pub reflective: bool,
}

/// Injected world geometry.
pub trait WorldQuery {
    /// Entities whose shapes overlap the circle `(point, radius)` on `mask` layers.
    fn overlap_area(&self, point: Vec2, radius: f32, mask: CollisionMask) -> Vec<Entity>;

    /// Nearest surface along `direction` within `max_distance`.
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<RayHit>;

    /// Distance under which the backend treats two points as touching.
    fn surface_tolerance(&self) -> f32 {
        1e-4
    }
}

/// Damage capability of a single entity.
pub trait Damageable {
    fn take_damage(&mut self, amount: f32);
    fn is_dead(&self) -> bool;
}

/// Lookup from entity identity to its damage capability.
pub trait DamageTargets {
    fn damageable(&mut self, entity: Entity) -> Option<&mut dyn Damageable>;
}

impl<D: Damageable> DamageTargets for HashMap<Entity, D> {
    fn damageable(&mut self, entity: Entity) -> Option<&mut dyn Damageable> {
        self.get_mut(&entity).map(|target| target as &mut dyn Damageable)
    }
}

impl<D: Damageable + Component<Mutability = bevy::ecs::component::Mutable>> DamageTargets
    for Query<'_, '_, &mut D>
{
    fn damageable(&mut self, entity: Entity) -> Option<&mut dyn Damageable> {
        self.get_mut(entity)
            .ok()
            .map(|target| target.into_inner() as &mut dyn Damageable)
    }
}

/// Resource collaborator (stamina, energy, ammo...).
///
/// Consulted before any stage or beam tick proceeds. A denial is an expected
/// outcome, not an error.
pub trait ResourceSource {
    fn try_spend(&mut self, amount: f32) -> bool;
}

/// Slow-motion capability handed to combat state machines.
pub trait SlowMotionSink {
    fn request_slow_motion(&mut self, factor: f32, duration: f32) -> SlowMotionHandle;

    /// Returns `false` when the request had already expired or was never issued.
    fn release_slow_motion(&mut self, handle: SlowMotionHandle) -> bool;
}

/// Everything a state machine needs for one tick.
pub struct CombatContext<'a> {
    pub world: &'a dyn WorldQuery,
    pub targets: &'a mut dyn DamageTargets,
    pub resource: &'a mut dyn ResourceSource,
    pub slow_motion: &'a mut dyn SlowMotionSink,
    /// Outbox for VFX/audio/movement collaborators.
    pub events: &'a mut Vec<CombatEvent>,
}
