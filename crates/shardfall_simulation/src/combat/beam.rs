//! Reflecting beam + scatter cone.
//!
//! `BeamPathResolver`: чистая геометрия (bounce path, scatter rays).
//! `BeamEmitter`: mode machine оружия: Scatter → Collapsing → Beam.
//! Каждый volley/beam tick = отдельный invocation со своим HitRegistry scope.

use std::fmt;

use bevy::prelude::*;

use super::arc_sweep::HitReport;
use super::config::BeamConfig;
use super::events::CombatEvent;
use super::geometry::{reflect, rotate, safe_direction};
use super::hit_registry::HitRegistry;
use super::world::{CombatContext, RayHit, WorldQuery};
use crate::logger;

// ============================================================================
// Path resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamTermination {
    /// Non-reflective surface (wall, actor).
    Surface,
    /// Nothing hit within the remaining range.
    RangeExhausted,
    /// Reflective surface reached with no bounces left.
    BounceBudgetExhausted,
    /// Hit closer than the surface tolerance: no forward progress.
    Stalled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeamPath {
    /// Emitter → terminus. At most `max_bounces + 2` points.
    pub points: Vec<Vec2>,
    pub terminal_entity: Option<Entity>,
    pub terminal_reflective: bool,
    pub reflected: bool,
    pub bounces: u32,
    pub termination: BeamTermination,
}

impl BeamPath {
    pub fn end(&self) -> Vec2 {
        self.points.last().copied().unwrap_or(Vec2::ZERO)
    }

    /// Direction of the final segment.
    pub fn final_direction(&self) -> Vec2 {
        match self.points.as_slice() {
            [.., a, b] => safe_direction(*b - *a),
            _ => Vec2::X,
        }
    }

    pub fn length(&self) -> f32 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// One scatter ray (no bounces).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterRay {
    pub direction: Vec2,
    pub end: Vec2,
    pub hit: Option<RayHit>,
}

pub struct BeamPathResolver<'a> {
    config: &'a BeamConfig,
}

impl<'a> BeamPathResolver<'a> {
    pub fn new(config: &'a BeamConfig) -> Self {
        Self { config }
    }

    /// Offset after a bounce. Always clears the world's surface tolerance.
    pub fn effective_epsilon(&self, world: &dyn WorldQuery) -> f32 {
        self.config.epsilon.max(2.0 * world.surface_tolerance())
    }

    pub fn cast(&self, origin: Vec2, direction: Vec2, world: &dyn WorldQuery) -> BeamPath {
        let tolerance = world.surface_tolerance();
        let epsilon = self.effective_epsilon(world);

        let mut path = BeamPath {
            points: vec![origin],
            terminal_entity: None,
            terminal_reflective: false,
            reflected: false,
            bounces: 0,
            termination: BeamTermination::RangeExhausted,
        };
        let mut position = origin;
        let mut direction = safe_direction(direction);
        let mut remaining = self.config.max_range.max(0.0);

        for i in 0..=self.config.max_bounces {
            let Some(hit) = world.cast_ray(position, direction, remaining, self.config.mask)
            else {
                path.points.push(position + direction * remaining);
                path.termination = BeamTermination::RangeExhausted;
                break;
            };

            if hit.distance <= tolerance {
                path.termination = BeamTermination::Stalled;
                break;
            }

            path.points.push(hit.point);

            if hit.reflective && i < self.config.max_bounces {
                direction = reflect(direction, hit.normal);
                position = hit.point + direction * epsilon;
                remaining -= hit.distance + epsilon;
                path.bounces += 1;
                path.reflected = true;
                if remaining <= 0.0 {
                    path.termination = BeamTermination::RangeExhausted;
                    break;
                }
                continue;
            }

            path.terminal_entity = hit.entity;
            path.terminal_reflective = hit.reflective;
            path.termination = if hit.reflective {
                BeamTermination::BounceBudgetExhausted
            } else {
                BeamTermination::Surface
            };
            break;
        }

        path
    }

    /// `scatter_rays` rays spread evenly over `[-half, +half]`. One ray
    /// collapses to the centre.
    pub fn scatter(
        &self,
        origin: Vec2,
        direction: Vec2,
        half_angle: f32,
        world: &dyn WorldQuery,
    ) -> Vec<ScatterRay> {
        let direction = safe_direction(direction);
        let count = self.config.scatter_rays.max(1);
        let half_angle = half_angle.max(0.0);

        (0..count)
            .map(|i| {
                let angle = if count == 1 {
                    0.0
                } else {
                    -half_angle + 2.0 * half_angle * i as f32 / (count - 1) as f32
                };
                let ray_direction = rotate(direction, angle);
                let hit = world.cast_ray(origin, ray_direction, self.config.max_range, self.config.mask);
                ScatterRay {
                    direction: ray_direction,
                    end: hit
                        .map(|h| h.point)
                        .unwrap_or(origin + ray_direction * self.config.max_range),
                    hit,
                }
            })
            .collect()
    }
}

// ============================================================================
// Emitter mode machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum BeamMode {
    #[default]
    Scatter,
    Collapsing,
    Beam,
}

impl fmt::Display for BeamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamInput {
    pub origin: Vec2,
    pub aim: Vec2,
    pub held: bool,
}

/// Лучевое оружие combatant'а
#[derive(Component, Debug, Clone)]
pub struct BeamEmitter {
    pub owner: Entity,
    pub config: BeamConfig,
    mode: BeamMode,
    /// Текущий half-angle конуса (радианы).
    cone_half_angle: f32,
    volley_timer: f32,
    /// После отказа ресурса конус должен раскрыться полностью, прежде чем
    /// снова начнётся Collapsing (даже если кнопка зажата).
    recharging: bool,
    registry: HitRegistry,
    last_path: Option<BeamPath>,
}

impl BeamEmitter {
    pub fn new(owner: Entity, config: BeamConfig) -> Self {
        let cone_half_angle = config.scatter_half_angle_deg.to_radians();
        Self {
            owner,
            config,
            mode: BeamMode::Scatter,
            cone_half_angle,
            volley_timer: 0.0,
            recharging: false,
            registry: HitRegistry::new(),
            last_path: None,
        }
    }

    pub fn mode(&self) -> BeamMode {
        self.mode
    }

    pub fn cone_half_angle(&self) -> f32 {
        self.cone_half_angle
    }

    /// Path of the most recent beam tick.
    pub fn last_path(&self) -> Option<&BeamPath> {
        self.last_path.as_ref()
    }

    pub fn registry(&self) -> &HitRegistry {
        &self.registry
    }

    fn full_cone(&self) -> f32 {
        self.config.scatter_half_angle_deg.to_radians().max(0.0)
    }

    /// Advances one simulation tick.
    pub fn tick(&mut self, input: &BeamInput, dt: f32, ctx: &mut CombatContext<'_>) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let full = self.full_cone();

        if self.mode == BeamMode::Scatter {
            if !input.held || self.recharging {
                self.recover_cone(dt, full);
                return;
            }
            self.volley_timer = 0.0;
            self.set_mode(BeamMode::Collapsing, ctx.events);
        }

        if !input.held {
            self.set_mode(BeamMode::Scatter, ctx.events);
            return;
        }

        match self.mode {
            BeamMode::Collapsing => {
                self.volley_timer -= dt;
                if self.volley_timer <= 0.0 {
                    if !ctx.resource.try_spend(self.config.scatter_cost) {
                        logger::log(&format!("🔦 Beam: {:?} out of resource (volley)", self.owner));
                        self.starve(ctx.events);
                        return;
                    }
                    self.fire_volley(input, ctx);
                    self.volley_timer += self.config.scatter_interval;
                }

                let rate = full / self.config.collapse_duration.max(f32::EPSILON);
                self.cone_half_angle = (self.cone_half_angle - rate * dt).max(0.0);

                if self.cone_half_angle <= 0.0 {
                    self.set_mode(BeamMode::Beam, ctx.events);
                }
            }
            BeamMode::Beam => {
                if !ctx
                    .resource
                    .try_spend(self.config.beam_cost_per_second * dt)
                {
                    logger::log(&format!("🔦 Beam: {:?} out of resource (beam)", self.owner));
                    self.starve(ctx.events);
                    return;
                }
                self.fire_beam(input, dt, ctx);
            }
            BeamMode::Scatter => {}
        }
    }

    /// Forced teardown (death, despawn, weapon swap).
    pub fn cancel(&mut self, events: &mut Vec<CombatEvent>) {
        self.set_mode(BeamMode::Scatter, events);
        self.cone_half_angle = self.full_cone();
        self.recharging = false;
        self.registry.clear();
        self.volley_timer = 0.0;
        self.last_path = None;
    }

    /// `true` while the cone must reopen before the next charge-up.
    pub fn is_recharging(&self) -> bool {
        self.recharging
    }

    fn starve(&mut self, events: &mut Vec<CombatEvent>) {
        self.recharging = true;
        self.set_mode(BeamMode::Scatter, events);
    }

    /// Конус раскрывается обратно за `recovery_duration`.
    fn recover_cone(&mut self, dt: f32, full: f32) {
        let rate = full / self.config.recovery_duration.max(f32::EPSILON);
        self.cone_half_angle = (self.cone_half_angle + rate * dt).min(full);
        if self.cone_half_angle >= full {
            self.recharging = false;
        }
    }

    fn set_mode(&mut self, to: BeamMode, events: &mut Vec<CombatEvent>) {
        let from = self.mode;
        if from == to {
            return;
        }
        self.mode = to;
        if to != BeamMode::Beam {
            self.last_path = None;
        }
        logger::log(&format!("🔦 Beam: {:?} {} → {}", self.owner, from, to));
        events.push(CombatEvent::BeamModeChanged { from, to });
    }

    fn fire_volley(&mut self, input: &BeamInput, ctx: &mut CombatContext<'_>) {
        self.registry.begin_scope();
        let resolver = BeamPathResolver::new(&self.config);
        let rays = resolver.scatter(input.origin, input.aim, self.cone_half_angle, ctx.world);

        for ray in &rays {
            let Some(entity) = ray.hit.and_then(|hit| hit.entity) else {
                continue;
            };
            self.damage(entity, ray.end, ray.direction, self.config.scatter_damage, ctx);
        }

        ctx.events.push(CombatEvent::ScatterFired {
            origin: input.origin,
            half_angle: self.cone_half_angle,
            endpoints: rays.iter().map(|ray| ray.end).collect(),
        });
    }

    fn fire_beam(&mut self, input: &BeamInput, dt: f32, ctx: &mut CombatContext<'_>) {
        self.registry.begin_scope();
        let path = BeamPathResolver::new(&self.config).cast(input.origin, input.aim, ctx.world);

        if let Some(entity) = path.terminal_entity {
            let amount = self.config.beam_dps * dt;
            self.damage(entity, path.end(), path.final_direction(), amount, ctx);
        }

        ctx.events.push(CombatEvent::BeamFired {
            points: path.points.clone(),
            reflected: path.reflected,
        });
        self.last_path = Some(path);
    }

    fn damage(
        &mut self,
        entity: Entity,
        position: Vec2,
        direction: Vec2,
        amount: f32,
        ctx: &mut CombatContext<'_>,
    ) {
        if entity == self.owner || self.registry.contains(entity) {
            return;
        }
        let Some(target) = ctx.targets.damageable(entity) else {
            return;
        };
        if target.is_dead() {
            return;
        }

        self.registry.try_register(entity);
        target.take_damage(amount);
        ctx.events.push(CombatEvent::Hit(HitReport {
            target: entity,
            position,
            direction,
            damage: amount,
            impulse: Vec2::ZERO,
        }));
    }
}
