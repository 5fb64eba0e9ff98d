//! Melee wedge sampling.
//!
//! Клин (origin, direction, half_angle, radius) покрывается сеткой точек:
//! радиальный шаг + угловой шаг, зависящий от радиуса. В каждой точке:
//! overlap query. Все попадания фильтруются через `HitRegistry` текущего action.

use std::f32::consts::PI;

use bevy::prelude::*;

use super::config::{ArcSweepConfig, SweepDirection};
use super::events::CombatEvent;
use super::geometry::{rotate, safe_direction};
use super::hit_registry::HitRegistry;
use super::world::CombatContext;
use crate::logger;

/// Радиус ниже этого поднимается до него (вырожденный клин).
pub const MIN_RADIUS: f32 = 0.05;

/// Sanitized wedge. Angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wedge {
    pub origin: Vec2,
    pub direction: Vec2,
    pub half_angle: f32,
    pub radius: f32,
}

impl Wedge {
    pub fn new(origin: Vec2, direction: Vec2, half_angle: f32, radius: f32) -> Self {
        let half_angle = if half_angle.is_finite() {
            half_angle.clamp(0.0, PI)
        } else {
            0.0
        };
        let radius = if radius.is_finite() {
            radius.max(MIN_RADIUS)
        } else {
            MIN_RADIUS
        };

        Self {
            origin,
            direction: safe_direction(direction),
            half_angle,
            radius,
        }
    }

    /// Part of the wedge the blade has passed through at `progress` (0..=1)
    /// of the active phase. `Static` always returns the whole wedge.
    ///
    /// Down: blade centre travels +half → −half, Up: −half → +half.
    pub fn swept(&self, sweep: SweepDirection, blade_half_angle: f32, progress: f32) -> Self {
        let half = self.half_angle;
        let blade = blade_half_angle.clamp(0.0, half);
        let progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            1.0
        };

        let (low, high) = match sweep {
            SweepDirection::Static => return *self,
            SweepDirection::Down => {
                let centre = half - 2.0 * half * progress;
                ((centre - blade).max(-half), half)
            }
            SweepDirection::Up => {
                let centre = -half + 2.0 * half * progress;
                (-half, (centre + blade).min(half))
            }
        };

        Self {
            origin: self.origin,
            direction: rotate(self.direction, (low + high) * 0.5),
            half_angle: (high - low) * 0.5,
            radius: self.radius,
        }
    }
}

/// Who strikes and how hard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeParams {
    pub owner: Entity,
    pub damage: f32,
    pub knockback: f32,
    /// Вертикальный импульс (launcher стадии).
    pub launch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub position: Vec2,
    /// Unit direction from the wedge origin.
    pub direction: Vec2,
}

/// One applied hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitReport {
    pub target: Entity,
    /// Sample point that found the target.
    pub position: Vec2,
    pub direction: Vec2,
    pub damage: f32,
    /// Knockback for the movement layer (`+Y` carries launch).
    pub impulse: Vec2,
}

pub struct ArcSweepResolver<'a> {
    config: &'a ArcSweepConfig,
}

impl<'a> ArcSweepResolver<'a> {
    pub fn new(config: &'a ArcSweepConfig) -> Self {
        Self { config }
    }

    pub fn radial_step(&self) -> f32 {
        self.config
            .min_radial_step
            .max(0.6 * self.config.hit_test_radius)
    }

    /// Angular step at radius `r`: arc length ≈ probe radius, clamped.
    pub fn angular_step(&self, radius: f32) -> f32 {
        let min = self.config.min_angular_step_deg.to_radians();
        let max = self.config.max_angular_step_deg.to_radians().max(min);
        (self.config.hit_test_radius / radius.max(MIN_RADIUS)).clamp(min, max)
    }

    /// Sample grid over the wedge. The rim is always included and angles
    /// cover `[-half, +half]` inclusively.
    pub fn sample_points(&self, wedge: &Wedge) -> Vec<SamplePoint> {
        let mut points = Vec::new();
        for radius in radii(self.radial_step(), wedge.radius) {
            let step = self.angular_step(radius);
            let span = 2.0 * wedge.half_angle;
            let segments = (span / step).ceil().max(0.0) as usize;

            if segments == 0 {
                points.push(sample(wedge.origin, wedge.direction, radius));
                continue;
            }
            let delta = span / segments as f32;
            for i in 0..=segments {
                let angle = -wedge.half_angle + delta * i as f32;
                points.push(sample(wedge.origin, rotate(wedge.direction, angle), radius));
            }
        }
        points
    }

    /// Samples along a straight line (thrust).
    pub fn thrust_samples(&self, origin: Vec2, direction: Vec2, distance: f32) -> Vec<SamplePoint> {
        let direction = safe_direction(direction);
        radii(self.radial_step(), distance.max(MIN_RADIUS))
            .map(|d| sample(origin, direction, d))
            .collect()
    }

    /// Resolves one wedge evaluation. Returns hits applied by this call only.
    pub fn sweep(
        &self,
        wedge: &Wedge,
        strike: &StrikeParams,
        registry: &mut HitRegistry,
        ctx: &mut CombatContext<'_>,
    ) -> Vec<HitReport> {
        let samples = self.sample_points(wedge);
        self.resolve(&samples, self.config.hit_test_radius, strike, registry, ctx)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn thrust(
        &self,
        origin: Vec2,
        direction: Vec2,
        distance: f32,
        width: f32,
        strike: &StrikeParams,
        registry: &mut HitRegistry,
        ctx: &mut CombatContext<'_>,
    ) -> Vec<HitReport> {
        let samples = self.thrust_samples(origin, direction, distance);
        let probe = width.max(self.config.hit_test_radius);
        self.resolve(&samples, probe, strike, registry, ctx)
    }

    fn resolve(
        &self,
        samples: &[SamplePoint],
        probe_radius: f32,
        strike: &StrikeParams,
        registry: &mut HitRegistry,
        ctx: &mut CombatContext<'_>,
    ) -> Vec<HitReport> {
        let mut hits = Vec::new();

        for point in samples {
            for entity in ctx
                .world
                .overlap_area(point.position, probe_radius, self.config.mask)
            {
                if entity == strike.owner || registry.contains(entity) {
                    continue;
                }
                let Some(target) = ctx.targets.damageable(entity) else {
                    continue;
                };
                if target.is_dead() {
                    continue;
                }

                registry.try_register(entity);
                target.take_damage(strike.damage);

                let report = HitReport {
                    target: entity,
                    position: point.position,
                    direction: point.direction,
                    damage: strike.damage,
                    impulse: point.direction * strike.knockback + Vec2::Y * strike.launch,
                };
                logger::log(&format!(
                    "⚔️ Sweep: {:?} hit {:?} for {:.1}",
                    strike.owner, entity, strike.damage
                ));
                ctx.events.push(CombatEvent::Hit(report));
                hits.push(report);
            }
        }

        hits
    }
}

fn sample(origin: Vec2, direction: Vec2, radius: f32) -> SamplePoint {
    SamplePoint {
        position: origin + direction * radius,
        direction,
    }
}

/// `step, 2·step, ...` strictly below `limit`, then `limit` itself.
fn radii(step: f32, limit: f32) -> impl Iterator<Item = f32> {
    let inner = if step > 0.0 {
        ((limit / step).ceil() as usize).saturating_sub(1)
    } else {
        0
    };
    (1..=inner)
        .map(move |i| step * i as f32)
        .filter(move |r| *r < limit)
        .chain(std::iter::once(limit))
}
