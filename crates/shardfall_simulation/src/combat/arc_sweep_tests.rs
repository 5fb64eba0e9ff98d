//! Tests for ArcSweepResolver.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::f32::consts::FRAC_PI_2;

    use bevy::prelude::*;

    use crate::combat::arc_sweep::{ArcSweepResolver, StrikeParams, Wedge, MIN_RADIUS};
    use crate::combat::arena::Arena;
    use crate::combat::config::{ArcSweepConfig, SweepDirection};
    use crate::combat::events::CombatEvent;
    use crate::combat::geometry::signed_angle;
    use crate::combat::hit_registry::HitRegistry;
    use crate::combat::slow_motion::SlowMotionCoordinator;
    use crate::combat::world::{CollisionMask, CombatContext};
    use crate::components::{Health, Stamina};

    const OWNER: u32 = 100;

    struct Fixture {
        arena: Arena,
        targets: HashMap<Entity, Health>,
        stamina: Stamina,
        slow_motion: SlowMotionCoordinator,
        events: Vec<CombatEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                arena: Arena::new(),
                targets: HashMap::new(),
                stamina: Stamina::new(100.0),
                slow_motion: SlowMotionCoordinator::default(),
                events: Vec::new(),
            }
        }

        fn dummy(&mut self, index: u32, position: Vec2) -> Entity {
            let entity = Entity::from_raw(index);
            self.arena
                .add_body(entity, position, 0.3, CollisionMask::ENEMY);
            self.targets.insert(entity, Health::new(100.0));
            entity
        }

        fn ctx(&mut self) -> CombatContext<'_> {
            CombatContext {
                world: &self.arena,
                targets: &mut self.targets,
                resource: &mut self.stamina,
                slow_motion: &mut self.slow_motion,
                events: &mut self.events,
            }
        }
    }

    fn strike(damage: f32) -> StrikeParams {
        StrikeParams {
            owner: Entity::from_raw(OWNER),
            damage,
            knockback: 2.0,
            launch: 0.0,
        }
    }

    #[test]
    fn test_wide_cleave_hits_target_once_over_active_phase() {
        // 135° half-angle, radius 4.2, probe 0.28, цель на 2.0 м
        let config = ArcSweepConfig::default();
        let resolver = ArcSweepResolver::new(&config);
        let mut fixture = Fixture::new();
        let target = fixture.dummy(1, Vec2::new(2.0, 0.0));

        let wedge = Wedge::new(Vec2::ZERO, Vec2::X, 135f32.to_radians(), 4.2);
        let mut registry = HitRegistry::new();
        registry.begin_scope();

        let dt = 1.0 / 60.0;
        let mut elapsed = 0.0;
        let mut next_sweep_at = 0.0;
        let mut evaluations = 0;
        let mut hits = 0;
        while elapsed < 0.36 {
            if elapsed >= next_sweep_at {
                evaluations += 1;
                next_sweep_at = elapsed + config.sweep_cooldown;
                let mut ctx = fixture.ctx();
                hits += resolver
                    .sweep(&wedge, &strike(20.0), &mut registry, &mut ctx)
                    .len();
            }
            elapsed += dt;
        }

        assert_eq!(hits, 1);
        assert!((1..=2).contains(&evaluations), "evaluations {}", evaluations);
        assert_eq!(fixture.targets[&target].current, 80.0);
    }

    #[test]
    fn test_dense_samples_never_double_damage() {
        let config = ArcSweepConfig {
            hit_test_radius: 0.5,
            ..ArcSweepConfig::default()
        };
        let resolver = ArcSweepResolver::new(&config);
        let mut fixture = Fixture::new();
        let a = fixture.dummy(1, Vec2::new(1.0, 0.2));
        let b = fixture.dummy(2, Vec2::new(2.5, -0.4));

        let wedge = Wedge::new(Vec2::ZERO, Vec2::X, FRAC_PI_2, 3.0);
        assert!(resolver.sample_points(&wedge).len() > 20);

        let mut registry = HitRegistry::new();
        registry.begin_scope();
        let mut ctx = fixture.ctx();
        let first = resolver.sweep(&wedge, &strike(10.0), &mut registry, &mut ctx);
        let second = resolver.sweep(&wedge, &strike(10.0), &mut registry, &mut ctx);

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(fixture.targets[&a].current, 90.0);
        assert_eq!(fixture.targets[&b].current, 90.0);
        let hit_events = fixture
            .events
            .iter()
            .filter(|event| matches!(event, CombatEvent::Hit(_)))
            .count();
        assert_eq!(hit_events, 2);
    }

    #[test]
    fn test_skips_owner_dead_and_untracked() {
        let config = ArcSweepConfig::default();
        let resolver = ArcSweepResolver::new(&config);
        let mut fixture = Fixture::new();

        let owner = Entity::from_raw(OWNER);
        fixture
            .arena
            .add_body(owner, Vec2::new(0.5, 0.0), 0.3, CollisionMask::PLAYER);
        let corpse = fixture.dummy(1, Vec2::new(1.0, 0.0));
        fixture.targets.insert(corpse, Health { current: 0.0, max: 100.0 });
        // тело без Health (декорация): не damageable
        fixture
            .arena
            .add_body(Entity::from_raw(2), Vec2::new(1.5, 0.0), 0.3, CollisionMask::ENEMY);

        let wedge = Wedge::new(Vec2::ZERO, Vec2::X, 0.5, 2.0);
        let mut registry = HitRegistry::new();
        registry.begin_scope();
        let mut ctx = fixture.ctx();
        let hits = resolver.sweep(&wedge, &strike(10.0), &mut registry, &mut ctx);

        assert!(hits.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_rim_and_edges_always_sampled() {
        let config = ArcSweepConfig::default();
        let resolver = ArcSweepResolver::new(&config);
        let wedge = Wedge::new(Vec2::ZERO, Vec2::X, 1.0, 4.2);
        let points = resolver.sample_points(&wedge);

        let max_r = points
            .iter()
            .map(|p| p.position.length())
            .fold(0.0f32, f32::max);
        assert!((max_r - 4.2).abs() < 1e-4);

        let angles: Vec<f32> = points
            .iter()
            .map(|p| signed_angle(Vec2::X, p.direction))
            .collect();
        let lowest = angles.iter().copied().fold(f32::MAX, f32::min);
        let highest = angles.iter().copied().fold(f32::MIN, f32::max);
        assert!((lowest + 1.0).abs() < 1e-4);
        assert!((highest - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_angular_step_clamped() {
        let config = ArcSweepConfig::default();
        let resolver = ArcSweepResolver::new(&config);

        assert!((resolver.angular_step(0.1) - 14f32.to_radians()).abs() < 1e-6);
        assert!((resolver.angular_step(100.0) - 2f32.to_radians()).abs() < 1e-6);
        assert!((resolver.radial_step() - 0.168).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_wedge_is_corrected() {
        let wedge = Wedge::new(Vec2::ONE, Vec2::ZERO, f32::NAN, 0.0);
        assert_eq!(wedge.direction, Vec2::X);
        assert_eq!(wedge.half_angle, 0.0);
        assert_eq!(wedge.radius, MIN_RADIUS);

        let config = ArcSweepConfig::default();
        let points = ArcSweepResolver::new(&config).sample_points(&wedge);
        assert_eq!(points.len(), 1);
        assert!(points.iter().all(|p| p.position.is_finite()));
    }

    #[test]
    fn test_down_sweep_covers_from_top() {
        let wedge = Wedge::new(Vec2::ZERO, Vec2::X, 135f32.to_radians(), 4.2);
        let blade = 35f32.to_radians();

        let start = wedge.swept(SweepDirection::Down, blade, 0.0);
        let start_high = signed_angle(Vec2::X, start.direction) + start.half_angle;
        assert!((start_high - 135f32.to_radians()).abs() < 1e-4);
        assert!((start.half_angle - blade * 0.5).abs() < 1e-4);

        let done = wedge.swept(SweepDirection::Down, blade, 1.0);
        assert!((done.half_angle - wedge.half_angle).abs() < 1e-4);
        assert!(signed_angle(Vec2::X, done.direction).abs() < 1e-4);

        let up = wedge.swept(SweepDirection::Up, blade, 0.0);
        let up_low = signed_angle(Vec2::X, up.direction) - up.half_angle;
        assert!((up_low + 135f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn test_thrust_line_with_launch() {
        let config = ArcSweepConfig::default();
        let resolver = ArcSweepResolver::new(&config);
        let mut fixture = Fixture::new();
        let near = fixture.dummy(1, Vec2::new(0.0, 3.0));
        fixture.dummy(2, Vec2::new(2.0, 3.0)); // мимо линии

        let params = StrikeParams {
            launch: 6.0,
            ..strike(44.0)
        };
        let mut registry = HitRegistry::new();
        registry.begin_scope();
        let mut ctx = fixture.ctx();
        let hits = resolver.thrust(
            Vec2::ZERO,
            Vec2::Y,
            5.0,
            0.6,
            &params,
            &mut registry,
            &mut ctx,
        );

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, near);
        // knockback вдоль Y + launch вверх
        assert!((hits[0].impulse - Vec2::new(0.0, 8.0)).length() < 1e-4);
    }
}
