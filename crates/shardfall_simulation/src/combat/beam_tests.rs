//! Tests for BeamPathResolver and BeamEmitter.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bevy::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use crate::combat::arena::Arena;
    use crate::combat::beam::{BeamEmitter, BeamInput, BeamMode, BeamPathResolver, BeamTermination};
    use crate::combat::config::BeamConfig;
    use crate::combat::events::CombatEvent;
    use crate::combat::slow_motion::SlowMotionCoordinator;
    use crate::combat::world::{CollisionMask, CombatContext, WorldQuery};
    use crate::components::{Health, Stamina};

    /// mirror (y = x − 5) → mirror (x + y = 10) → стена x = −3
    fn corridor() -> Arena {
        let mut arena = Arena::new();
        arena.add_mirror(Vec2::new(4.0, -1.0), Vec2::new(6.0, 1.0));
        arena.add_mirror(Vec2::new(4.0, 6.0), Vec2::new(6.0, 4.0));
        arena.add_wall(Vec2::new(-3.0, 0.0), Vec2::new(-3.0, 10.0));
        arena
    }

    fn near(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_mirror_mirror_wall_path() {
        let config = BeamConfig::default();
        let arena = corridor();
        let path = BeamPathResolver::new(&config).cast(Vec2::ZERO, Vec2::X, &arena);

        assert_eq!(path.points.len(), 4);
        assert!(path.reflected);
        assert_eq!(path.bounces, 2);
        assert_eq!(path.termination, BeamTermination::Surface);
        assert!(near(path.points[1], Vec2::new(5.0, 0.0)));
        assert!(near(path.points[2], Vec2::new(5.0, 5.0)));
        assert!(near(path.points[3], Vec2::new(-3.0, 5.0)));
    }

    #[test]
    fn test_reflection_mirrors_angle_about_normal() {
        let config = BeamConfig::default();
        let arena = corridor();
        let incoming = Vec2::new(1.0, 0.1).normalize();
        let path = BeamPathResolver::new(&config).cast(Vec2::new(0.0, -0.5), incoming, &arena);
        assert!(path.points.len() >= 3);

        let d_in = (path.points[1] - path.points[0]).normalize();
        let d_out = (path.points[2] - path.points[1]).normalize();
        let normal = Vec2::new(-1.0, 1.0).normalize();

        assert!((d_out.length() - d_in.length()).abs() < 1e-4);
        assert!((d_in.dot(normal) + d_out.dot(normal)).abs() < 1e-3);
        // касательная компонента сохраняется
        assert!((d_in.perp_dot(normal) - d_out.perp_dot(normal)).abs() < 1e-3);
    }

    #[test]
    fn test_bounce_budget_between_parallel_mirrors() {
        let config = BeamConfig {
            max_bounces: 2,
            ..BeamConfig::default()
        };
        let mut arena = Arena::new();
        arena.add_mirror(Vec2::new(2.0, -50.0), Vec2::new(2.0, 50.0));
        arena.add_mirror(Vec2::new(-2.0, -50.0), Vec2::new(-2.0, 50.0));

        let path = BeamPathResolver::new(&config).cast(Vec2::ZERO, Vec2::new(1.0, 0.1), &arena);
        assert_eq!(path.points.len(), 4);
        assert_eq!(path.termination, BeamTermination::BounceBudgetExhausted);
        assert!(path.terminal_reflective);
    }

    #[test]
    fn test_random_layouts_respect_point_limit() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..200 {
            let mut arena = Arena::new();
            for _ in 0..rng.gen_range(1..8) {
                let a = Vec2::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0));
                let b = a + Vec2::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0));
                if rng.gen_bool(0.7) {
                    arena.add_mirror(a, b);
                } else {
                    arena.add_wall(a, b);
                }
            }
            let config = BeamConfig {
                max_bounces: rng.gen_range(0..5),
                ..BeamConfig::default()
            };
            let direction = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));

            let path = BeamPathResolver::new(&config).cast(Vec2::ZERO, direction, &arena);
            assert!(path.points.len() <= config.max_bounces as usize + 2);
            assert!(path.bounces <= config.max_bounces);
            assert!(path.length() <= config.max_range + 1e-3);
            assert!(path.points.iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn test_range_exhausted_in_open_space() {
        let config = BeamConfig::default();
        let path = BeamPathResolver::new(&config).cast(Vec2::ZERO, Vec2::ZERO, &Arena::new());

        assert_eq!(path.points.len(), 2);
        assert_eq!(path.termination, BeamTermination::RangeExhausted);
        assert!(near(path.end(), Vec2::new(config.max_range, 0.0)));
        assert!(!path.reflected);
    }

    #[test]
    fn test_stalls_against_touching_surface() {
        let config = BeamConfig::default();
        let mut arena = Arena::new();
        arena.add_wall(Vec2::new(0.00005, -1.0), Vec2::new(0.00005, 1.0));

        let path = BeamPathResolver::new(&config).cast(Vec2::ZERO, Vec2::X, &arena);
        assert_eq!(path.termination, BeamTermination::Stalled);
        assert_eq!(path.points.len(), 1);
    }

    #[test]
    fn test_epsilon_clears_world_tolerance() {
        let config = BeamConfig {
            epsilon: 0.001,
            ..BeamConfig::default()
        };
        let arena = Arena::new().with_surface_tolerance(0.01);
        let resolver = BeamPathResolver::new(&config);
        assert!(resolver.effective_epsilon(&arena) > arena.surface_tolerance());
    }

    #[test]
    fn test_scatter_spreads_evenly() {
        let config = BeamConfig::default();
        let resolver = BeamPathResolver::new(&config);
        let half = 30f32.to_radians();
        let rays = resolver.scatter(Vec2::ZERO, Vec2::X, half, &Arena::new());

        assert_eq!(rays.len(), 7);
        assert!(near(rays[3].direction, Vec2::X));
        assert!((rays[0].direction.to_angle() + half).abs() < 1e-4);
        assert!((rays[6].direction.to_angle() - half).abs() < 1e-4);

        let single = BeamConfig {
            scatter_rays: 1,
            ..BeamConfig::default()
        };
        let rays = BeamPathResolver::new(&single).scatter(Vec2::ZERO, Vec2::Y, half, &Arena::new());
        assert_eq!(rays.len(), 1);
        assert!(near(rays[0].direction, Vec2::Y));
    }

    // ========================================================================
    // Emitter
    // ========================================================================

    struct Rig {
        arena: Arena,
        targets: HashMap<Entity, Health>,
        stamina: Stamina,
        slow_motion: SlowMotionCoordinator,
        events: Vec<CombatEvent>,
    }

    impl Rig {
        fn new(stamina: f32) -> Self {
            let mut arena = Arena::new();
            let target = Entity::from_raw(1);
            arena.add_body(target, Vec2::new(6.0, 0.0), 0.5, CollisionMask::ENEMY);
            let mut targets = HashMap::new();
            targets.insert(target, Health::new(100.0));
            Self {
                arena,
                targets,
                stamina: Stamina::new(stamina).with_regen(0.0),
                slow_motion: SlowMotionCoordinator::default(),
                events: Vec::new(),
            }
        }

        fn tick(&mut self, emitter: &mut BeamEmitter, held: bool, dt: f32) {
            let input = BeamInput {
                origin: Vec2::ZERO,
                aim: Vec2::X,
                held,
            };
            let mut ctx = CombatContext {
                world: &self.arena,
                targets: &mut self.targets,
                resource: &mut self.stamina,
                slow_motion: &mut self.slow_motion,
                events: &mut self.events,
            };
            emitter.tick(&input, dt, &mut ctx);
        }

        fn mode_changes(&self) -> Vec<(BeamMode, BeamMode)> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    CombatEvent::BeamModeChanged { from, to } => Some((*from, *to)),
                    _ => None,
                })
                .collect()
        }
    }

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_hold_collapses_into_beam_and_release_returns() {
        let mut rig = Rig::new(1000.0);
        let mut emitter = BeamEmitter::new(Entity::from_raw(99), BeamConfig::default());

        rig.tick(&mut emitter, true, DT);
        assert_eq!(emitter.mode(), BeamMode::Collapsing);

        // 0.6 s collapse + запас
        for _ in 0..40 {
            rig.tick(&mut emitter, true, DT);
        }
        assert_eq!(emitter.mode(), BeamMode::Beam);
        assert_eq!(emitter.cone_half_angle(), 0.0);
        let path = emitter.last_path().expect("beam path");
        assert_eq!(path.terminal_entity, Some(Entity::from_raw(1)));

        rig.tick(&mut emitter, false, DT);
        assert_eq!(emitter.mode(), BeamMode::Scatter);
        assert_eq!(
            rig.mode_changes(),
            vec![
                (BeamMode::Scatter, BeamMode::Collapsing),
                (BeamMode::Collapsing, BeamMode::Beam),
                (BeamMode::Beam, BeamMode::Scatter),
            ]
        );

        // конус восстанавливается за recovery_duration
        for _ in 0..30 {
            rig.tick(&mut emitter, false, DT);
        }
        assert!((emitter.cone_half_angle() - 30f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn test_volleys_and_beam_damage_target() {
        let mut rig = Rig::new(1000.0);
        let mut emitter = BeamEmitter::new(Entity::from_raw(99), BeamConfig::default());

        for _ in 0..60 {
            rig.tick(&mut emitter, true, DT);
        }

        let volleys = rig
            .events
            .iter()
            .filter(|event| matches!(event, CombatEvent::ScatterFired { .. }))
            .count();
        assert!(volleys >= 3);
        let health = rig.targets[&Entity::from_raw(1)].current;
        assert!(health < 100.0);

        // каждый volley: отдельный scope: максимум одно попадание на volley
        let hits = rig
            .events
            .iter()
            .filter(|event| matches!(event, CombatEvent::Hit(_)))
            .count();
        let beams = rig
            .events
            .iter()
            .filter(|event| matches!(event, CombatEvent::BeamFired { .. }))
            .count();
        assert!(hits <= volleys + beams);
    }

    #[test]
    fn test_resource_denial_drops_to_scatter() {
        // хватает на 2 volley, потом отказ
        let mut rig = Rig::new(8.0);
        let mut emitter = BeamEmitter::new(Entity::from_raw(99), BeamConfig::default());

        for _ in 0..30 {
            rig.tick(&mut emitter, true, DT);
        }
        assert_ne!(emitter.mode(), BeamMode::Beam);
        assert!(rig
            .mode_changes()
            .contains(&(BeamMode::Collapsing, BeamMode::Scatter)));
    }

    #[test]
    fn test_cancel_resets_emitter() {
        let mut rig = Rig::new(1000.0);
        let mut emitter = BeamEmitter::new(Entity::from_raw(99), BeamConfig::default());
        for _ in 0..45 {
            rig.tick(&mut emitter, true, DT);
        }
        assert_eq!(emitter.mode(), BeamMode::Beam);

        emitter.cancel(&mut rig.events);
        assert_eq!(emitter.mode(), BeamMode::Scatter);
        assert!(emitter.registry().is_empty());
        assert!(emitter.last_path().is_none());
        assert!((emitter.cone_half_angle() - 30f32.to_radians()).abs() < 1e-6);

        // после отмены луч снова заряжается с полного конуса
        rig.tick(&mut emitter, true, DT);
        assert_eq!(emitter.mode(), BeamMode::Collapsing);
        assert!(emitter.cone_half_angle() > 29f32.to_radians());
    }

    #[test]
    fn test_starved_beam_recovers_cone_before_recharging() {
        let mut rig = Rig::new(1000.0);
        let mut emitter = BeamEmitter::new(Entity::from_raw(99), BeamConfig::default());
        for _ in 0..45 {
            rig.tick(&mut emitter, true, DT);
        }
        assert_eq!(emitter.mode(), BeamMode::Beam);

        rig.stamina.current = 0.0;
        rig.tick(&mut emitter, true, DT);
        assert_eq!(emitter.mode(), BeamMode::Scatter);
        assert!(emitter.is_recharging());

        // ресурс вернулся, кнопка всё ещё зажата
        rig.stamina.current = 1000.0;
        rig.tick(&mut emitter, true, DT);
        assert_eq!(emitter.mode(), BeamMode::Scatter);
        assert!(emitter.cone_half_angle() > 0.0);

        let mut scatter_ticks = 1;
        while emitter.mode() == BeamMode::Scatter && scatter_ticks < 100 {
            rig.tick(&mut emitter, true, DT);
            scatter_ticks += 1;
        }

        // recovery_duration 0.4 s ≈ 24 тика при 60 Hz
        assert!(scatter_ticks >= 24, "cone reopened in {} ticks", scatter_ticks);
        assert_eq!(emitter.mode(), BeamMode::Collapsing);
        assert!(!emitter.is_recharging());
        assert!(emitter.cone_half_angle() > 29f32.to_radians());
    }
}
