//! Headless `WorldQuery`: круги (hurtbox'ы акторов) + отрезки (стены, зеркала).
//!
//! В игре world queries отвечает движок; Arena: reference реализация для
//! headless app, демо и тестов. Тела синхронизируются из ECS каждый fixed tick
//! (`sync_arena_bodies`), отрезки статичны.

use bevy::prelude::*;

use super::geometry::safe_direction;
use super::world::{CollisionMask, RayHit, WorldQuery};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaBody {
    pub entity: Entity,
    pub center: Vec2,
    pub radius: f32,
    pub layers: CollisionMask,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaSegment {
    pub a: Vec2,
    pub b: Vec2,
    pub reflective: bool,
    pub layers: CollisionMask,
    pub entity: Option<Entity>,
}

#[derive(Resource, Debug, Clone)]
pub struct Arena {
    bodies: Vec<ArenaBody>,
    segments: Vec<ArenaSegment>,
    surface_tolerance: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            bodies: Vec::new(),
            segments: Vec::new(),
            surface_tolerance: 1e-4,
        }
    }
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surface_tolerance(mut self, tolerance: f32) -> Self {
        self.surface_tolerance = tolerance.max(0.0);
        self
    }

    pub fn add_body(&mut self, entity: Entity, center: Vec2, radius: f32, layers: CollisionMask) {
        self.bodies.push(ArenaBody {
            entity,
            center,
            radius: radius.max(0.0),
            layers,
        });
    }

    /// Replaces all bodies (per-tick ECS sync).
    pub fn set_bodies(&mut self, bodies: impl IntoIterator<Item = ArenaBody>) {
        self.bodies.clear();
        self.bodies.extend(bodies);
    }

    pub fn add_wall(&mut self, a: Vec2, b: Vec2) {
        self.segments.push(ArenaSegment {
            a,
            b,
            reflective: false,
            layers: CollisionMask::TERRAIN,
            entity: None,
        });
    }

    pub fn add_mirror(&mut self, a: Vec2, b: Vec2) {
        self.segments.push(ArenaSegment {
            a,
            b,
            reflective: true,
            layers: CollisionMask::MIRROR,
            entity: None,
        });
    }

    pub fn add_segment(&mut self, segment: ArenaSegment) {
        self.segments.push(segment);
    }

    pub fn bodies(&self) -> &[ArenaBody] {
        &self.bodies
    }

    pub fn segments(&self) -> &[ArenaSegment] {
        &self.segments
    }

    fn cast_bodies(&self, origin: Vec2, direction: Vec2, mask: CollisionMask) -> Option<RayHit> {
        self.bodies
            .iter()
            .filter(|body| body.layers.intersects(mask))
            .filter_map(|body| {
                let to_origin = origin - body.center;
                let c = to_origin.length_squared() - body.radius * body.radius;
                // луч стартует внутри тела (например, стреляющий): не считаем
                if c < 0.0 {
                    return None;
                }
                let b = to_origin.dot(direction);
                let discriminant = b * b - c;
                if discriminant < 0.0 {
                    return None;
                }
                let t = -b - discriminant.sqrt();
                if t < 0.0 {
                    return None;
                }
                let point = origin + direction * t;
                Some(RayHit {
                    point,
                    normal: safe_direction(point - body.center),
                    distance: t,
                    entity: Some(body.entity),
                    reflective: false,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn cast_segments(&self, origin: Vec2, direction: Vec2, mask: CollisionMask) -> Option<RayHit> {
        self.segments
            .iter()
            .filter(|segment| segment.layers.intersects(mask))
            .filter_map(|segment| {
                let edge = segment.b - segment.a;
                let denom = direction.perp_dot(edge);
                if denom.abs() <= f32::EPSILON {
                    return None;
                }
                let to_a = segment.a - origin;
                let t = to_a.perp_dot(edge) / denom;
                let u = to_a.perp_dot(direction) / denom;
                if t < 0.0 || !(0.0..=1.0).contains(&u) {
                    return None;
                }

                let mut normal = safe_direction(edge.perp());
                if normal.dot(direction) > 0.0 {
                    normal = -normal;
                }
                Some(RayHit {
                    point: origin + direction * t,
                    normal,
                    distance: t,
                    entity: segment.entity,
                    reflective: segment.reflective,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl WorldQuery for Arena {
    fn overlap_area(&self, point: Vec2, radius: f32, mask: CollisionMask) -> Vec<Entity> {
        self.bodies
            .iter()
            .filter(|body| body.layers.intersects(mask))
            .filter(|body| body.center.distance(point) <= body.radius + radius)
            .map(|body| body.entity)
            .collect()
    }

    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<RayHit> {
        let direction = safe_direction(direction);
        let body = self.cast_bodies(origin, direction, mask);
        let segment = self.cast_segments(origin, direction, mask);

        let nearest = match (body, segment) {
            (Some(a), Some(b)) => Some(if a.distance <= b.distance { a } else { b }),
            (a, b) => a.or(b),
        };
        nearest.filter(|hit| hit.distance <= max_distance)
    }

    fn surface_tolerance(&self) -> f32 {
        self.surface_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_respects_mask_and_distance() {
        let mut arena = Arena::new();
        let enemy = Entity::from_raw(1);
        let player = Entity::from_raw(2);
        arena.add_body(enemy, Vec2::new(2.0, 0.0), 0.4, CollisionMask::ENEMY);
        arena.add_body(player, Vec2::new(2.0, 0.0), 0.4, CollisionMask::PLAYER);

        let found = arena.overlap_area(Vec2::new(1.5, 0.0), 0.2, CollisionMask::ENEMY);
        assert_eq!(found, vec![enemy]);
        assert!(arena
            .overlap_area(Vec2::new(0.0, 0.0), 0.2, CollisionMask::ACTORS)
            .is_empty());
    }

    #[test]
    fn test_ray_hits_wall_with_facing_normal() {
        let mut arena = Arena::new();
        arena.add_wall(Vec2::new(5.0, -2.0), Vec2::new(5.0, 2.0));

        let hit = arena
            .cast_ray(Vec2::ZERO, Vec2::X, 10.0, CollisionMask::ALL)
            .expect("wall hit");
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert!((hit.normal - Vec2::NEG_X).length() < 1e-5);
        assert!(!hit.reflective);

        assert!(arena
            .cast_ray(Vec2::ZERO, Vec2::X, 4.0, CollisionMask::ALL)
            .is_none());
    }

    #[test]
    fn test_ray_picks_nearest_and_skips_enclosing_body() {
        let mut arena = Arena::new();
        let shooter = Entity::from_raw(1);
        let target = Entity::from_raw(2);
        arena.add_body(shooter, Vec2::ZERO, 0.5, CollisionMask::PLAYER);
        arena.add_body(target, Vec2::new(3.0, 0.0), 0.5, CollisionMask::ENEMY);
        arena.add_mirror(Vec2::new(6.0, -1.0), Vec2::new(6.0, 1.0));

        let hit = arena
            .cast_ray(Vec2::ZERO, Vec2::X, 20.0, CollisionMask::ALL)
            .expect("body hit");
        assert_eq!(hit.entity, Some(target));
        assert!((hit.distance - 2.5).abs() < 1e-5);
    }
}
