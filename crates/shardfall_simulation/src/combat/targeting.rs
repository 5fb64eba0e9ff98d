//! Soft lock: мягкое доведение прицела до ближайшей по углу цели.

use bevy::prelude::*;

use super::config::SoftLockConfig;
use super::geometry::{rotate_toward, safe_direction, signed_angle};

/// Потенциальная цель (собирается системой `assist_aim` из чужих фракций)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
    pub entity: Entity,
    pub position: Vec2,
}

/// Soft lock state одного combatant
#[derive(Component, Debug, Clone, Default)]
pub struct TargetAcquisition {
    pub config: SoftLockConfig,
    locked: Option<Entity>,
}

impl TargetAcquisition {
    pub fn new(config: SoftLockConfig) -> Self {
        Self {
            config,
            locked: None,
        }
    }

    /// Current lock, if the last `acquire` found one.
    pub fn locked(&self) -> Option<Entity> {
        self.locked
    }

    /// Picks the candidate with the smallest angular deviation from `aim`
    /// inside search radius and cone. Distance breaks ties.
    pub fn acquire(
        &mut self,
        origin: Vec2,
        aim: Vec2,
        candidates: &[TargetCandidate],
    ) -> Option<TargetCandidate> {
        let aim = safe_direction(aim);
        let max_cone = self.config.max_cone_deg.to_radians();
        let radius_sq = self.config.search_radius * self.config.search_radius;

        let best = candidates
            .iter()
            .filter_map(|candidate| {
                let offset = candidate.position - origin;
                let distance_sq = offset.length_squared();
                if !(distance_sq <= radius_sq) {
                    return None;
                }
                // цель в самой точке origin: направление не определено
                if distance_sq <= f32::EPSILON {
                    return None;
                }
                let deviation = signed_angle(aim, offset).abs();
                (deviation <= max_cone).then_some((deviation, distance_sq, *candidate))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)))
            .map(|(_, _, candidate)| candidate);

        self.locked = best.map(|candidate| candidate.entity);
        best
    }

    /// Rotates `aim` toward the acquired target by at most the per-tick
    /// correction. Without a target the raw aim is returned normalized.
    pub fn assist(&mut self, origin: Vec2, aim: Vec2, candidates: &[TargetCandidate]) -> Vec2 {
        match self.acquire(origin, aim, candidates) {
            Some(target) => rotate_toward(
                aim,
                target.position - origin,
                self.config.max_correction_deg.to_radians(),
            ),
            None => safe_direction(aim),
        }
    }

    pub fn clear(&mut self) {
        self.locked = None;
    }
}
