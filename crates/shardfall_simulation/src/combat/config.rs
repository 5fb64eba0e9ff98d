//! Combat tuning tables.
//!
//! Defaults hold the reference values. All durations in seconds; angles in
//! degrees (converted at the use site). Combo window and input buffer are
//! real-time values, phase durations are simulation-time values.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::combo::AttackStage;
use super::world::CollisionMask;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must lie in [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("beam epsilon {epsilon} must exceed the world surface tolerance {tolerance}")]
    EpsilonBelowTolerance { epsilon: f32, tolerance: f32 },

    #[error("stage {stage}: cancel window {cancel_window}s exceeds recovery {recovery}s")]
    CancelWindowTooLong {
        stage: AttackStage,
        cancel_window: f32,
        recovery: f32,
    },

    #[error("stage {stage}: {field} must be positive (got {value})")]
    StageNonPositive {
        stage: AttackStage,
        field: &'static str,
        value: f32,
    },
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

// ============================================================================
// Arc sweep
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcSweepConfig {
    /// Radius of each overlap probe.
    pub hit_test_radius: f32,
    /// Lower bound of the radial step (`max(min, 0.6 × hit_test_radius)`).
    pub min_radial_step: f32,
    pub min_angular_step_deg: f32,
    pub max_angular_step_deg: f32,
    /// Simulation seconds between re-evaluations of one action.
    pub sweep_cooldown: f32,
    /// Half-width of the moving blade for swept (down/up) cleaves.
    pub blade_half_angle_deg: f32,
    pub mask: CollisionMask,
}

impl Default for ArcSweepConfig {
    fn default() -> Self {
        Self {
            hit_test_radius: 0.28,
            min_radial_step: 0.1,
            min_angular_step_deg: 2.0,
            max_angular_step_deg: 14.0,
            sweep_cooldown: 0.3,
            blade_half_angle_deg: 35.0,
            mask: CollisionMask::ACTORS,
        }
    }
}

impl ArcSweepConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("arc.hit_test_radius", self.hit_test_radius)?;
        positive("arc.min_radial_step", self.min_radial_step)?;
        positive("arc.min_angular_step_deg", self.min_angular_step_deg)?;
        in_range(
            "arc.max_angular_step_deg",
            self.max_angular_step_deg,
            self.min_angular_step_deg,
            90.0,
        )?;
        positive("arc.sweep_cooldown", self.sweep_cooldown)?;
        in_range("arc.blade_half_angle_deg", self.blade_half_angle_deg, 0.0, 180.0)
    }
}

// ============================================================================
// Combo stages
// ============================================================================

/// Направление "ведения" клинка во время active фазы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub enum SweepDirection {
    /// Весь клин сразу (stab)
    Static,
    /// Центр клина идёт от +half к −half
    Down,
    /// Центр клина идёт от −half к +half
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StrikeShape {
    Arc {
        half_angle_deg: f32,
        radius: f32,
        sweep: SweepDirection,
    },
    Thrust {
        distance: f32,
        width: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitStopProfile {
    pub factor: f32,
    /// Real-time seconds.
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProfile {
    pub windup: f32,
    pub active: f32,
    pub recovery: f32,
    /// Tail of recovery in which a buffered press starts the next stage at once.
    pub cancel_window: f32,
    pub cost: f32,
    pub damage_multiplier: f32,
    /// Active phase split into this many strikes, each with its own hit scope.
    pub strikes: u8,
    pub shape: StrikeShape,
    pub knockback: f32,
    /// Upward impulse for launcher stages.
    pub launch: f32,
    /// Root-motion distance requested across the active phase.
    pub advance_distance: f32,
    pub hit_stop: Option<HitStopProfile>,
}

impl StageProfile {
    fn down_cleave() -> Self {
        Self {
            windup: 0.12,
            active: 0.36,
            recovery: 0.3,
            cancel_window: 0.12,
            cost: 10.0,
            damage_multiplier: 1.0,
            strikes: 1,
            shape: StrikeShape::Arc {
                half_angle_deg: 135.0,
                radius: 4.2,
                sweep: SweepDirection::Down,
            },
            knockback: 2.0,
            launch: 0.0,
            advance_distance: 0.4,
            hit_stop: Some(HitStopProfile {
                factor: 0.2,
                duration: 0.06,
            }),
        }
    }

    fn up_cleave() -> Self {
        Self {
            windup: 0.1,
            active: 0.3,
            recovery: 0.3,
            cancel_window: 0.12,
            cost: 10.0,
            damage_multiplier: 1.1,
            strikes: 1,
            shape: StrikeShape::Arc {
                half_angle_deg: 120.0,
                radius: 3.8,
                sweep: SweepDirection::Up,
            },
            knockback: 1.0,
            launch: 6.0,
            advance_distance: 0.3,
            hit_stop: Some(HitStopProfile {
                factor: 0.2,
                duration: 0.06,
            }),
        }
    }

    fn triple_stab() -> Self {
        Self {
            windup: 0.08,
            active: 0.45,
            recovery: 0.28,
            cancel_window: 0.1,
            cost: 14.0,
            damage_multiplier: 0.6,
            strikes: 3,
            shape: StrikeShape::Arc {
                half_angle_deg: 15.0,
                radius: 3.4,
                sweep: SweepDirection::Static,
            },
            knockback: 0.8,
            launch: 0.0,
            advance_distance: 0.9,
            hit_stop: None,
        }
    }

    fn mega_thrust() -> Self {
        Self {
            windup: 0.22,
            active: 0.3,
            recovery: 0.45,
            cancel_window: 0.1,
            cost: 25.0,
            damage_multiplier: 2.2,
            strikes: 1,
            shape: StrikeShape::Thrust {
                distance: 5.0,
                width: 0.6,
            },
            knockback: 8.0,
            launch: 0.0,
            advance_distance: 3.0,
            hit_stop: Some(HitStopProfile {
                factor: 0.12,
                duration: 0.22,
            }),
        }
    }

    pub fn validate(&self, stage: AttackStage) -> Result<(), ConfigError> {
        let check = |field: &'static str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::StageNonPositive {
                    stage,
                    field,
                    value,
                })
            }
        };

        check("windup", self.windup)?;
        check("active", self.active)?;
        check("recovery", self.recovery)?;
        check("strikes", f32::from(self.strikes))?;
        if !(self.cancel_window >= 0.0 && self.cancel_window <= self.recovery) {
            return Err(ConfigError::CancelWindowTooLong {
                stage,
                cancel_window: self.cancel_window,
                recovery: self.recovery,
            });
        }
        match self.shape {
            StrikeShape::Arc { radius, .. } => check("radius", radius)?,
            StrikeShape::Thrust { distance, width } => {
                check("distance", distance)?;
                check("width", width)?;
            }
        }
        if let Some(hit_stop) = self.hit_stop {
            in_range("hit_stop.factor", hit_stop.factor, 0.0, 1.0)?;
            positive("hit_stop.duration", hit_stop.duration)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboConfig {
    /// Real seconds after a completed stage during which input advances the combo.
    pub combo_window: f32,
    /// Real seconds a press stays buffered.
    pub input_buffer: f32,
    pub base_damage: f32,
    pub arc: ArcSweepConfig,
    /// DownCleave, UpCleave, TripleStab, MegaThrust.
    pub stages: [StageProfile; 4],
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            combo_window: 0.6,
            input_buffer: 0.25,
            base_damage: 20.0,
            arc: ArcSweepConfig::default(),
            stages: [
                StageProfile::down_cleave(),
                StageProfile::up_cleave(),
                StageProfile::triple_stab(),
                StageProfile::mega_thrust(),
            ],
        }
    }
}

impl ComboConfig {
    /// Profile for a combat stage. `Idle` has none.
    pub fn profile(&self, stage: AttackStage) -> Option<&StageProfile> {
        match stage.ordinal() {
            0 => None,
            n => self.stages.get(usize::from(n) - 1),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("combo.combo_window", self.combo_window)?;
        positive("combo.input_buffer", self.input_buffer)?;
        positive("combo.base_damage", self.base_damage)?;
        self.arc.validate()?;
        for (index, profile) in self.stages.iter().enumerate() {
            profile.validate(AttackStage::from_ordinal(index as u8 + 1))?;
        }
        Ok(())
    }
}

// ============================================================================
// Beam
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamConfig {
    pub max_bounces: u32,
    pub max_range: f32,
    /// Offset along the reflected direction after a bounce.
    pub epsilon: f32,
    pub mask: CollisionMask,
    /// Rays per scatter volley.
    pub scatter_rays: u32,
    pub scatter_half_angle_deg: f32,
    /// Seconds for the cone to collapse from full to 0° while held.
    pub collapse_duration: f32,
    /// Seconds for the cone to reopen after the beam drops.
    pub recovery_duration: f32,
    pub scatter_interval: f32,
    pub scatter_cost: f32,
    pub scatter_damage: f32,
    pub beam_cost_per_second: f32,
    pub beam_dps: f32,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            max_bounces: 2,
            max_range: 30.0,
            epsilon: 0.01,
            mask: CollisionMask::TERRAIN | CollisionMask::MIRROR | CollisionMask::ACTORS,
            scatter_rays: 7,
            scatter_half_angle_deg: 30.0,
            collapse_duration: 0.6,
            recovery_duration: 0.4,
            scatter_interval: 0.15,
            scatter_cost: 4.0,
            scatter_damage: 3.0,
            beam_cost_per_second: 20.0,
            beam_dps: 60.0,
        }
    }
}

impl BeamConfig {
    pub fn validate(&self, surface_tolerance: f32) -> Result<(), ConfigError> {
        positive("beam.max_range", self.max_range)?;
        if !(self.epsilon.is_finite() && self.epsilon > surface_tolerance) {
            return Err(ConfigError::EpsilonBelowTolerance {
                epsilon: self.epsilon,
                tolerance: surface_tolerance,
            });
        }
        positive("beam.scatter_rays", self.scatter_rays as f32)?;
        in_range("beam.scatter_half_angle_deg", self.scatter_half_angle_deg, 0.0, 90.0)?;
        positive("beam.collapse_duration", self.collapse_duration)?;
        positive("beam.recovery_duration", self.recovery_duration)?;
        positive("beam.scatter_interval", self.scatter_interval)?;
        Ok(())
    }
}

// ============================================================================
// Soft lock / slow motion
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftLockConfig {
    pub search_radius: f32,
    /// Candidates outside this cone around the raw aim are ignored.
    pub max_cone_deg: f32,
    /// Maximum aim correction per tick.
    pub max_correction_deg: f32,
}

impl Default for SoftLockConfig {
    fn default() -> Self {
        Self {
            search_radius: 8.0,
            max_cone_deg: 35.0,
            max_correction_deg: 6.0,
        }
    }
}

impl SoftLockConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("soft_lock.search_radius", self.search_radius)?;
        in_range("soft_lock.max_cone_deg", self.max_cone_deg, 0.0, 180.0)?;
        in_range("soft_lock.max_correction_deg", self.max_correction_deg, 0.0, 180.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowMotionConfig {
    /// Lowest factor a request may apply.
    pub min_factor: f32,
    /// Upper bound on any request's real-time lifetime.
    pub max_duration: f32,
}

impl Default for SlowMotionConfig {
    fn default() -> Self {
        Self {
            min_factor: 0.05,
            max_duration: 1.5,
        }
    }
}

impl SlowMotionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        in_range("slow_motion.min_factor", self.min_factor, 0.001, 1.0)?;
        positive("slow_motion.max_duration", self.max_duration)
    }
}

/// Все combat таблицы (Bevy resource)
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    pub combo: ComboConfig,
    pub beam: BeamConfig,
    pub soft_lock: SoftLockConfig,
    pub slow_motion: SlowMotionConfig,
}

impl CombatConfig {
    pub fn validate(&self, surface_tolerance: f32) -> Result<(), ConfigError> {
        self.combo.validate()?;
        self.beam.validate(surface_tolerance)?;
        self.soft_lock.validate()?;
        self.slow_motion.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(CombatConfig::default().validate(1e-4), Ok(()));
    }

    #[test]
    fn test_profile_lookup() {
        let combo = ComboConfig::default();
        assert!(combo.profile(AttackStage::Idle).is_none());
        assert_eq!(combo.profile(AttackStage::TripleStab).map(|p| p.strikes), Some(3));
        assert!(matches!(
            combo.profile(AttackStage::MegaThrust).map(|p| p.shape),
            Some(StrikeShape::Thrust { .. })
        ));
    }

    #[test]
    fn test_epsilon_must_exceed_tolerance() {
        let beam = BeamConfig {
            epsilon: 1e-5,
            ..BeamConfig::default()
        };
        assert_eq!(
            beam.validate(1e-4),
            Err(ConfigError::EpsilonBelowTolerance {
                epsilon: 1e-5,
                tolerance: 1e-4
            })
        );
    }

    #[test]
    fn test_cancel_window_longer_than_recovery() {
        let mut combo = ComboConfig::default();
        combo.stages[1].cancel_window = 1.0;
        let err = combo.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::CancelWindowTooLong {
                stage: AttackStage::UpCleave,
                ..
            }
        ));
        assert!(err.to_string().contains("UpCleave"));
    }

    #[test]
    fn test_zero_hit_test_radius_rejected() {
        let arc = ArcSweepConfig {
            hit_test_radius: 0.0,
            ..ArcSweepConfig::default()
        };
        assert!(matches!(arc.validate(), Err(ConfigError::NonPositive { .. })));
    }
}
