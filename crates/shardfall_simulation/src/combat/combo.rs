//! 4-stage melee combo.
//!
//! Idle → DownCleave → UpCleave → TripleStab → MegaThrust → Idle.
//!
//! Каждая стадия: Windup → Active → Recovery. Таймеры фаз идут по scaled
//! simulation времени; combo window и input buffer: по real времени
//! (hit-stop не должен съедать окно комбо).
//!
//! State machine: явное resumable состояние (`RunningStage`), которое
//! продвигается раз в tick. Лишнее время переносится в следующую фазу.

use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::arc_sweep::{ArcSweepResolver, StrikeParams, Wedge};
use super::config::{ComboConfig, StageProfile, StrikeShape, SweepDirection};
use super::events::CombatEvent;
use super::geometry::safe_direction;
use super::hit_registry::HitRegistry;
use super::slow_motion::SlowMotionHandle;
use super::world::{CombatContext, SlowMotionSink};
use crate::logger;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Reflect,
)]
pub enum AttackStage {
    #[default]
    Idle,
    DownCleave,
    UpCleave,
    TripleStab,
    MegaThrust,
}

impl AttackStage {
    pub const MAX_ORDINAL: u8 = 4;

    pub fn ordinal(self) -> u8 {
        match self {
            AttackStage::Idle => 0,
            AttackStage::DownCleave => 1,
            AttackStage::UpCleave => 2,
            AttackStage::TripleStab => 3,
            AttackStage::MegaThrust => 4,
        }
    }

    /// Ordinals above 4 saturate at `MegaThrust`.
    pub fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => AttackStage::Idle,
            1 => AttackStage::DownCleave,
            2 => AttackStage::UpCleave,
            3 => AttackStage::TripleStab,
            _ => AttackStage::MegaThrust,
        }
    }

    /// `min(ordinal + 1, 4)`.
    pub fn next(self) -> Self {
        Self::from_ordinal((self.ordinal() + 1).min(Self::MAX_ORDINAL))
    }
}

impl fmt::Display for AttackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum StagePhase {
    /// Телеграф: aim следует за input, попаданий нет
    Windup,
    /// Sweep/thrust + movement requests, aim зафиксирован
    Active,
    /// Восстановление (в конце: cancel window)
    Recovery,
}

/// One execution instance of a stage (or one TripleStab strike).
#[derive(Debug, Clone)]
pub struct AttackAction {
    pub id: u64,
    pub stage: AttackStage,
    pub origin: Vec2,
    pub aim: Vec2,
    pub shape: StrikeShape,
    pub damage_multiplier: f32,
    /// Simulation time at creation.
    pub started_at: f32,
    /// Strike index inside the active phase (TripleStab: 0..3).
    pub strike: u8,
    registry: HitRegistry,
    /// Active-phase time of the next allowed evaluation.
    next_sweep_at: f32,
    /// Blade progress at the last evaluation (swept cleaves).
    swept_progress: f32,
}

impl AttackAction {
    pub fn registry(&self) -> &HitRegistry {
        &self.registry
    }
}

#[derive(Debug, Clone)]
pub struct RunningStage {
    pub stage: AttackStage,
    pub phase: StagePhase,
    pub elapsed_in_phase: f32,
    pub action: AttackAction,
    hit_stop_used: bool,
}

/// Per-tick input for the machine (edge presses go through `press_attack`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComboInput {
    pub origin: Vec2,
    pub aim: Vec2,
}

/// Комбо-автомат одного combatant'а
#[derive(Component, Debug)]
pub struct ComboStateMachine {
    pub owner: Entity,
    pub config: ComboConfig,
    step: AttackStage,
    running: Option<RunningStage>,
    /// Real time of the last completed stage.
    last_completed_at: Option<f32>,
    /// Real time of the buffered press.
    buffered_at: Option<f32>,
    real_time: f32,
    sim_time: f32,
    hit_stop: Option<SlowMotionHandle>,
    next_action_id: u64,
    evaluations: u64,
}

impl ComboStateMachine {
    pub fn new(owner: Entity, config: ComboConfig) -> Self {
        Self {
            owner,
            config,
            step: AttackStage::Idle,
            running: None,
            last_completed_at: None,
            buffered_at: None,
            real_time: 0.0,
            sim_time: 0.0,
            hit_stop: None,
            next_action_id: 1,
            evaluations: 0,
        }
    }

    /// Last started stage (`Idle` after a finisher or teardown).
    pub fn step(&self) -> AttackStage {
        self.step
    }

    pub fn running(&self) -> Option<&RunningStage> {
        self.running.as_ref()
    }

    pub fn phase(&self) -> Option<StagePhase> {
        self.running.as_ref().map(|running| running.phase)
    }

    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    pub fn has_buffered_press(&self) -> bool {
        self.buffered_at.is_some()
    }

    /// Resolver evaluations performed so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn holds_hit_stop(&self) -> bool {
        self.hit_stop.is_some()
    }

    pub fn real_time(&self) -> f32 {
        self.real_time
    }

    /// Records an attack-pressed edge. A newer press refreshes the buffer.
    pub fn press_attack(&mut self) {
        self.buffered_at = Some(self.real_time);
    }

    /// Starts the next stage if the machine is free and the cost is paid.
    pub fn advance_combo(&mut self, origin: Vec2, aim: Vec2, ctx: &mut CombatContext<'_>) -> bool {
        if self.running.is_some() {
            return false;
        }

        let within_window = self
            .last_completed_at
            .is_some_and(|at| self.real_time - at <= self.config.combo_window);
        let next = if within_window {
            self.step.next()
        } else {
            AttackStage::DownCleave
        };
        let Some(profile) = self.config.profile(next) else {
            return false;
        };

        if !ctx.resource.try_spend(profile.cost) {
            logger::log(&format!(
                "⚔️ Combo: {:?} can't afford {} (cost {:.1})",
                self.owner, next, profile.cost
            ));
            return false;
        }

        let shape = profile.shape;
        let damage_multiplier = profile.damage_multiplier;
        let action = self.new_action(next, origin, aim, shape, damage_multiplier, 0);
        let action_id = action.id;

        self.step = next;
        self.buffered_at = None;
        self.running = Some(RunningStage {
            stage: next,
            phase: StagePhase::Windup,
            elapsed_in_phase: 0.0,
            action,
            hit_stop_used: false,
        });

        logger::log(&format!(
            "⚔️ Combo: {:?} → {} (action #{})",
            self.owner, next, action_id
        ));
        ctx.events.push(CombatEvent::StageStarted {
            stage: next,
            action_id,
        });
        ctx.events.push(CombatEvent::PhaseChanged {
            stage: next,
            phase: StagePhase::Windup,
        });
        true
    }

    /// Advances clocks, phases and strikes by one tick.
    pub fn tick(
        &mut self,
        input: &ComboInput,
        sim_dt: f32,
        real_dt: f32,
        ctx: &mut CombatContext<'_>,
    ) {
        let sim_dt = if sim_dt.is_finite() { sim_dt.max(0.0) } else { 0.0 };
        let real_dt = if real_dt.is_finite() { real_dt.max(0.0) } else { 0.0 };
        self.real_time += real_dt;
        self.sim_time += sim_dt;

        if let Some(pressed_at) = self.buffered_at {
            if self.real_time - pressed_at > self.config.input_buffer {
                self.buffered_at = None;
            }
        }

        let mut remaining = sim_dt;
        loop {
            if self.running.is_none() {
                if self.buffered_at.is_none() || !self.advance_combo(input.origin, input.aim, ctx) {
                    break;
                }
            }

            let Some(mut running) = self.running.take() else {
                break;
            };
            let Some(profile) = self.config.profile(running.stage).cloned() else {
                break;
            };

            let outcome = self.step_phase(&mut running, &profile, input, &mut remaining, ctx);
            match outcome {
                PhaseStep::Stay => {
                    self.running = Some(running);
                    break;
                }
                PhaseStep::Advanced => {
                    self.running = Some(running);
                }
                PhaseStep::Completed => {
                    self.complete_stage(running.stage, ctx.events);
                    // следующая стадия стартует только по buffered press
                    if self.buffered_at.is_none() {
                        break;
                    }
                }
            }
        }
    }

    /// Forced teardown: drops the running stage (and its hit scope), the
    /// buffered press and the held hit-stop.
    pub fn cancel(&mut self, slow_motion: &mut dyn SlowMotionSink, events: &mut Vec<CombatEvent>) {
        if let Some(running) = self.running.take() {
            logger::log(&format!(
                "⚔️ Combo: {:?} cancelled {} in {:?}",
                self.owner, running.stage, running.phase
            ));
            events.push(CombatEvent::StageEnded {
                stage: running.stage,
                completed: false,
            });
        }
        if let Some(handle) = self.hit_stop.take() {
            slow_motion.release_slow_motion(handle);
        }
        self.buffered_at = None;
        self.last_completed_at = None;
        self.step = AttackStage::Idle;
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn new_action(
        &mut self,
        stage: AttackStage,
        origin: Vec2,
        aim: Vec2,
        shape: StrikeShape,
        damage_multiplier: f32,
        strike: u8,
    ) -> AttackAction {
        let id = self.next_action_id;
        self.next_action_id += 1;

        let mut registry = HitRegistry::new();
        registry.begin_scope();

        AttackAction {
            id,
            stage,
            origin,
            aim: safe_direction(aim),
            shape,
            damage_multiplier,
            started_at: self.sim_time,
            strike,
            registry,
            next_sweep_at: 0.0,
            swept_progress: 0.0,
        }
    }

    fn step_phase(
        &mut self,
        running: &mut RunningStage,
        profile: &StageProfile,
        input: &ComboInput,
        remaining: &mut f32,
        ctx: &mut CombatContext<'_>,
    ) -> PhaseStep {
        let (duration, limit) = match running.phase {
            StagePhase::Windup => (profile.windup, profile.windup),
            StagePhase::Active => (profile.active, profile.active),
            StagePhase::Recovery if self.buffered_at.is_some() => {
                (profile.recovery, profile.recovery - profile.cancel_window)
            }
            StagePhase::Recovery => (profile.recovery, profile.recovery),
        };

        match running.phase {
            StagePhase::Windup => {
                running.action.origin = input.origin;
                running.action.aim = safe_direction(input.aim);
            }
            StagePhase::Active => {
                running.action.origin = input.origin;
                self.update_strike(running, profile, ctx);
            }
            StagePhase::Recovery => {}
        }

        let room = (limit - running.elapsed_in_phase).max(0.0);
        let reached = *remaining >= room;
        let step = if reached { room } else { *remaining };
        *remaining -= step;
        running.elapsed_in_phase = if reached {
            limit
        } else {
            running.elapsed_in_phase + step
        };

        if running.phase == StagePhase::Active && step > 0.0 && profile.advance_distance != 0.0 {
            let delta = running.action.aim * profile.advance_distance * (step / duration);
            ctx.events.push(CombatEvent::MovementRequested { delta });
        }

        if !reached {
            return PhaseStep::Stay;
        }

        match running.phase {
            StagePhase::Windup => {
                Self::enter_phase(running, StagePhase::Active, ctx.events);
                PhaseStep::Advanced
            }
            StagePhase::Active => {
                if let StrikeShape::Arc { sweep, .. } = profile.shape {
                    if sweep != SweepDirection::Static && running.action.swept_progress < 1.0 {
                        // клинок доходит до конца дуги
                        self.evaluate(running, profile, 1.0, ctx);
                    }
                }
                Self::enter_phase(running, StagePhase::Recovery, ctx.events);
                PhaseStep::Advanced
            }
            StagePhase::Recovery => {
                if limit < duration {
                    logger::log(&format!(
                        "⚔️ Combo: {:?} cancel window → next stage",
                        self.owner
                    ));
                }
                PhaseStep::Completed
            }
        }
    }

    fn enter_phase(running: &mut RunningStage, phase: StagePhase, events: &mut Vec<CombatEvent>) {
        running.phase = phase;
        running.elapsed_in_phase = 0.0;
        events.push(CombatEvent::PhaseChanged {
            stage: running.stage,
            phase,
        });
    }

    /// Strike slicing + cooldown-gated evaluation at the current active time.
    fn update_strike(
        &mut self,
        running: &mut RunningStage,
        profile: &StageProfile,
        ctx: &mut CombatContext<'_>,
    ) {
        let t = running.elapsed_in_phase;
        let strikes = profile.strikes.max(1);

        if strikes > 1 {
            let slice = profile.active / f32::from(strikes);
            let index = ((t / slice) as u8).min(strikes - 1);
            if index != running.action.strike {
                // новый укол = новый action со своим scope
                let origin = running.action.origin;
                let aim = running.action.aim;
                let mut action = self.new_action(
                    running.stage,
                    origin,
                    aim,
                    profile.shape,
                    profile.damage_multiplier,
                    index,
                );
                action.next_sweep_at = t;
                running.action = action;
            }
        }

        if t + f32::EPSILON >= running.action.next_sweep_at {
            running.action.next_sweep_at = t + self.config.arc.sweep_cooldown;
            let progress = (t / profile.active).clamp(0.0, 1.0);
            self.evaluate(running, profile, progress, ctx);
        }
    }

    fn evaluate(
        &mut self,
        running: &mut RunningStage,
        profile: &StageProfile,
        progress: f32,
        ctx: &mut CombatContext<'_>,
    ) {
        let strike = StrikeParams {
            owner: self.owner,
            damage: self.config.base_damage * running.action.damage_multiplier,
            knockback: profile.knockback,
            launch: profile.launch,
        };
        let resolver = ArcSweepResolver::new(&self.config.arc);
        let action = &mut running.action;

        let hits = match action.shape {
            StrikeShape::Arc {
                half_angle_deg,
                radius,
                sweep,
            } => {
                let wedge = Wedge::new(action.origin, action.aim, half_angle_deg.to_radians(), radius)
                    .swept(sweep, self.config.arc.blade_half_angle_deg.to_radians(), progress);
                resolver.sweep(&wedge, &strike, &mut action.registry, ctx)
            }
            StrikeShape::Thrust { distance, width } => resolver.thrust(
                action.origin,
                action.aim,
                distance,
                width,
                &strike,
                &mut action.registry,
                ctx,
            ),
        };
        action.swept_progress = progress;
        self.evaluations += 1;

        if hits.is_empty() || running.hit_stop_used {
            return;
        }
        if let Some(hit_stop) = profile.hit_stop {
            running.hit_stop_used = true;
            let handle = ctx
                .slow_motion
                .request_slow_motion(hit_stop.factor, hit_stop.duration);
            if let Some(previous) = self.hit_stop.replace(handle) {
                ctx.slow_motion.release_slow_motion(previous);
            }
            ctx.events.push(CombatEvent::HitStopRequested {
                factor: hit_stop.factor,
                duration: hit_stop.duration,
            });
        }
    }

    fn complete_stage(&mut self, stage: AttackStage, events: &mut Vec<CombatEvent>) {
        self.running = None;
        self.last_completed_at = Some(self.real_time);
        if stage == AttackStage::MegaThrust {
            // финишер всегда сбрасывает комбо
            self.step = AttackStage::Idle;
        }
        events.push(CombatEvent::StageEnded {
            stage,
            completed: true,
        });
    }
}

enum PhaseStep {
    /// Tick time used up inside the current phase.
    Stay,
    /// Moved to the next phase; leftover time carries over.
    Advanced,
    Completed,
}
