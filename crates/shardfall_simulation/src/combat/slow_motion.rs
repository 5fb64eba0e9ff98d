//! Global time-scale coordination (hit-stop, bullet time).
//!
//! Один writer на весь мир. Owners голосуют через `SlowMotionHandle`;
//! применяется самый строгий (минимальный) фактор. Нормальная скорость
//! возвращается только когда живых запросов ровно ноль.

use bevy::prelude::*;

use super::config::SlowMotionConfig;
use super::world::SlowMotionSink;
use crate::logger;

/// Owner's claim on one slow-motion request.
///
/// Не `Clone`: release потребляет handle, поэтому двойной release
/// одного запроса невозможен на уровне типов.
#[must_use = "dropping a handle leaves the request to expire on its own"]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SlowMotionHandle {
    id: u64,
}

impl SlowMotionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Forges a handle from a raw id (mismatched-release tests only).
    #[cfg(test)]
    pub(crate) fn from_raw(id: u64) -> Self {
        Self { id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SlowMotionRequest {
    id: u64,
    factor: f32,
    /// Real-time seconds left.
    remaining: f32,
}

#[derive(Resource, Debug, Clone)]
pub struct SlowMotionCoordinator {
    config: SlowMotionConfig,
    time_scale: f32,
    normal_scale: f32,
    requests: Vec<SlowMotionRequest>,
    next_id: u64,
    restorations: u64,
    mismatched_releases: u64,
}

impl Default for SlowMotionCoordinator {
    fn default() -> Self {
        Self::new(SlowMotionConfig::default())
    }
}

impl SlowMotionCoordinator {
    pub fn new(config: SlowMotionConfig) -> Self {
        Self {
            config,
            time_scale: 1.0,
            normal_scale: 1.0,
            requests: Vec::new(),
            next_id: 1,
            restorations: 0,
            mismatched_releases: 0,
        }
    }

    pub fn config(&self) -> &SlowMotionConfig {
        &self.config
    }

    /// Registers a vote. Factor is clamped to `[min_factor, 1]`, duration to
    /// `(0, max_duration]` real seconds.
    pub fn acquire(&mut self, factor: f32, duration: f32) -> SlowMotionHandle {
        let factor = if factor.is_finite() {
            factor.clamp(self.config.min_factor, 1.0)
        } else {
            1.0
        };
        let duration = if duration.is_finite() && duration > 0.0 {
            duration.min(self.config.max_duration)
        } else {
            f32::EPSILON
        };

        if self.requests.is_empty() {
            // 0 → 1: текущая скорость становится точкой возврата
            self.normal_scale = self.time_scale;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.requests.push(SlowMotionRequest {
            id,
            factor,
            remaining: duration,
        });
        self.apply();

        logger::log(&format!(
            "⏱️ SlowMo: acquire #{} factor {:.2} for {:.3}s (outstanding {})",
            id,
            factor,
            duration,
            self.requests.len()
        ));

        SlowMotionHandle { id }
    }

    /// Releases a request early. `false` if it had already expired (benign)
    /// or was never issued by this coordinator (flagged).
    pub fn release(&mut self, handle: SlowMotionHandle) -> bool {
        if let Some(index) = self.requests.iter().position(|r| r.id == handle.id) {
            self.requests.swap_remove(index);
            self.apply();
            return true;
        }

        if handle.id == 0 || handle.id >= self.next_id {
            self.mismatched_releases += 1;
            logger::log_error(&format!(
                "⏱️ SlowMo: release of unknown handle #{} (mismatched {})",
                handle.id, self.mismatched_releases
            ));
        }
        false
    }

    /// Expires requests on the unscaled clock.
    pub fn tick(&mut self, real_delta: f32) {
        if self.requests.is_empty() || !(real_delta > 0.0) {
            return;
        }

        for request in &mut self.requests {
            request.remaining -= real_delta;
        }
        let before = self.requests.len();
        self.requests.retain(|r| r.remaining > 0.0);
        if self.requests.len() != before {
            self.apply();
        }
    }

    /// Drops every request and restores the normal scale.
    pub fn reset(&mut self) {
        if !self.requests.is_empty() {
            self.requests.clear();
            self.apply();
        }
    }

    /// External baseline change (pause menu, debug speed). While requests are
    /// live only the restore point moves.
    pub fn set_normal_scale(&mut self, scale: f32) {
        let scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
        self.normal_scale = scale;
        if self.requests.is_empty() {
            self.time_scale = scale;
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn normal_scale(&self) -> f32 {
        self.normal_scale
    }

    pub fn outstanding(&self) -> usize {
        self.requests.len()
    }

    pub fn is_active(&self) -> bool {
        !self.requests.is_empty()
    }

    /// How many 1 → 0 transitions restored the normal scale.
    pub fn restorations(&self) -> u64 {
        self.restorations
    }

    pub fn mismatched_releases(&self) -> u64 {
        self.mismatched_releases
    }

    fn apply(&mut self) {
        let strictest = self
            .requests
            .iter()
            .map(|r| r.factor)
            .min_by(f32::total_cmp);

        match strictest {
            Some(factor) => self.time_scale = factor,
            // вызывается только после удаления запросов → это переход 1 → 0
            None => {
                self.time_scale = self.normal_scale;
                self.restorations += 1;
                logger::log(&format!(
                    "⏱️ SlowMo: restored scale {:.2} (restorations {})",
                    self.normal_scale, self.restorations
                ));
            }
        }
    }
}

impl SlowMotionSink for SlowMotionCoordinator {
    fn request_slow_motion(&mut self, factor: f32, duration: f32) -> SlowMotionHandle {
        self.acquire(factor, duration)
    }

    fn release_slow_motion(&mut self, handle: SlowMotionHandle) -> bool {
        self.release(handle)
    }
}
