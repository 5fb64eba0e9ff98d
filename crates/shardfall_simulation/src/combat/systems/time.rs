//! Slow-motion → Time<Virtual>.
//!
//! Координатор тикает по real clock (hit-stop не должен замедлять сам себя),
//! затем переносит итоговый scale в `Time<Virtual>`. Больше никто
//! `relative_speed` не трогает.

use bevy::prelude::*;

use crate::combat::slow_motion::SlowMotionCoordinator;

/// Система: expire slow-motion requests (unscaled delta)
pub fn tick_slow_motion(mut coordinator: ResMut<SlowMotionCoordinator>, time: Res<Time<Real>>) {
    coordinator.tick(time.delta_secs());
}

/// Система: применить time scale к virtual clock
pub fn sync_virtual_time(
    coordinator: Res<SlowMotionCoordinator>,
    mut virtual_time: ResMut<Time<Virtual>>,
) {
    let scale = coordinator.time_scale();
    if (virtual_time.relative_speed() - scale).abs() > f32::EPSILON {
        virtual_time.set_relative_speed(scale);
        crate::logger::log(&format!("⏱️ ECS: virtual time scale → {:.2}", scale));
    }
}

/// Real-time length of one fixed step at the current virtual speed.
pub fn real_step(sim_dt: f32, virtual_time: &Time<Virtual>) -> f32 {
    let speed = virtual_time.relative_speed();
    if speed > 0.0 {
        sim_dt / speed
    } else {
        0.0
    }
}
