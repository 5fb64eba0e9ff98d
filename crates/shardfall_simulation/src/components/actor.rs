//! Базовые компоненты акторов: Actor, Health, Stamina
//!
//! Health: реализация `Damageable` capability,
//! Stamina: реализация `ResourceSource` (стоимость стадий комбо и тиков луча).

use bevy::prelude::*;

use crate::combat::world::{Damageable, ResourceSource};

/// Актор (игрок, враг, манекен): базовый компонент для живых существ
///
/// Автоматически добавляет Health, Stamina через Required Components.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
#[require(Health, Stamina)]
pub struct Actor {
    /// Stable ID фракции (soft lock выбирает только чужие фракции)
    pub faction_id: u64,
}

/// Здоровье актора
///
/// Инвариант: 0 ≤ current ≤ max. Урон дробный: луч наносит `dps × dt` за тик.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn take_damage(&mut self, amount: f32) {
        // NaN/отрицательный урон не лечит
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        self.current = (self.current - amount).max(0.0);
    }

    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount.max(0.0)).min(self.max);
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }
}

impl Damageable for Health {
    fn take_damage(&mut self, amount: f32) {
        Health::take_damage(self, amount);
    }

    fn is_dead(&self) -> bool {
        !self.is_alive()
    }
}

/// Выносливость: ресурс для стадий комбо и луча
///
/// Инвариант: 0.0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Stamina {
    pub current: f32,
    pub max: f32,
    pub regen_rate: f32, // units per second
}

impl Default for Stamina {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Stamina {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            regen_rate: 25.0,
        }
    }

    pub fn with_regen(mut self, regen_rate: f32) -> Self {
        self.regen_rate = regen_rate.max(0.0);
        self
    }

    pub fn can_afford(&self, cost: f32) -> bool {
        self.current >= cost
    }

    pub fn consume(&mut self, cost: f32) -> bool {
        let cost = cost.max(0.0);
        if self.can_afford(cost) {
            self.current -= cost;
            true
        } else {
            false
        }
    }

    pub fn regenerate(&mut self, delta_time: f32) {
        self.current = (self.current + self.regen_rate * delta_time).min(self.max);
    }
}

impl ResourceSource for Stamina {
    fn try_spend(&mut self, amount: f32) -> bool {
        self.consume(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage() {
        let mut health = Health::new(100.0);
        health.take_damage(30.0);
        assert_eq!(health.current, 70.0);
        assert!(health.is_alive());

        health.take_damage(100.0); // clamp к нулю
        assert_eq!(health.current, 0.0);
        assert!(Damageable::is_dead(&health));
    }

    #[test]
    fn test_health_ignores_negative_and_nan() {
        let mut health = Health::new(50.0);
        health.take_damage(-10.0);
        health.take_damage(f32::NAN);
        assert_eq!(health.current, 50.0);
    }

    #[test]
    fn test_health_heal() {
        let mut health = Health::new(100.0);
        health.take_damage(50.0);
        health.heal(30.0);
        assert_eq!(health.current, 80.0);

        health.heal(100.0); // Clamped to max
        assert_eq!(health.current, 100.0);
    }

    #[test]
    fn test_stamina_try_spend() {
        let mut stamina = Stamina::new(100.0);

        assert!(stamina.try_spend(30.0));
        assert_eq!(stamina.current, 70.0);

        assert!(!stamina.try_spend(80.0)); // Недостаточно
        assert_eq!(stamina.current, 70.0); // Не изменилась
    }

    #[test]
    fn test_stamina_regenerate() {
        let mut stamina = Stamina::new(100.0).with_regen(10.0);
        stamina.consume(50.0);

        stamina.regenerate(2.0); // 2 sec × 10 units/sec = +20
        assert_eq!(stamina.current, 70.0);

        stamina.regenerate(10.0); // Clamp to max
        assert_eq!(stamina.current, 100.0);
    }
}
