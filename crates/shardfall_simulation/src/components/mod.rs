//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - actor: базовые характеристики (faction, health, stamina)
//! - combat: input snapshot, hurtbox, death marker

pub mod actor;
pub mod combat;

// Re-exports для удобного импорта
pub use actor::*;
pub use combat::*;
