//! Combat systems (ECS drivers for the combat core)

pub mod actors;
pub mod attacks;
pub mod time;

// Re-export all systems
pub use actors::*;
pub use attacks::*;
pub use time::*;
