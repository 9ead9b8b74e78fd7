pub mod appointment;
pub mod config;
pub mod entity;

pub use appointment::*;
pub use config::{Config, PlannerConfig, StorageConfig};
pub use entity::*;
