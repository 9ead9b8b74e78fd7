//! Recurrence rule engine for repeating service visits.
//!
//! This crate provides:
//! - Rule schema with frequency/anchor cadence definitions
//! - Pure occurrence generation over arbitrary time windows
//! - Team-calendar conflict checking with snapshot revisions
//! - Execution pointer tracking and lifecycle transitions
//! - A service façade over injected repository/calendar collaborators

pub mod audit_log;
pub mod conflict;
pub mod error;
pub mod generator;
pub mod lifecycle;
pub mod schema;
pub mod service;
pub mod tracker;
pub mod traits;
pub mod validation;
