//! Reconfigure CLI library exports for integration testing.
//!
//! This module exposes the settings file, command implementations and report
//! printing used by the `reconfigure` binary.

pub mod commands;
pub mod config;
pub mod errors;
pub mod logging;
pub mod report;
