//! This module aggregates various utility submodules used throughout the application.

/// Environment driven configuration of the music feature.
pub mod config;
/// Utilities for interacting with the application's SQLite database.
pub mod database;
