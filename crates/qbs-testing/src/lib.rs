//! Testing infrastructure for qbs-session integration tests.
//!
//! This crate provides utilities for writing integration tests:
//! - `FakeBuildTool`: scripted in-memory build tool usable as a session launcher
//! - `fixtures`: canned packets, sample project data and the default script
//! - `TestWorld`: fluent setup for CLI tests

pub mod fake_tool;
pub mod fixtures;
pub mod world;

pub use fake_tool::{FakeBuildTool, Reply};
pub use world::{CliResult, TestWorld};
