//! # berth-compose
//!
//! Describes a workspace environment and computes how to launch it.
//!
//! Handles:
//! - **Environment**: the user-facing environment configuration (recipe and machines).
//! - **Model**: the engine-shaped environment the provisioners mutate.
//! - **Parser**: turning a recipe into the engine-shaped environment.
//! - **Graph**: dependency graph construction and validation.
//! - **Strategy**: weight-based startup order resolution.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod environment;
pub mod graph;
pub mod model;
pub mod parser;
pub mod strategy;
