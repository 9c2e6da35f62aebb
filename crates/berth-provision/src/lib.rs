//! # berth-provision
//!
//! Ordered chain of provisioner stages applied to the engine-shaped
//! environment before its containers are launched.
//!
//! Each stage owns a narrow set of fields (labels, environment variables,
//! volumes, network settings) and is safe to apply twice.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod env_vars;
pub mod installer;
pub mod labels;
pub mod pipeline;
pub mod settings;
pub mod volumes;

pub use pipeline::{Provisioner, ProvisionerPipeline};
