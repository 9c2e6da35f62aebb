//! Container engine capability, label-based runtime registry, and the
//! orchestrator that launches provisioned environments in weight order.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod engine;
pub mod memory;
pub mod orchestrator;
pub mod registry;

pub use engine::{ContainerDescriptor, ContainerEngine, CreateContainer, EngineError};
pub use memory::InMemoryEngine;
pub use orchestrator::{Orchestrator, StartedRuntime};
pub use registry::RuntimeContainers;
