//! PSEO Runtime
//!
//! Runs the agent pipeline for one landing page:
//! - Registry: resolves planned agent names to running agents
//! - Manager: message routing, task ids, message log, concurrent groups
//! - Orchestrator: the phase sequence and its error policy
//! - Assembler: merges agent outputs into the page record

pub mod registry;
pub mod manager;
pub mod assembler;
pub mod orchestrator;

pub use registry::*;
pub use manager::*;
pub use assembler::*;
pub use orchestrator::*;
