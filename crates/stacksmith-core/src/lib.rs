//! Core resource, stack and topology types for Stacksmith.
//!
//! This crate contains:
//! - Logical identifiers and error types
//! - Resource declarations (functions, databases, rules, secrets, networks)
//! - Stacks, their outputs and cross-stack references
//! - The application root and its dependency-ordered topology
//! - The synthesized manifest
//! - The deployer trait

pub mod app;
pub mod deployer;
pub mod error;
pub mod graph;
pub mod id;
pub mod manifest;
pub mod resource;
pub mod stack;
pub mod value;

pub use app::{App, Topology};
pub use error::{Error, Result};
pub use id::{LogicalId, RunId};
pub use manifest::Manifest;
pub use stack::{Stack, StackFactory, StackHandle, StackScope, StackStatus, stack_fn};
pub use value::{OutputRef, Value};
