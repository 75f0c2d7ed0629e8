//! KDL topology files for Stacksmith.
//!
//! This crate handles parsing of:
//! - Topology definitions (stacksmith.kdl)
//! - Variable interpolation

pub mod error;
pub mod topology;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use topology::{
    OutputDefinition, ResourceDefinition, StackDefinition, TopologyConfig, ValueDefinition,
    load_topology, parse_topology,
};
pub use variables::{AppContext, VariableContext, VariableContextBuilder};
