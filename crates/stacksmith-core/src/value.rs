//! Value expressions used by outputs and environment bindings.

use serde::{Deserialize, Serialize};

use crate::id::LogicalId;

/// A reference to a named output of another stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub stack: LogicalId,
    pub output: LogicalId,
}

impl OutputRef {
    pub fn new(stack: LogicalId, output: LogicalId) -> Self {
        Self { stack, output }
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.stack, self.output)
    }
}

/// A string-valued expression.
///
/// `Attribute` values are only known once the provider has created the
/// resource; they are carried through the manifest as-is. `Output` values
/// are replaced by the producer's value before the consuming stack is
/// registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    Literal { value: String },
    Attribute {
        stack: LogicalId,
        resource: LogicalId,
        attribute: String,
    },
    Output { reference: OutputRef },
}

impl Value {
    pub fn literal(value: impl Into<String>) -> Self {
        Value::Literal {
            value: value.into(),
        }
    }

    pub fn attribute(stack: LogicalId, resource: LogicalId, attribute: impl Into<String>) -> Self {
        Value::Attribute {
            stack,
            resource,
            attribute: attribute.into(),
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Value::Literal { value } => Some(value),
            _ => None,
        }
    }

    pub fn as_output_ref(&self) -> Option<&OutputRef> {
        match self {
            Value::Output { reference } => Some(reference),
            _ => None,
        }
    }

    /// True when the value no longer points at another stack.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Value::Output { .. })
    }
}

impl From<OutputRef> for Value {
    fn from(reference: OutputRef) -> Self {
        Value::Output { reference }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::literal(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Literal { value }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Literal { value } => write!(f, "{}", value),
            Value::Attribute {
                stack,
                resource,
                attribute,
            } => write!(f, "${{{}.{}.{}}}", stack, resource, attribute),
            Value::Output { reference } => write!(f, "${{{}}}", reference),
        }
    }
}
