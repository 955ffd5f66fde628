//! # Core Type Definitions
//!
//! This module contains the value-level types shared by every part of the runtime:
//! - Identifiers (`EntityId`, `TypeId`, `SubscriptionId`)
//! - Scalar and relation element values (`Value`, `ValueKind`, `Kind`)
//! - Constructor input and identity keys (`Record`, `IndexKey`)
//! - Error types (`FixpointError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point values)
//! - Implement `Ord` so they can live in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Handle to a canonical entity instance inside a [`Context`](crate::Context).
///
/// Two handles are equal if and only if they denote the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an entity type inside a frozen [`Schema`](crate::Schema).
/// Assigned in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Identifier of a subscription registered on a relation during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub usize);

// =============================================================================
// VALUES
// =============================================================================

/// A scalar attribute value or a relation element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Reference to another entity of the same run.
    Entity(EntityId),
}

impl Value {
    /// Get the entity handle, if this value references an entity.
    #[must_use]
    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Entity(id) => write!(f, "{id}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<EntityId> for Value {
    fn from(value: EntityId) -> Self {
        Self::Entity(value)
    }
}

// =============================================================================
// KINDS
// =============================================================================

/// Declared kind of an attribute, as written in schema declarations.
///
/// Entity kinds refer to types by name because a type may reference
/// itself or a type declared later. Names are resolved when the schema
/// is frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    Str,
    Entity(String),
}

impl Kind {
    /// Entity kind referring to the type with the given name.
    #[must_use]
    pub fn entity(type_name: impl Into<String>) -> Self {
        Self::Entity(type_name.into())
    }
}

/// Resolved kind of an attribute in a frozen schema.
///
/// An entity value matches `Entity(t)` when its concrete type is `t`
/// or one of `t`'s subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Str,
    Entity(TypeId),
}

impl ValueKind {
    /// Check a value against a scalar kind. Entity kinds never match here,
    /// they need the owning context to look up the concrete type.
    #[must_use]
    pub fn matches_scalar(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_)) | (Self::Int, Value::Int(_)) | (Self::Str, Value::Str(_))
        )
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// Named scalar values passed to an entity constructor.
///
/// Uses BTreeMap for deterministic iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert a value, returning the previous one if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// INDEX KEY
// =============================================================================

/// Key produced by an index function. One key per identity dimension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexKey(pub Vec<Value>);

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{single}"),
            values => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<Vec<Value>> for IndexKey {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl From<Value> for IndexKey {
    fn from(value: Value) -> Self {
        Self(vec![value])
    }
}

impl From<&str> for IndexKey {
    fn from(value: &str) -> Self {
        Self(vec![Value::from(value)])
    }
}

impl From<String> for IndexKey {
    fn from(value: String) -> Self {
        Self(vec![Value::from(value)])
    }
}

impl From<i64> for IndexKey {
    fn from(value: i64) -> Self {
        Self(vec![Value::Int(value)])
    }
}

impl From<bool> for IndexKey {
    fn from(value: bool) -> Self {
        Self(vec![Value::Bool(value)])
    }
}

impl From<EntityId> for IndexKey {
    fn from(value: EntityId) -> Self {
        Self(vec![Value::Entity(value)])
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Fixpoint runtime.
///
/// - No silent failures
/// - Use `Result<T, FixpointError>` for fallible operations
/// - The runtime never panics; a failing task aborts the run and its
///   error is returned by [`Context::run`](crate::Context::run)
#[derive(Debug, Error)]
pub enum FixpointError {
    /// An index key matched an existing entity whose scalars differ,
    /// or a single-valued relation received a second element.
    #[error("Value set twice: {entity}.{attribute}: {existing} != {supplied}")]
    Consistency {
        entity: String,
        attribute: String,
        existing: Value,
        supplied: Value,
    },

    /// A value of the wrong kind was supplied for an attribute or relation.
    #[error("Type mismatch for {target}: expected {expected}, got {found}")]
    TypeMismatch {
        target: String,
        expected: String,
        found: String,
    },

    /// A declaration references something that does not exist or cannot be supported.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A constructor call did not provide a scalar without default.
    #[error("Missing attribute {attribute} for {type_name}")]
    MissingAttribute { type_name: String, attribute: String },

    /// A constructor call or relation access named an undeclared attribute.
    #[error("{type_name} doesn't have any attribute named {attribute}")]
    UnknownAttribute { type_name: String, attribute: String },

    /// The entity handle does not belong to this context.
    #[error("Entity not found: {0}")]
    UnknownEntity(EntityId),

    /// A mutation was attempted while no run is in progress.
    #[error("Context is not running, can not {0}")]
    ContextFrozen(String),

    /// `run` was called on a context that already ran. Call `reset` first.
    #[error("Context has already run, reset it before running again")]
    ContextAlreadyRun,

    /// The watchdog task limit was reached before quiescence.
    #[error("Run did not reach quiescence within {limit} tasks")]
    Diverged { limit: u64 },

    /// Runs of the same input under different dispatch orders ended in
    /// different final states.
    #[error("Final state depends on dispatch order: {count} entities differ")]
    NotConfluent { count: usize },

    /// An error raised by user code inside a task.
    #[error("Task failed: {0}")]
    Task(String),

    /// Invalid runtime configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl FixpointError {
    /// Shorthand for user code failing a task with a message.
    #[must_use]
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task(message.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================
