//! # fixpoint-core
//!
//! The convergent reactive entity-graph runtime for Fixpoint - THE LOGIC.
//!
//! Programs declare entity types (scalar attributes, relation attributes,
//! identity indexes, reactive handlers) and exchange links between relation
//! attributes. A [`Context`] then runs a root function and every task it
//! transitively schedules until nothing changes any more.
//!
//! ```text
//! SchemaBuilder --build--> Schema --Context::new--> Context --run--> RunReport
//! ```
//!
//! ## Architectural Constraints
//!
//! - Monotonic: scalars are fixed at construction, relations only grow
//! - Confluent: the final state does not depend on dispatch order
//! - Deterministic: BTreeMap/BTreeSet only, no floats, no randomness
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod context;
pub mod exchange;
pub mod identity;
pub mod primitives;
pub mod relation;
pub mod scheduler;
pub mod schema;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    EntityId, FixpointError, IndexKey, Kind, Record, SubscriptionId, TypeId, Value, ValueKind,
};

// =============================================================================
// RE-EXPORTS: Declarations
// =============================================================================

pub use schema::{
    EntityType, EntityTypeBuilder, HandlerDef, HandlerFn, Index, IndexFn, RelationDef,
    RelationSlot, ScalarDef, Schema, SchemaBuilder, SlotRef, slot,
};

// =============================================================================
// RE-EXPORTS: Runtime
// =============================================================================

pub use config::{DispatchOrder, RuntimeConfig};
pub use context::{CallbackFn, Context, Phase, Resolved, RunReport};
pub use exchange::{ExchangeLink, ExchangeTable, LinkInfo};
pub use identity::{IdentityRegistry, Probe};
pub use relation::{Cardinality, Insertion, Relation};
pub use scheduler::TaskFn;
