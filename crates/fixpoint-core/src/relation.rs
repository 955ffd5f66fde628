//! # Relation Module
//!
//! The append-only, deduplicating container behind every relation attribute.
//!
//! A `Relation` only stores state. Reactions to growth (subscription
//! callbacks, exchange propagation) are scheduled by the owning
//! [`Context`](crate::Context), which is the only place allowed to insert.

use crate::{EntityId, SubscriptionId, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How many elements a relation attribute may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cardinality {
    /// Unbounded bag.
    #[default]
    Many,
    /// Write-once slot: one element, re-adding it is a no-op.
    One,
}

/// Outcome of an insertion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// The element is new, reactions must be scheduled.
    Added,
    /// The element was already present. Nothing happens.
    Present,
    /// A single-valued relation already holds a different element.
    Conflict(Value),
}

/// Members of one (entity, attribute) pair.
///
/// - Membership never shrinks
/// - Insertion order is kept for iteration but carries no meaning
#[derive(Debug, Clone)]
pub struct Relation {
    element: ValueKind,
    cardinality: Cardinality,
    items: Vec<Value>,
    members: BTreeSet<Value>,
    subscribers: Vec<SubscriptionId>,
}

impl Relation {
    /// Create an empty relation.
    #[must_use]
    pub fn new(element: ValueKind, cardinality: Cardinality) -> Self {
        Self {
            element,
            cardinality,
            items: Vec::new(),
            members: BTreeSet::new(),
            subscribers: Vec::new(),
        }
    }

    /// Declared element kind.
    #[must_use]
    pub fn element(&self) -> ValueKind {
        self.element
    }

    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.members.contains(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    /// Entity elements in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.items.iter().filter_map(Value::as_entity)
    }

    /// Number of subscriptions registered on this relation.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn subscribers(&self) -> &[SubscriptionId] {
        &self.subscribers
    }

    pub(crate) fn subscribe(&mut self, subscription: SubscriptionId) {
        self.subscribers.push(subscription);
    }

    /// Insert an element. Kind checks are done by the caller.
    pub(crate) fn insert(&mut self, value: Value) -> Insertion {
        if self.members.contains(&value) {
            return Insertion::Present;
        }

        if self.cardinality == Cardinality::One {
            if let Some(existing) = self.items.first() {
                return Insertion::Conflict(existing.clone());
            }
        }

        self.members.insert(value.clone());
        self.items.push(value);
        Insertion::Added
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut relation = Relation::new(ValueKind::Str, Cardinality::Many);

        assert_eq!(relation.insert(Value::from("a")), Insertion::Added);
        assert_eq!(relation.insert(Value::from("a")), Insertion::Present);
        assert_eq!(relation.len(), 1);
    }

    #[test]
    fn iteration_keeps_insertion_order() {
        let mut relation = Relation::new(ValueKind::Int, Cardinality::Many);
        for i in [3, 1, 2, 1] {
            relation.insert(Value::from(i));
        }

        let items: Vec<_> = relation.iter().filter_map(Value::as_int).collect();
        assert_eq!(items, vec![3, 1, 2]);
    }

    #[test]
    fn single_rejects_second_element() {
        let mut relation = Relation::new(ValueKind::Str, Cardinality::One);

        assert_eq!(relation.insert(Value::from("alice")), Insertion::Added);
        assert_eq!(relation.insert(Value::from("alice")), Insertion::Present);
        assert_eq!(
            relation.insert(Value::from("bob")),
            Insertion::Conflict(Value::from("alice"))
        );
        assert_eq!(relation.len(), 1);
    }

    #[test]
    fn entities_filters_entity_values() {
        let mut relation = Relation::new(ValueKind::Entity(crate::TypeId(0)), Cardinality::Many);
        relation.insert(Value::Entity(EntityId(4)));
        relation.insert(Value::Entity(EntityId(2)));

        let ids: Vec<_> = relation.entities().collect();
        assert_eq!(ids, vec![EntityId(4), EntityId(2)]);
    }
}
