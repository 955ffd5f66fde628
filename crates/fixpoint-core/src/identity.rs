//! # Identity Module
//!
//! Maps `(type, index, key)` to the canonical entity holding that key.
//!
//! Keys are scoped to the concrete type of the entity that registered them:
//! an index inherited from a parent does not unify instances of two
//! different subtypes.

use crate::schema::EntityType;
use crate::{EntityId, IndexKey, Record, TypeId};
use std::collections::BTreeMap;

/// Result of probing the registry with a complete record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Some index key already belongs to this entity.
    Existing(EntityId),
    /// No key matched. Carries the keys to register, one per index.
    Vacant(Vec<IndexKey>),
}

/// Registry of index keys for one run.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    keys: BTreeMap<(TypeId, usize, IndexKey), EntityId>,
}

impl IdentityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity registered under a key, if any.
    #[must_use]
    pub fn lookup(&self, ty: TypeId, index: usize, key: &IndexKey) -> Option<EntityId> {
        self.keys.get(&(ty, index, key.clone())).copied()
    }

    /// Compute every key of a record and look them up in index order.
    ///
    /// The first hit wins. A record of a type without indexes is always vacant.
    #[must_use]
    pub fn probe(&self, ty: &EntityType, record: &Record) -> Probe {
        let keys: Vec<IndexKey> = ty.indices().iter().map(|index| index.key(record)).collect();

        for (position, key) in keys.iter().enumerate() {
            if let Some(entity) = self.lookup(ty.id(), position, key) {
                return Probe::Existing(entity);
            }
        }
        Probe::Vacant(keys)
    }

    /// Register all keys of a freshly created entity.
    pub fn register(&mut self, ty: TypeId, keys: Vec<IndexKey>, entity: EntityId) {
        for (position, key) in keys.into_iter().enumerate() {
            self.keys.insert((ty, position, key), entity);
        }
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::schema::{Index, SchemaBuilder};
    use crate::{Kind, Schema};

    fn schema() -> Schema {
        let mut builder = SchemaBuilder::new();
        builder
            .entity("Person")
            .scalar("name", Kind::Str)
            .scalar("email", Kind::Str)
            .index(Index::on("by_name", ["name"]))
            .index(Index::on("by_email", ["email"]));
        builder.entity("Dad").extends("Person");
        builder.entity("Note").scalar("text", Kind::Str);
        builder.build().expect("schema")
    }

    fn person(name: &str, email: &str) -> Record {
        Record::new().set("name", name).set("email", email)
    }

    #[test]
    fn vacant_then_existing() {
        let schema = schema();
        let ty = schema.entity_type("Person").expect("type");
        let mut registry = IdentityRegistry::new();

        let Probe::Vacant(keys) = registry.probe(ty, &person("bob", "bob@x")) else {
            panic!("expected vacant");
        };
        assert_eq!(keys.len(), 2);
        registry.register(ty.id(), keys, EntityId(0));

        assert_eq!(
            registry.probe(ty, &person("bob", "bob@x")),
            Probe::Existing(EntityId(0))
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn any_index_matches() {
        let schema = schema();
        let ty = schema.entity_type("Person").expect("type");
        let mut registry = IdentityRegistry::new();

        if let Probe::Vacant(keys) = registry.probe(ty, &person("bob", "bob@x")) {
            registry.register(ty.id(), keys, EntityId(7));
        }

        assert_eq!(
            registry.probe(ty, &person("robert", "bob@x")),
            Probe::Existing(EntityId(7))
        );
    }

    #[test]
    fn keys_are_scoped_by_concrete_type() {
        let schema = schema();
        let person_ty = schema.entity_type("Person").expect("person");
        let dad_ty = schema.entity_type("Dad").expect("dad");
        let mut registry = IdentityRegistry::new();

        if let Probe::Vacant(keys) = registry.probe(person_ty, &person("bob", "bob@x")) {
            registry.register(person_ty.id(), keys, EntityId(1));
        }

        assert!(matches!(
            registry.probe(dad_ty, &person("bob", "bob@x")),
            Probe::Vacant(_)
        ));
    }

    #[test]
    fn unindexed_type_is_always_vacant() {
        let schema = schema();
        let ty = schema.entity_type("Note").expect("note");
        let registry = IdentityRegistry::new();

        assert_eq!(
            registry.probe(ty, &Record::new().set("text", "hi")),
            Probe::Vacant(Vec::new())
        );
    }
}
