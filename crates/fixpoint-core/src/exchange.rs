//! # Exchange Module
//!
//! Bidirectional links between relation attributes.
//!
//! A link `A.x <-> B.y` keeps `b ∈ a.x ⇔ a ∈ b.y` true at quiescence for
//! every `a: A` and `b: B`, subtypes included. The table only answers
//! "which slots mirror this one"; the [`Context`](crate::Context) schedules
//! the mirrored insertions.

use crate::schema::{RelationSlot, Schema};
use crate::TypeId;
use serde::Serialize;

/// An unordered pair of relation slots.
///
/// Stored normalized (`a <= b`) so that `A.x <-> B.y` and `B.y <-> A.x`
/// compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExchangeLink {
    a: RelationSlot,
    b: RelationSlot,
}

impl ExchangeLink {
    #[must_use]
    pub fn new(a: RelationSlot, b: RelationSlot) -> Self {
        if a <= b { Self { a, b } } else { Self { a: b, b: a } }
    }

    #[must_use]
    pub fn a(&self) -> RelationSlot {
        self.a
    }

    #[must_use]
    pub fn b(&self) -> RelationSlot {
        self.b
    }

    /// A slot linked to itself: a symmetric relation.
    #[must_use]
    pub fn is_reflexive(&self) -> bool {
        self.a == self.b
    }
}

/// Summary of a link, as reported to callers and in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInfo {
    pub description: String,
    pub reflexive: bool,
}

/// All links active in one context.
#[derive(Debug, Clone, Default)]
pub struct ExchangeTable {
    links: Vec<ExchangeLink>,
}

impl ExchangeTable {
    /// Table holding the links declared on a schema.
    #[must_use]
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            links: schema.links().to_vec(),
        }
    }

    /// Add a link. Returns `false` if it was already present.
    pub fn bind(&mut self, link: ExchangeLink) -> bool {
        if self.links.contains(&link) {
            return false;
        }
        self.links.push(link);
        true
    }

    #[must_use]
    pub fn links(&self) -> &[ExchangeLink] {
        &self.links
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Slots mirroring the relation at `position` on an entity of concrete type `ty`.
    ///
    /// A slot on a parent type applies to every subtype. A reflexive link
    /// yields its slot once.
    #[must_use]
    pub fn counterparts(&self, schema: &Schema, ty: TypeId, position: usize) -> Vec<RelationSlot> {
        let applies =
            |slot: RelationSlot| slot.position() == position && schema.is_subtype(ty, slot.owner());

        let mut found = Vec::new();
        for link in &self.links {
            if applies(link.a) {
                found.push(link.b);
            }
            if !link.is_reflexive() && applies(link.b) {
                found.push(link.a);
            }
        }
        found.sort();
        found.dedup();
        found
    }

    /// Describe every link for reporting.
    #[must_use]
    pub fn describe(&self, schema: &Schema) -> Vec<LinkInfo> {
        self.links
            .iter()
            .map(|link| LinkInfo {
                description: schema.describe_link(link),
                reflexive: link.is_reflexive(),
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaBuilder, slot};
    use crate::Kind;

    fn schema() -> Schema {
        let mut builder = SchemaBuilder::new();
        builder
            .entity("Person")
            .scalar("name", Kind::Str)
            .relation("parents", Kind::entity("Person"))
            .relation("children", Kind::entity("Person"))
            .relation("friends", Kind::entity("Person"));
        builder.entity("Dad").extends("Person");
        builder
            .bind_exchange(slot("Person", "parents"), slot("Person", "children"))
            .bind_exchange(slot("Person", "friends"), slot("Person", "friends"));
        builder.build().expect("schema")
    }

    #[test]
    fn link_is_normalized() {
        let schema = schema();
        let parents = schema.slot("Person", "parents").expect("parents");
        let children = schema.slot("Person", "children").expect("children");

        assert_eq!(
            ExchangeLink::new(parents, children),
            ExchangeLink::new(children, parents)
        );
    }

    #[test]
    fn counterparts_of_each_side() {
        let schema = schema();
        let table = ExchangeTable::from_schema(&schema);
        let person = schema.entity_type("Person").expect("person").id();
        let parents = schema.slot("Person", "parents").expect("parents");
        let children = schema.slot("Person", "children").expect("children");

        assert_eq!(
            table.counterparts(&schema, person, parents.position()),
            vec![children]
        );
        assert_eq!(
            table.counterparts(&schema, person, children.position()),
            vec![parents]
        );
    }

    #[test]
    fn reflexive_link_yields_single_counterpart() {
        let schema = schema();
        let table = ExchangeTable::from_schema(&schema);
        let person = schema.entity_type("Person").expect("person").id();
        let friends = schema.slot("Person", "friends").expect("friends");

        assert_eq!(
            table.counterparts(&schema, person, friends.position()),
            vec![friends]
        );
        assert!(table.links().iter().any(ExchangeLink::is_reflexive));
    }

    #[test]
    fn subtype_inherits_links() {
        let schema = schema();
        let table = ExchangeTable::from_schema(&schema);
        let dad = schema.entity_type("Dad").expect("dad").id();
        let parents = schema.slot("Person", "parents").expect("parents");
        let children = schema.slot("Person", "children").expect("children");

        assert_eq!(
            table.counterparts(&schema, dad, children.position()),
            vec![parents]
        );
    }

    #[test]
    fn bind_rejects_duplicates() {
        let schema = schema();
        let mut table = ExchangeTable::from_schema(&schema);
        let parents = schema.slot("Person", "parents").expect("parents");
        let children = schema.slot("Person", "children").expect("children");

        assert!(!table.bind(ExchangeLink::new(children, parents)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn describe_links() {
        let schema = schema();
        let table = ExchangeTable::from_schema(&schema);
        let info = table.describe(&schema);

        assert_eq!(info[0].description, "Person.parents <-> Person.children");
        assert!(!info[0].reflexive);
        assert!(info[1].reflexive);
    }
}
