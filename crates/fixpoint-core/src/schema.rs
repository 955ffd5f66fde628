//! # Schema Module
//!
//! Declaration-time registry of entity types, their indexes, their handlers
//! and the exchange links between their relation attributes.
//!
//! Declarations are collected by a [`SchemaBuilder`] and frozen into an
//! immutable [`Schema`] before any run starts. Freezing resolves type names,
//! flattens the inheritance chain of every type (ancestors first, then the
//! type's own declarations) and validates every link and index.
//!
//! Attribute positions are stable along the inheritance chain: an attribute
//! inherited from a parent sits at the same position in the child, so a
//! [`RelationSlot`] declared on a parent addresses the same relation on
//! every subtype.

use crate::context::Context;
use crate::exchange::ExchangeLink;
use crate::primitives::MAX_IDENTIFIER_LENGTH;
use crate::relation::Cardinality;
use crate::{FixpointError, IndexKey, Kind, Record, TypeId, Value, ValueKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A reactive handler, run once for every canonical entity of its type.
pub type HandlerFn = Arc<dyn Fn(&mut Context, crate::EntityId) -> Result<(), FixpointError> + Send + Sync>;

/// A pure function of an entity's scalars producing an identity key.
pub type IndexFn = Arc<dyn Fn(&Record) -> IndexKey + Send + Sync>;

// =============================================================================
// INDEX
// =============================================================================

/// One identity dimension of an entity type.
#[derive(Clone)]
pub struct Index {
    name: String,
    attributes: Vec<String>,
    key: IndexFn,
}

impl Index {
    /// Index on the values of the given scalar attributes, in order.
    #[must_use]
    pub fn on<I, S>(name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        let projected = attributes.clone();
        Self {
            name: name.into(),
            attributes,
            key: Arc::new(move |record: &Record| {
                IndexKey(
                    projected
                        .iter()
                        .filter_map(|attr| record.get(attr).cloned())
                        .collect(),
                )
            }),
        }
    }

    /// Index computed by an arbitrary pure function.
    ///
    /// `reads` lists the scalar attributes the function looks at; they are
    /// checked to exist when the schema is frozen.
    #[must_use]
    pub fn computed<I, S, F>(name: impl Into<String>, reads: I, key: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Record) -> IndexKey + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            attributes: reads.into_iter().map(Into::into).collect(),
            key: Arc::new(key),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Compute the key of a complete record.
    #[must_use]
    pub fn key(&self, record: &Record) -> IndexKey {
        (self.key)(record)
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .finish()
    }
}

// =============================================================================
// DECLARATIONS
// =============================================================================

/// Reference to a relation attribute by names, used in declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRef {
    pub type_name: String,
    pub attribute: String,
}

/// Shorthand for [`SlotRef`].
#[must_use]
pub fn slot(type_name: impl Into<String>, attribute: impl Into<String>) -> SlotRef {
    SlotRef {
        type_name: type_name.into(),
        attribute: attribute.into(),
    }
}

/// Declarations of one entity type, collected before freezing.
pub struct EntityTypeBuilder {
    name: String,
    parent: Option<String>,
    scalars: Vec<(String, Kind, Option<Value>)>,
    relations: Vec<(String, Kind, Cardinality)>,
    indices: Vec<Index>,
    handlers: Vec<(String, HandlerFn)>,
}

impl EntityTypeBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            scalars: Vec::new(),
            relations: Vec::new(),
            indices: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Make this type a subtype of `parent`.
    pub fn extends(&mut self, parent: impl Into<String>) -> &mut Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare a scalar attribute that every constructor call must supply.
    pub fn scalar(&mut self, name: impl Into<String>, kind: Kind) -> &mut Self {
        self.scalars.push((name.into(), kind, None));
        self
    }

    /// Declare a scalar attribute with a default value.
    pub fn scalar_or(
        &mut self,
        name: impl Into<String>,
        kind: Kind,
        default: impl Into<Value>,
    ) -> &mut Self {
        self.scalars.push((name.into(), kind, Some(default.into())));
        self
    }

    /// Declare a multi-valued relation attribute (a bag).
    pub fn relation(&mut self, name: impl Into<String>, element: Kind) -> &mut Self {
        self.relations.push((name.into(), element, Cardinality::Many));
        self
    }

    /// Declare a single-valued relation attribute.
    pub fn single(&mut self, name: impl Into<String>, element: Kind) -> &mut Self {
        self.relations.push((name.into(), element, Cardinality::One));
        self
    }

    /// Declare an identity index.
    pub fn index(&mut self, index: Index) -> &mut Self {
        self.indices.push(index);
        self
    }

    /// Register a handler run once per canonical entity of this type or
    /// any of its subtypes.
    pub fn handler<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&mut Context, crate::EntityId) -> Result<(), FixpointError> + Send + Sync + 'static,
    {
        self.handlers.push((name.into(), Arc::new(handler)));
        self
    }
}

/// Collects declarations and freezes them into a [`Schema`].
#[derive(Default)]
pub struct SchemaBuilder {
    types: Vec<EntityTypeBuilder>,
    links: Vec<(SlotRef, SlotRef)>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an entity type, or reopen it if already declared.
    ///
    /// Reopening is how handlers are attached to a type after its
    /// attributes were declared.
    pub fn entity(&mut self, name: &str) -> &mut EntityTypeBuilder {
        let position = match self.types.iter().position(|decl| decl.name == name) {
            Some(position) => position,
            None => {
                self.types.push(EntityTypeBuilder::new(name));
                self.types.len() - 1
            }
        };
        &mut self.types[position]
    }

    /// Bind two relation attributes so that `b ∈ a.x ⇔ a ∈ b.y`.
    ///
    /// Binding a slot to itself declares a symmetric relation.
    pub fn bind_exchange(&mut self, a: SlotRef, b: SlotRef) -> &mut Self {
        self.links.push((a, b));
        self
    }

    /// Validate and freeze all declarations.
    pub fn build(self) -> Result<Schema, FixpointError> {
        for decl in &self.types {
            check_identifier(&decl.name)?;
            let attributes = decl.scalars.iter().map(|(name, _, _)| name);
            let relations = decl.relations.iter().map(|(name, _, _)| name);
            let indices = decl.indices.iter().map(|index| &index.name);
            let handlers = decl.handlers.iter().map(|(name, _)| name);
            for name in attributes.chain(relations).chain(indices).chain(handlers) {
                check_identifier(name)?;
            }
        }

        let names: BTreeMap<String, TypeId> = self
            .types
            .iter()
            .enumerate()
            .map(|(i, decl)| (decl.name.clone(), TypeId(i as u32)))
            .collect();

        let resolve = |kind: &Kind| -> Result<ValueKind, FixpointError> {
            Ok(match kind {
                Kind::Bool => ValueKind::Bool,
                Kind::Int => ValueKind::Int,
                Kind::Str => ValueKind::Str,
                Kind::Entity(name) => ValueKind::Entity(*names.get(name).ok_or_else(|| {
                    FixpointError::Schema(format!("unknown entity type {name}"))
                })?),
            })
        };

        // Parents
        let mut parents = Vec::with_capacity(self.types.len());
        for decl in &self.types {
            let parent = match &decl.parent {
                None => None,
                Some(parent) => Some(*names.get(parent).ok_or_else(|| {
                    FixpointError::Schema(format!("{} extends unknown type {parent}", decl.name))
                })?),
            };
            parents.push(parent);
        }

        // Ancestry chains, the type itself first
        let mut chains: Vec<Vec<TypeId>> = Vec::with_capacity(self.types.len());
        for (i, decl) in self.types.iter().enumerate() {
            let mut chain = vec![TypeId(i as u32)];
            let mut current = parents[i];
            while let Some(parent) = current {
                if chain.contains(&parent) {
                    return Err(FixpointError::Schema(format!(
                        "inheritance cycle through {}",
                        decl.name
                    )));
                }
                chain.push(parent);
                current = parents[parent.0 as usize];
            }
            chains.push(chain);
        }

        // Flatten
        let mut types = Vec::with_capacity(self.types.len());
        for (i, decl) in self.types.iter().enumerate() {
            let mut used = BTreeSet::new();
            let mut scalars = Vec::new();
            let mut relations = Vec::new();
            let mut indices: Vec<Index> = Vec::new();
            let mut handlers = Vec::new();

            for &ancestor in chains[i].iter().rev() {
                let source = &self.types[ancestor.0 as usize];

                for (name, kind, default) in &source.scalars {
                    if !used.insert(name.clone()) {
                        return Err(duplicate_attribute(&decl.name, name));
                    }
                    let kind = resolve(kind)?;
                    if let Some(default) = default {
                        if !kind.matches_scalar(default) {
                            return Err(FixpointError::Schema(format!(
                                "default {default} of {}.{name} does not match its kind",
                                source.name
                            )));
                        }
                    }
                    scalars.push(ScalarDef {
                        name: name.clone(),
                        kind,
                        default: default.clone(),
                        declared_on: ancestor,
                    });
                }

                for (name, element, cardinality) in &source.relations {
                    if !used.insert(name.clone()) {
                        return Err(duplicate_attribute(&decl.name, name));
                    }
                    relations.push(RelationDef {
                        name: name.clone(),
                        element: resolve(element)?,
                        cardinality: *cardinality,
                        declared_on: ancestor,
                    });
                }

                for index in &source.indices {
                    if indices.iter().any(|known| known.name == index.name) {
                        return Err(FixpointError::Schema(format!(
                            "index {} declared twice on {}",
                            index.name, decl.name
                        )));
                    }
                    for attribute in &index.attributes {
                        if !scalars.iter().any(|s: &ScalarDef| &s.name == attribute) {
                            return Err(FixpointError::Schema(format!(
                                "index {} of {} reads unknown scalar {attribute}",
                                index.name, source.name
                            )));
                        }
                    }
                    indices.push(index.clone());
                }

                for (name, run) in &source.handlers {
                    handlers.push(HandlerDef {
                        name: name.clone(),
                        declared_on: ancestor,
                        run: Arc::clone(run),
                    });
                }
            }

            types.push(EntityType {
                id: TypeId(i as u32),
                name: decl.name.clone(),
                ancestry: chains[i].clone(),
                scalars,
                relations,
                indices,
                handlers,
            });
        }

        let mut schema = Schema {
            types,
            names,
            links: Vec::new(),
        };

        for (a, b) in &self.links {
            let a = schema.slot(&a.type_name, &a.attribute)?;
            let b = schema.slot(&b.type_name, &b.attribute)?;
            schema.validate_link(a, b)?;
            let link = ExchangeLink::new(a, b);
            if schema.links.contains(&link) {
                tracing::warn!(link = %schema.describe_link(&link), "exchange link declared twice");
                continue;
            }
            schema.links.push(link);
        }

        tracing::debug!(
            types = schema.types.len(),
            links = schema.links.len(),
            "schema frozen"
        );
        Ok(schema)
    }
}

fn check_identifier(name: &str) -> Result<(), FixpointError> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(FixpointError::Schema(format!(
            "invalid name {name:?}: must be 1 to {MAX_IDENTIFIER_LENGTH} bytes"
        )));
    }
    Ok(())
}

fn duplicate_attribute(type_name: &str, attribute: &str) -> FixpointError {
    FixpointError::Schema(format!("attribute {attribute} declared twice on {type_name}"))
}

// =============================================================================
// FROZEN SCHEMA
// =============================================================================

/// A scalar attribute of a frozen type.
#[derive(Debug, Clone)]
pub struct ScalarDef {
    pub name: String,
    pub kind: ValueKind,
    pub default: Option<Value>,
    pub declared_on: TypeId,
}

/// A relation attribute of a frozen type.
#[derive(Debug, Clone)]
pub struct RelationDef {
    pub name: String,
    pub element: ValueKind,
    pub cardinality: Cardinality,
    pub declared_on: TypeId,
}

/// A handler of a frozen type, inherited ones included.
#[derive(Clone)]
pub struct HandlerDef {
    pub name: String,
    pub declared_on: TypeId,
    pub run: HandlerFn,
}

impl fmt::Debug for HandlerDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDef")
            .field("name", &self.name)
            .field("declared_on", &self.declared_on)
            .finish()
    }
}

/// A frozen entity type with its inheritance chain flattened.
#[derive(Debug, Clone)]
pub struct EntityType {
    id: TypeId,
    name: String,
    ancestry: Vec<TypeId>,
    scalars: Vec<ScalarDef>,
    relations: Vec<RelationDef>,
    indices: Vec<Index>,
    handlers: Vec<HandlerDef>,
}

impl EntityType {
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type itself followed by its ancestors, nearest first.
    #[must_use]
    pub fn ancestry(&self) -> &[TypeId] {
        &self.ancestry
    }

    #[must_use]
    pub fn scalars(&self) -> &[ScalarDef] {
        &self.scalars
    }

    #[must_use]
    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// Indexes, inherited ones first.
    #[must_use]
    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    /// Handlers in dispatch order: root ancestor's first, own last.
    #[must_use]
    pub fn handlers(&self) -> &[HandlerDef] {
        &self.handlers
    }

    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&ScalarDef> {
        self.scalars.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn relation_position(&self, name: &str) -> Option<usize> {
        self.relations.iter().position(|r| r.name == name)
    }

    #[must_use]
    pub fn index_position(&self, name: &str) -> Option<usize> {
        self.indices.iter().position(|i| i.name == name)
    }
}

/// Typed descriptor of a relation attribute on a stated owner type.
///
/// Only a [`Schema`] hands these out, so a slot always addresses an
/// existing relation attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationSlot {
    owner: TypeId,
    position: usize,
}

impl RelationSlot {
    /// The type the slot was stated on.
    #[must_use]
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    /// Position of the attribute in the owner's (and its subtypes') relation list.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Immutable registry of entity types and exchange links.
#[derive(Debug)]
pub struct Schema {
    types: Vec<EntityType>,
    names: BTreeMap<String, TypeId>,
    links: Vec<ExchangeLink>,
}

impl Schema {
    /// Look up a type by name.
    pub fn entity_type(&self, name: &str) -> Result<&EntityType, FixpointError> {
        self.names
            .get(name)
            .and_then(|id| self.types.get(id.0 as usize))
            .ok_or_else(|| FixpointError::Schema(format!("unknown entity type {name}")))
    }

    /// Look up a type by id.
    pub fn type_by_id(&self, id: TypeId) -> Result<&EntityType, FixpointError> {
        self.types
            .get(id.0 as usize)
            .ok_or_else(|| FixpointError::Schema(format!("unknown entity type id {}", id.0)))
    }

    /// All types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &EntityType> {
        self.types.iter()
    }

    /// Exchange links declared on the schema.
    #[must_use]
    pub fn links(&self) -> &[ExchangeLink] {
        &self.links
    }

    /// Whether `ty` is `of` or one of its subtypes.
    #[must_use]
    pub fn is_subtype(&self, ty: TypeId, of: TypeId) -> bool {
        self.types
            .get(ty.0 as usize)
            .is_some_and(|t| t.ancestry.contains(&of))
    }

    /// Whether every value of kind `inner` is also a value of kind `outer`.
    #[must_use]
    pub fn kind_within(&self, inner: ValueKind, outer: ValueKind) -> bool {
        match (inner, outer) {
            (ValueKind::Entity(a), ValueKind::Entity(b)) => self.is_subtype(a, b),
            (a, b) => a == b,
        }
    }

    /// Human readable name of a kind.
    #[must_use]
    pub fn kind_name(&self, kind: ValueKind) -> String {
        match kind {
            ValueKind::Bool => "bool".to_string(),
            ValueKind::Int => "int".to_string(),
            ValueKind::Str => "str".to_string(),
            ValueKind::Entity(id) => self
                .types
                .get(id.0 as usize)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| format!("type#{}", id.0)),
        }
    }

    /// Resolve a relation attribute on a type into a slot descriptor.
    pub fn slot(&self, type_name: &str, attribute: &str) -> Result<RelationSlot, FixpointError> {
        let ty = self.entity_type(type_name)?;
        let position = ty.relation_position(attribute).ok_or_else(|| {
            FixpointError::Schema(format!(
                "{type_name} has no relation attribute named {attribute}"
            ))
        })?;
        Ok(RelationSlot {
            owner: ty.id,
            position,
        })
    }

    /// Definition of the relation a slot points to.
    pub fn relation_def(&self, slot: RelationSlot) -> Result<&RelationDef, FixpointError> {
        self.type_by_id(slot.owner)?
            .relations
            .get(slot.position)
            .ok_or_else(|| FixpointError::Schema(format!("invalid relation slot {slot:?}")))
    }

    /// Render a link as `A.x <-> B.y`.
    #[must_use]
    pub fn describe_link(&self, link: &ExchangeLink) -> String {
        format!(
            "{} <-> {}",
            self.describe_slot(link.a()),
            self.describe_slot(link.b())
        )
    }

    fn describe_slot(&self, slot: RelationSlot) -> String {
        match self.relation_def(slot) {
            Ok(def) => format!("{}.{}", self.kind_name(ValueKind::Entity(slot.owner)), def.name),
            Err(_) => format!("{slot:?}"),
        }
    }

    /// Check that two slots can be exchanged.
    ///
    /// `A.x` must hold exactly `B` entities and `B.y` exactly `A` entities:
    /// every element of `a.x` then owns a `y` relation able to hold `a`,
    /// and the other way around.
    pub fn validate_link(&self, a: RelationSlot, b: RelationSlot) -> Result<(), FixpointError> {
        let def_a = self.relation_def(a)?;
        let def_b = self.relation_def(b)?;

        for (slot, def, expected) in [(a, def_a, b.owner), (b, def_b, a.owner)] {
            if def.element != ValueKind::Entity(expected) {
                return Err(FixpointError::Schema(format!(
                    "can not exchange {} with {}: {} holds {}, expected {}",
                    self.describe_slot(a),
                    self.describe_slot(b),
                    self.describe_slot(slot),
                    self.kind_name(def.element),
                    self.kind_name(ValueKind::Entity(expected)),
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
