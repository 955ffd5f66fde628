//! # Context Module
//!
//! One run of the runtime: the entity arena, the identity registry, the
//! active exchange links and the task queue, driven to quiescence by
//! [`Context::run`].
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --run--> Running --queue empty--> Quiescent
//!                  |
//!                  +--task error / watchdog--> Failed
//! ```
//!
//! Mutations (construct, add, subscribe, merge, spawn, on_entity,
//! bind_exchange) are only accepted while `Running`, that is from inside the
//! root function or a task. Reads are available in every phase. `reset`
//! discards all run state and returns to `Idle`.
//!
//! ## Guarantees
//!
//! - A handler runs exactly once per (canonical entity, handler)
//! - A subscription sees every element of its relation exactly once,
//!   whether the element was present at subscription time or added later
//! - At quiescence every exchange link holds in both directions

use crate::config::RuntimeConfig;
use crate::exchange::{ExchangeLink, ExchangeTable, LinkInfo};
use crate::identity::{IdentityRegistry, Probe};
use crate::primitives::{MAX_STRING_LENGTH, ROOT_TASK_NAME};
use crate::relation::{Insertion, Relation};
use crate::scheduler::{Task, TaskQueue};
use crate::schema::{EntityType, RelationSlot, Schema};
use crate::{EntityId, FixpointError, IndexKey, Record, SubscriptionId, TypeId, Value, ValueKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

/// Subscription callback, invoked once per relation element.
pub type CallbackFn = Rc<dyn Fn(&mut Context, Value) -> Result<(), FixpointError>>;

type QueryFn = Box<dyn FnOnce(&mut Context, EntityId) -> Result<(), FixpointError>>;

// =============================================================================
// PUBLIC TYPES
// =============================================================================

/// Lifecycle phase of a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Quiescent,
    Failed,
}

/// Counters collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub tasks_executed: u64,
    pub handlers_run: u64,
    pub callbacks_run: u64,
    pub propagations: u64,
    /// Canonical entities alive at quiescence.
    pub entities: usize,
    /// Index queries never resolved.
    pub pending_queries: usize,
}

/// Outcome of identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub entity: EntityId,
    /// `true` if this call created the entity.
    pub is_new: bool,
}

// =============================================================================
// INTERNAL STATE
// =============================================================================

struct EntityRecord {
    ty: TypeId,
    scalars: Record,
    relations: Vec<Relation>,
}

#[derive(Clone)]
enum Sink {
    Callback(CallbackFn),
    /// Copy every element into another relation.
    Forward { entity: EntityId, position: usize },
}

/// Runtime state of one run.
pub struct Context {
    schema: Arc<Schema>,
    config: RuntimeConfig,
    phase: Phase,
    queue: TaskQueue,
    entities: Vec<EntityRecord>,
    identity: IdentityRegistry,
    exchange: ExchangeTable,
    subscriptions: Vec<Sink>,
    queries: Vec<Option<QueryFn>>,
    pending: BTreeMap<(TypeId, usize, IndexKey), Vec<usize>>,
    report: RunReport,
}

impl Context {
    /// Create an idle context with the default configuration.
    #[must_use]
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self::with_config(schema, RuntimeConfig::default())
    }

    /// Create an idle context.
    #[must_use]
    pub fn with_config(schema: impl Into<Arc<Schema>>, config: RuntimeConfig) -> Self {
        let schema = schema.into();
        Self {
            exchange: ExchangeTable::from_schema(&schema),
            queue: TaskQueue::new(config.dispatch),
            schema,
            config,
            phase: Phase::Idle,
            entities: Vec::new(),
            identity: IdentityRegistry::new(),
            subscriptions: Vec::new(),
            queries: Vec::new(),
            pending: BTreeMap::new(),
            report: RunReport::default(),
        }
    }

    // =========================================================================
    // RUN LOOP
    // =========================================================================

    /// Run `root` and every task it transitively schedules until the queue
    /// is empty.
    ///
    /// The first failing task aborts the run: pending tasks are dropped,
    /// the context moves to [`Phase::Failed`] and the error is returned.
    pub fn run<F>(&mut self, root: F) -> Result<RunReport, FixpointError>
    where
        F: FnOnce(&mut Context) -> Result<(), FixpointError> + 'static,
    {
        if self.phase != Phase::Idle {
            return Err(FixpointError::ContextAlreadyRun);
        }

        tracing::info!(
            dispatch = ?self.config.dispatch,
            max_tasks = ?self.config.max_tasks,
            types = self.schema.types().count(),
            links = self.exchange.len(),
            "run started"
        );

        self.phase = Phase::Running;
        self.queue.push(Task::Run {
            name: ROOT_TASK_NAME.to_string(),
            body: Box::new(root),
        });

        while let Some(task) = self.queue.pop() {
            if let Some(limit) = self.config.max_tasks {
                if self.report.tasks_executed >= limit {
                    tracing::error!(limit, pending = self.queue.len() + 1, "watchdog limit reached");
                    return Err(self.abort(FixpointError::Diverged { limit }));
                }
            }

            self.report.tasks_executed += 1;
            let _span = tracing::debug_span!("task", task = ?task).entered();
            tracing::trace!(pending = self.queue.len(), "dispatch");

            if let Err(err) = self.execute(task) {
                tracing::error!(error = %err, "task failed, aborting run");
                return Err(self.abort(err));
            }
        }

        self.phase = Phase::Quiescent;
        self.settle_report();

        if self.report.pending_queries > 0 {
            tracing::warn!(
                pending = self.report.pending_queries,
                "index queries still pending at quiescence"
            );
        }
        tracing::info!(
            tasks = self.report.tasks_executed,
            entities = self.report.entities,
            "run quiescent"
        );

        Ok(self.report.clone())
    }

    /// Discard all run state and return to [`Phase::Idle`].
    ///
    /// Runtime-bound links are dropped; schema links stay.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.queue = TaskQueue::new(self.config.dispatch);
        self.entities.clear();
        self.identity.clear();
        self.exchange = ExchangeTable::from_schema(&self.schema);
        self.subscriptions.clear();
        self.queries.clear();
        self.pending.clear();
        self.report = RunReport::default();
        tracing::debug!("context reset");
    }

    fn abort(&mut self, err: FixpointError) -> FixpointError {
        self.queue.clear();
        self.phase = Phase::Failed;
        self.settle_report();
        err
    }

    fn settle_report(&mut self) {
        self.report.entities = self.entities.len();
        self.report.pending_queries = self.pending.values().map(Vec::len).sum();
    }

    fn execute(&mut self, task: Task) -> Result<(), FixpointError> {
        match task {
            Task::Run { body, .. } => body(self),
            Task::Handler { entity, handler } => {
                let schema = Arc::clone(&self.schema);
                let ty = schema.type_by_id(self.entity(entity)?.ty)?;
                let def = ty.handlers().get(handler).ok_or_else(|| {
                    FixpointError::Schema(format!("{} has no handler #{handler}", ty.name()))
                })?;
                self.report.handlers_run += 1;
                tracing::trace!(handler = %def.name, %entity, "handler");
                (def.run)(self, entity)
            }
            Task::Callback {
                subscription,
                element,
            } => {
                let sink = self
                    .subscriptions
                    .get(subscription.0)
                    .cloned()
                    .ok_or_else(|| {
                        FixpointError::task(format!("unknown subscription {}", subscription.0))
                    })?;
                self.report.callbacks_run += 1;
                match sink {
                    Sink::Callback(callback) => callback(self, element),
                    Sink::Forward { entity, position } => {
                        self.add_at(entity, position, element).map(|_| ())
                    }
                }
            }
            Task::Propagate {
                source,
                target,
                position,
            } => {
                self.report.propagations += 1;
                self.add_at(target, position, Value::Entity(source)).map(|_| ())
            }
            Task::Resolve { query, entity } => {
                let callback = self
                    .queries
                    .get_mut(query)
                    .and_then(Option::take)
                    .ok_or_else(|| FixpointError::task(format!("query {query} already resolved")))?;
                callback(self, entity)
            }
        }
    }

    fn ensure_running(&self, action: impl FnOnce() -> String) -> Result<(), FixpointError> {
        if self.phase != Phase::Running {
            return Err(FixpointError::ContextFrozen(action()));
        }
        Ok(())
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    /// Construct an entity and return its canonical handle.
    ///
    /// See [`Context::resolve`].
    pub fn construct(&mut self, type_name: &str, record: Record) -> Result<EntityId, FixpointError> {
        self.resolve(type_name, record).map(|resolved| resolved.entity)
    }

    /// Resolve a constructor call to its canonical entity.
    ///
    /// Missing scalars take their defaults. If any index key of the complete
    /// record is already registered, the existing entity is returned and its
    /// scalars must equal the supplied ones. Otherwise a new entity is
    /// created, registered under every index key, and one task per handler
    /// of its type (ancestors' handlers first) is scheduled.
    pub fn resolve(&mut self, type_name: &str, record: Record) -> Result<Resolved, FixpointError> {
        self.ensure_running(|| format!("construct {type_name}"))?;

        let schema = Arc::clone(&self.schema);
        let ty = schema.entity_type(type_name)?;
        let record = self.complete_record(ty, record)?;

        match self.identity.probe(ty, &record) {
            Probe::Existing(entity) => {
                let existing = &self.entity(entity)?.scalars;
                for (name, supplied) in record.iter() {
                    if let Some(current) = existing.get(name) {
                        if current != supplied {
                            return Err(FixpointError::Consistency {
                                entity: self.describe(entity),
                                attribute: name.to_string(),
                                existing: current.clone(),
                                supplied: supplied.clone(),
                            });
                        }
                    }
                }
                Ok(Resolved {
                    entity,
                    is_new: false,
                })
            }
            Probe::Vacant(keys) => {
                let entity = EntityId(self.entities.len() as u64);
                self.entities.push(EntityRecord {
                    ty: ty.id(),
                    scalars: record,
                    relations: ty
                        .relations()
                        .iter()
                        .map(|def| Relation::new(def.element, def.cardinality))
                        .collect(),
                });

                for (position, key) in keys.iter().enumerate() {
                    if let Some(waiting) = self.pending.remove(&(ty.id(), position, key.clone())) {
                        for query in waiting {
                            self.queue.push(Task::Resolve { query, entity });
                        }
                    }
                }
                self.identity.register(ty.id(), keys, entity);

                for handler in 0..ty.handlers().len() {
                    self.queue.push(Task::Handler { entity, handler });
                }

                tracing::debug!(%entity, entity_type = ty.name(), "entity created");
                Ok(Resolved {
                    entity,
                    is_new: true,
                })
            }
        }
    }

    fn complete_record(&self, ty: &EntityType, record: Record) -> Result<Record, FixpointError> {
        if let Some((name, _)) = record.iter().find(|(name, _)| ty.scalar(name).is_none()) {
            return Err(FixpointError::UnknownAttribute {
                type_name: ty.name().to_string(),
                attribute: name.to_string(),
            });
        }

        let mut complete = Record::new();
        for def in ty.scalars() {
            let value = match (record.get(&def.name), &def.default) {
                (Some(value), _) => {
                    self.check_kind(def.kind, value, || format!("{}.{}", ty.name(), def.name))?;
                    value.clone()
                }
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(FixpointError::MissingAttribute {
                        type_name: ty.name().to_string(),
                        attribute: def.name.clone(),
                    });
                }
            };
            complete.insert(def.name.clone(), value);
        }
        Ok(complete)
    }

    fn check_kind(
        &self,
        kind: ValueKind,
        value: &Value,
        target: impl FnOnce() -> String,
    ) -> Result<(), FixpointError> {
        let matches = match (kind, value) {
            (ValueKind::Entity(expected), Value::Entity(id)) => {
                self.schema.is_subtype(self.entity(*id)?.ty, expected)
            }
            (kind, value) => kind.matches_scalar(value),
        };

        if !matches {
            return Err(FixpointError::TypeMismatch {
                target: target(),
                expected: self.schema.kind_name(kind),
                found: self.value_kind_name(value),
            });
        }

        if let Value::Str(s) = value {
            if s.len() > MAX_STRING_LENGTH {
                return Err(FixpointError::TypeMismatch {
                    target: target(),
                    expected: format!("str of at most {MAX_STRING_LENGTH} bytes"),
                    found: format!("str of {} bytes", s.len()),
                });
            }
        }
        Ok(())
    }

    fn value_kind_name(&self, value: &Value) -> String {
        match value {
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Entity(id) => match self.entity(*id) {
                Ok(record) => self.schema.kind_name(ValueKind::Entity(record.ty)),
                Err(_) => format!("unknown entity {id}"),
            },
        }
    }

    // =========================================================================
    // RELATIONS
    // =========================================================================

    /// Add an element to a relation attribute.
    ///
    /// Returns `true` if the element was new. Re-adding a present element
    /// is a no-op. A new element schedules one callback per subscriber and,
    /// for entity elements, the mirrored insertion of every exchange link.
    pub fn add(
        &mut self,
        entity: EntityId,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<bool, FixpointError> {
        self.ensure_running(|| format!("add to {entity}.{attribute}"))?;
        let position = self.relation_position(entity, attribute)?;
        self.add_at(entity, position, value.into())
    }

    /// Add several elements. Returns how many were new.
    pub fn add_all<I, V>(
        &mut self,
        entity: EntityId,
        attribute: &str,
        values: I,
    ) -> Result<usize, FixpointError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut added = 0;
        for value in values {
            if self.add(entity, attribute, value)? {
                added += 1;
            }
        }
        Ok(added)
    }

    fn add_at(&mut self, entity: EntityId, position: usize, value: Value) -> Result<bool, FixpointError> {
        let schema = Arc::clone(&self.schema);
        let ty = schema.type_by_id(self.entity(entity)?.ty)?;
        let def = ty.relations().get(position).ok_or_else(|| {
            FixpointError::Schema(format!("{} has no relation #{position}", ty.name()))
        })?;
        self.check_kind(def.element, &value, || format!("{}.{}", ty.name(), def.name))?;

        let relation = self.relation_at_mut(entity, position)?;
        match relation.insert(value.clone()) {
            Insertion::Present => Ok(false),
            Insertion::Conflict(existing) => Err(FixpointError::Consistency {
                entity: self.describe(entity),
                attribute: def.name.clone(),
                existing,
                supplied: value,
            }),
            Insertion::Added => {
                let subscribers = relation.subscribers().to_vec();
                for subscription in subscribers {
                    self.queue.push(Task::Callback {
                        subscription,
                        element: value.clone(),
                    });
                }

                if let Value::Entity(target) = value {
                    for slot in self.exchange.counterparts(&schema, ty.id(), position) {
                        self.queue.push(Task::Propagate {
                            source: entity,
                            target,
                            position: slot.position(),
                        });
                    }
                }

                tracing::trace!(%entity, attribute = %def.name, "element added");
                Ok(true)
            }
        }
    }

    /// Register a callback on a relation attribute.
    ///
    /// The callback is scheduled once for every element already present
    /// and once for every element added later.
    pub fn subscribe<F>(
        &mut self,
        entity: EntityId,
        attribute: &str,
        callback: F,
    ) -> Result<SubscriptionId, FixpointError>
    where
        F: Fn(&mut Context, Value) -> Result<(), FixpointError> + 'static,
    {
        self.ensure_running(|| format!("subscribe to {entity}.{attribute}"))?;
        let position = self.relation_position(entity, attribute)?;
        self.subscribe_at(entity, position, Sink::Callback(Rc::new(callback)))
    }

    /// Copy every element of `from`, past and future, into `into`.
    pub fn merge(
        &mut self,
        from: EntityId,
        from_attribute: &str,
        into: EntityId,
        into_attribute: &str,
    ) -> Result<SubscriptionId, FixpointError> {
        self.ensure_running(|| {
            format!("merge {from}.{from_attribute} into {into}.{into_attribute}")
        })?;
        let from_position = self.relation_position(from, from_attribute)?;
        let into_position = self.relation_position(into, into_attribute)?;

        let from_kind = self.relation_at(from, from_position)?.element();
        let into_kind = self.relation_at(into, into_position)?.element();
        if !self.schema.kind_within(from_kind, into_kind) {
            return Err(FixpointError::TypeMismatch {
                target: format!("merge {from}.{from_attribute} into {into}.{into_attribute}"),
                expected: self.schema.kind_name(into_kind),
                found: self.schema.kind_name(from_kind),
            });
        }

        self.subscribe_at(
            from,
            from_position,
            Sink::Forward {
                entity: into,
                position: into_position,
            },
        )
    }

    fn subscribe_at(
        &mut self,
        entity: EntityId,
        position: usize,
        sink: Sink,
    ) -> Result<SubscriptionId, FixpointError> {
        let subscription = SubscriptionId(self.subscriptions.len());
        let relation = self.relation_at_mut(entity, position)?;
        relation.subscribe(subscription);
        let replay: Vec<Value> = relation.iter().cloned().collect();
        self.subscriptions.push(sink);

        for element in replay {
            self.queue.push(Task::Callback {
                subscription,
                element,
            });
        }
        Ok(subscription)
    }

    // =========================================================================
    // TASKS, QUERIES, LINKS
    // =========================================================================

    /// Schedule an arbitrary task.
    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F) -> Result<(), FixpointError>
    where
        F: FnOnce(&mut Context) -> Result<(), FixpointError> + 'static,
    {
        let name = name.into();
        self.ensure_running(|| format!("spawn {name}"))?;
        self.queue.push(Task::Run {
            name,
            body: Box::new(task),
        });
        Ok(())
    }

    /// Schedule `callback` once an entity with the given index key exists.
    ///
    /// Resolves on the next dispatch if the entity already exists. Queries
    /// never satisfied are counted in [`RunReport::pending_queries`].
    pub fn on_entity<F>(
        &mut self,
        type_name: &str,
        index: &str,
        key: impl Into<IndexKey>,
        callback: F,
    ) -> Result<(), FixpointError>
    where
        F: FnOnce(&mut Context, EntityId) -> Result<(), FixpointError> + 'static,
    {
        self.ensure_running(|| format!("query {type_name}.{index}"))?;
        let (ty, position) = self.index_of(type_name, index)?;
        let key = key.into();

        let query = self.queries.len();
        self.queries.push(Some(Box::new(callback)));

        match self.identity.lookup(ty, position, &key) {
            Some(entity) => self.queue.push(Task::Resolve { query, entity }),
            None => self.pending.entry((ty, position, key)).or_default().push(query),
        }
        Ok(())
    }

    /// Bind two relation slots while running.
    ///
    /// Only elements added afterwards are mirrored; members present at bind
    /// time are not backfilled. Returns `false` if the link already existed.
    pub fn bind_exchange(&mut self, a: RelationSlot, b: RelationSlot) -> Result<bool, FixpointError> {
        self.ensure_running(|| "bind exchange".to_string())?;
        self.schema.validate_link(a, b)?;

        let link = ExchangeLink::new(a, b);
        if !self.exchange.bind(link) {
            return Ok(false);
        }
        tracing::warn!(
            link = %self.schema.describe_link(&link),
            "exchange bound at runtime, existing members are not backfilled"
        );
        Ok(true)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Synchronous index lookup.
    pub fn find(
        &self,
        type_name: &str,
        index: &str,
        key: impl Into<IndexKey>,
    ) -> Result<Option<EntityId>, FixpointError> {
        let (ty, position) = self.index_of(type_name, index)?;
        Ok(self.identity.lookup(ty, position, &key.into()))
    }

    /// Value of a scalar attribute.
    pub fn scalar(&self, entity: EntityId, attribute: &str) -> Result<&Value, FixpointError> {
        let record = self.entity(entity)?;
        record.scalars.get(attribute).ok_or_else(|| FixpointError::UnknownAttribute {
            type_name: self.schema.kind_name(ValueKind::Entity(record.ty)),
            attribute: attribute.to_string(),
        })
    }

    /// All scalars of an entity, defaults applied.
    pub fn record(&self, entity: EntityId) -> Result<&Record, FixpointError> {
        Ok(&self.entity(entity)?.scalars)
    }

    /// A relation attribute of an entity.
    pub fn relation(&self, entity: EntityId, attribute: &str) -> Result<&Relation, FixpointError> {
        let position = self.relation_position(entity, attribute)?;
        self.relation_at(entity, position)
    }

    /// Entity elements of a relation attribute, in insertion order.
    pub fn related(&self, entity: EntityId, attribute: &str) -> Result<Vec<EntityId>, FixpointError> {
        Ok(self.relation(entity, attribute)?.entities().collect())
    }

    pub fn contains(
        &self,
        entity: EntityId,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<bool, FixpointError> {
        Ok(self.relation(entity, attribute)?.contains(&value.into()))
    }

    /// Concrete type of an entity.
    pub fn type_of(&self, entity: EntityId) -> Result<&EntityType, FixpointError> {
        self.schema.type_by_id(self.entity(entity)?.ty)
    }

    /// Entities whose type is `type_name` or one of its subtypes, in creation order.
    pub fn instances_of(&self, type_name: &str) -> Result<Vec<EntityId>, FixpointError> {
        let of = self.schema.entity_type(type_name)?.id();
        Ok(self
            .entities
            .iter()
            .enumerate()
            .filter(|(_, record)| self.schema.is_subtype(record.ty, of))
            .map(|(i, _)| EntityId(i as u64))
            .collect())
    }

    /// Every entity, in creation order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.entities.len()).map(|i| EntityId(i as u64))
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Human readable name: `Person[unique_name="bob"]`, or `Person#3`
    /// for types without index.
    #[must_use]
    pub fn describe(&self, entity: EntityId) -> String {
        let Ok(record) = self.entity(entity) else {
            return entity.to_string();
        };
        let Ok(ty) = self.schema.type_by_id(record.ty) else {
            return entity.to_string();
        };
        match ty.indices().first() {
            Some(index) => format!("{}[{}={}]", ty.name(), index.name(), index.key(&record.scalars)),
            None => format!("{}{entity}", ty.name()),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Counters of the current or last run.
    #[must_use]
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Active exchange links, runtime-bound ones included.
    #[must_use]
    pub fn links(&self) -> Vec<LinkInfo> {
        self.exchange.describe(&self.schema)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn entity(&self, entity: EntityId) -> Result<&EntityRecord, FixpointError> {
        self.entities
            .get(entity.0 as usize)
            .ok_or(FixpointError::UnknownEntity(entity))
    }

    fn relation_position(&self, entity: EntityId, attribute: &str) -> Result<usize, FixpointError> {
        let ty = self.type_of(entity)?;
        ty.relation_position(attribute)
            .ok_or_else(|| FixpointError::UnknownAttribute {
                type_name: ty.name().to_string(),
                attribute: attribute.to_string(),
            })
    }

    fn relation_at(&self, entity: EntityId, position: usize) -> Result<&Relation, FixpointError> {
        self.entity(entity)?
            .relations
            .get(position)
            .ok_or_else(|| FixpointError::Schema(format!("{entity} has no relation #{position}")))
    }

    fn relation_at_mut(
        &mut self,
        entity: EntityId,
        position: usize,
    ) -> Result<&mut Relation, FixpointError> {
        self.entities
            .get_mut(entity.0 as usize)
            .ok_or(FixpointError::UnknownEntity(entity))?
            .relations
            .get_mut(position)
            .ok_or_else(|| FixpointError::Schema(format!("{entity} has no relation #{position}")))
    }

    fn index_of(&self, type_name: &str, index: &str) -> Result<(TypeId, usize), FixpointError> {
        let ty = self.schema.entity_type(type_name)?;
        let position = ty.index_position(index).ok_or_else(|| {
            FixpointError::Schema(format!("{type_name} has no index named {index}"))
        })?;
        Ok((ty.id(), position))
    }
}

// =============================================================================
// TESTS
// =============================================================================
