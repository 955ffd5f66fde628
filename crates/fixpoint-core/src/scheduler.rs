//! # Scheduler Module
//!
//! The work list behind [`Context::run`](crate::Context::run).
//!
//! Every reaction of the runtime is a [`Task`]: handler invocations,
//! subscription callbacks, exchange propagation, query resolution and user
//! spawned work. Tasks run to completion one at a time; a task never
//! suspends, it enqueues follow-up tasks instead.

use crate::config::DispatchOrder;
use crate::context::Context;
use crate::{EntityId, FixpointError, SubscriptionId, Value};
use std::collections::VecDeque;
use std::fmt;

/// Body of a root or spawned task.
pub type TaskFn = Box<dyn FnOnce(&mut Context) -> Result<(), FixpointError>>;

/// A unit of deferred work.
pub(crate) enum Task {
    /// The root function or a spawned task.
    Run { name: String, body: TaskFn },
    /// Handler number `handler` of the entity's flattened handler list.
    Handler { entity: EntityId, handler: usize },
    /// Deliver one element to one subscription.
    Callback {
        subscription: SubscriptionId,
        element: Value,
    },
    /// Mirror an exchange: add `source` to the relation at `position` of `target`.
    Propagate {
        source: EntityId,
        target: EntityId,
        position: usize,
    },
    /// Hand a resolved entity to a pending index query.
    Resolve { query: usize, entity: EntityId },
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run { name, .. } => write!(f, "run({name})"),
            Self::Handler { entity, handler } => write!(f, "handler({entity}, {handler})"),
            Self::Callback {
                subscription,
                element,
            } => write!(f, "callback({}, {element})", subscription.0),
            Self::Propagate {
                source,
                target,
                position,
            } => write!(f, "propagate({source} -> {target}[{position}])"),
            Self::Resolve { query, entity } => write!(f, "resolve(q{query}, {entity})"),
        }
    }
}

/// Pending tasks, popped according to the configured [`DispatchOrder`].
pub(crate) struct TaskQueue {
    order: DispatchOrder,
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub(crate) fn new(order: DispatchOrder) -> Self {
        Self {
            order,
            tasks: VecDeque::new(),
        }
    }

    pub(crate) fn push(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    pub(crate) fn pop(&mut self) -> Option<Task> {
        match self.order {
            DispatchOrder::Fifo => self.tasks.pop_front(),
            DispatchOrder::Lifo => self.tasks.pop_back(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Drop every pending task. Used when a run aborts.
    pub(crate) fn clear(&mut self) {
        self.tasks.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
