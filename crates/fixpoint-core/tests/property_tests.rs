//! # Property-Based Tests
//!
//! Verification tests using proptest.
//!
//! These tests check confluence and closure invariants on random graphs.

use fixpoint_core::{
    Context, DispatchOrder, EntityId, FixpointError, Index, Kind, Record, RuntimeConfig, Schema,
    SchemaBuilder, Value, slot,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const PEOPLE: u64 = 8;

fn schema() -> Schema {
    let mut builder = SchemaBuilder::new();
    builder
        .entity("Person")
        .scalar("id", Kind::Int)
        .relation("parents", Kind::entity("Person"))
        .relation("children", Kind::entity("Person"))
        .relation("ancestors", Kind::entity("Person"))
        .relation("descendants", Kind::entity("Person"))
        .relation("friends", Kind::entity("Person"))
        .index(Index::on("by_id", ["id"]))
        .handler("inherit_ancestors", |ctx, person| {
            ctx.subscribe(person, "parents", move |ctx, parent| {
                let parent = parent
                    .as_entity()
                    .ok_or_else(|| FixpointError::task("parent is not an entity"))?;
                ctx.add(person, "ancestors", parent)?;
                ctx.merge(parent, "ancestors", person, "ancestors")?;
                Ok(())
            })?;
            Ok(())
        });
    builder
        .bind_exchange(slot("Person", "parents"), slot("Person", "children"))
        .bind_exchange(slot("Person", "ancestors"), slot("Person", "descendants"))
        .bind_exchange(slot("Person", "friends"), slot("Person", "friends"));
    builder.build().expect("schema")
}

/// Final state keyed by person id: (ancestors, descendants, friends).
type Snapshot = BTreeMap<i64, (BTreeSet<i64>, BTreeSet<i64>, BTreeSet<i64>)>;

fn run(parents: &[(u64, u64)], friends: &[(u64, u64)], dispatch: DispatchOrder) -> Snapshot {
    let parents = parents.to_vec();
    let friends = friends.to_vec();
    let mut ctx = Context::with_config(schema(), RuntimeConfig::default().with_dispatch(dispatch));

    ctx.run(move |ctx| {
        let person = |ctx: &mut Context, id: u64| {
            ctx.construct("Person", Record::new().set("id", id as i64))
        };
        for (child, parent) in parents {
            let child = person(ctx, child)?;
            let parent = person(ctx, parent)?;
            ctx.add(child, "parents", parent)?;
        }
        for (a, b) in friends {
            let a = person(ctx, a)?;
            let b = person(ctx, b)?;
            ctx.add(a, "friends", b)?;
        }
        Ok(())
    })
    .expect("run");

    snapshot(&ctx)
}

fn ids(ctx: &Context, entity: EntityId, attribute: &str) -> BTreeSet<i64> {
    ctx.related(entity, attribute)
        .expect("relation")
        .into_iter()
        .filter_map(|e| ctx.scalar(e, "id").ok().and_then(Value::as_int))
        .collect()
}

fn snapshot(ctx: &Context) -> Snapshot {
    ctx.entities()
        .map(|e| {
            let id = ctx.scalar(e, "id").ok().and_then(Value::as_int).unwrap_or(-1);
            (
                id,
                (
                    ids(ctx, e, "ancestors"),
                    ids(ctx, e, "descendants"),
                    ids(ctx, e, "friends"),
                ),
            )
        })
        .collect()
}

/// Reference closure by breadth-first search over parent edges.
fn reference_ancestors(parents: &[(u64, u64)]) -> BTreeMap<i64, BTreeSet<i64>> {
    let mut direct: BTreeMap<u64, BTreeSet<u64>> = BTreeMap::new();
    for &(child, parent) in parents {
        direct.entry(child).or_default().insert(parent);
    }

    let mut closure = BTreeMap::new();
    for &(child, parent) in parents {
        for person in [child, parent] {
            let mut seen = BTreeSet::new();
            let mut queue: VecDeque<u64> = direct.get(&person).into_iter().flatten().copied().collect();
            while let Some(next) = queue.pop_front() {
                if seen.insert(next) {
                    queue.extend(direct.get(&next).into_iter().flatten().copied());
                }
            }
            closure.insert(person as i64, seen.into_iter().map(|p| p as i64).collect());
        }
    }
    closure
}

fn edges() -> impl Strategy<Value = Vec<(u64, u64)>> {
    vec((0..PEOPLE, 0..PEOPLE), 0..24)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Ancestors equal the transitive closure of parents, cycles included.
    #[test]
    fn ancestors_are_transitive_closure(parents in edges()) {
        let state = run(&parents, &[], DispatchOrder::Fifo);
        let expected = reference_ancestors(&parents);
        let empty = BTreeSet::new();

        for (id, (ancestors, _, _)) in &state {
            prop_assert_eq!(ancestors, expected.get(id).unwrap_or(&empty));
        }
    }

    /// FIFO and LIFO dispatch reach the same fixpoint.
    #[test]
    fn dispatch_order_confluence(parents in edges(), friends in edges()) {
        let fifo = run(&parents, &friends, DispatchOrder::Fifo);
        let lifo = run(&parents, &friends, DispatchOrder::Lifo);
        prop_assert_eq!(fifo, lifo);
    }

    /// Submission order of the same edges does not change the result.
    #[test]
    fn submission_order_confluence(parents in edges(), friends in edges()) {
        let mut reversed_parents = parents.clone();
        reversed_parents.reverse();
        let mut reversed_friends = friends.clone();
        reversed_friends.reverse();

        let forward = run(&parents, &friends, DispatchOrder::Fifo);
        let backward = run(&reversed_parents, &reversed_friends, DispatchOrder::Fifo);
        prop_assert_eq!(forward, backward);
    }

    /// Every exchange holds in both directions at quiescence.
    #[test]
    fn exchanges_are_symmetric(parents in edges(), friends in edges()) {
        let state = run(&parents, &friends, DispatchOrder::Lifo);

        for (id, (ancestors, _, friends)) in &state {
            for ancestor in ancestors {
                prop_assert!(state[ancestor].1.contains(id));
            }
            for friend in friends {
                prop_assert!(state[friend].2.contains(id));
            }
        }
    }
}
