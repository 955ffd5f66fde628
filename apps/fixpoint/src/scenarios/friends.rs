//! # Friends Scenario
//!
//! A symmetric `friends` relation (a slot exchanged with itself) and a
//! derived `circle`: the friends of every friend.

use super::{name_of, sorted_names};
use fixpoint_core::{
    Context, FixpointError, Index, Kind, Record, RunReport, RuntimeConfig, Schema, SchemaBuilder,
    slot,
};
use serde::Serialize;

/// Final state of one person, names sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendSummary {
    pub name: String,
    pub friends: Vec<String>,
    /// Friends of friends, the person itself included once it has a friend.
    pub circle: Vec<String>,
}

/// Result of a friends run.
#[derive(Debug, Clone, Serialize)]
pub struct FriendsReport {
    pub people: Vec<FriendSummary>,
    pub run: RunReport,
}

impl FriendsReport {
    #[must_use]
    pub fn person(&self, name: &str) -> Option<&FriendSummary> {
        self.people.iter().find(|p| p.name == name)
    }
}

/// Parse a `name,name` pair given on the command line.
pub fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'name,name', got '{s}'"))?;
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return Err(format!("empty name in pair '{s}'"));
    }
    Ok((a.to_string(), b.to_string()))
}

/// The friends schema.
pub fn schema() -> Result<Schema, FixpointError> {
    let mut builder = SchemaBuilder::new();
    builder
        .entity("Person")
        .scalar("name", Kind::Str)
        .relation("friends", Kind::entity("Person"))
        .relation("circle", Kind::entity("Person"))
        .index(Index::on("unique_name", ["name"]))
        .handler("widen_circle", |ctx, person| {
            ctx.subscribe(person, "friends", move |ctx, friend| {
                let friend = friend
                    .as_entity()
                    .ok_or_else(|| FixpointError::task("friend is not a person"))?;
                ctx.merge(friend, "friends", person, "circle")?;
                Ok(())
            })?;
            Ok(())
        });
    builder.bind_exchange(slot("Person", "friends"), slot("Person", "friends"));
    builder.build()
}

/// Befriend every pair and run to the fixpoint.
pub fn run(pairs: &[(String, String)], config: RuntimeConfig) -> Result<FriendsReport, FixpointError> {
    let pairs = pairs.to_vec();
    let mut ctx = Context::with_config(schema()?, config);

    tracing::info!(pairs = pairs.len(), "running friends");
    let run = ctx.run(move |ctx| {
        for (a, b) in &pairs {
            let a = ctx.construct("Person", Record::new().set("name", a.as_str()))?;
            let b = ctx.construct("Person", Record::new().set("name", b.as_str()))?;
            ctx.add(a, "friends", b)?;
        }
        Ok(())
    })?;

    let mut people: Vec<FriendSummary> = ctx
        .entities()
        .filter_map(|person| {
            Some(FriendSummary {
                name: name_of(&ctx, person)?,
                friends: sorted_names(&ctx, person, "friends"),
                circle: sorted_names(&ctx, person, "circle"),
            })
        })
        .collect();
    people.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(FriendsReport { people, run })
}

// =============================================================================
// TESTS
// =============================================================================
