//! # Genealogy Scenario
//!
//! People, their parents, and everything derived from them:
//! - `parents <-> children` and `ancestors <-> descendants` are exchanged
//! - every person's ancestors are its parents plus their ancestors
//!
//! Family files list people by name:
//!
//! ```toml
//! [[person]]
//! name = "carol"
//! likes_dogs = true
//! parents = ["bob", "beth"]
//! ```
//!
//! Parents that have no entry of their own are created with default scalars.

use super::{name_of, sorted_names};
use fixpoint_core::{
    Context, DispatchOrder, EntityId, FixpointError, Index, Kind, Record, RunReport,
    RuntimeConfig, Schema, SchemaBuilder, slot,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Maximum number of `[[person]]` entries in a family file.
pub const MAX_PEOPLE: usize = 100_000;

// =============================================================================
// INPUT
// =============================================================================

/// Contents of a family file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FamilyFile {
    #[serde(default)]
    pub person: Vec<PersonSeed>,
}

/// One `[[person]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersonSeed {
    pub name: String,
    #[serde(default)]
    pub likes_dogs: bool,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl FamilyFile {
    /// Parse a family file.
    pub fn parse(text: &str) -> Result<Self, FixpointError> {
        let family: Self = toml::from_str(text)
            .map_err(|e| FixpointError::Config(format!("Invalid family file: {e}")))?;

        if family.person.len() > MAX_PEOPLE {
            return Err(FixpointError::Config(format!(
                "Family file lists {} people, maximum is {MAX_PEOPLE}",
                family.person.len()
            )));
        }
        if let Some(seed) = family.person.iter().find(|p| p.name.is_empty()) {
            return Err(FixpointError::Config(format!(
                "Person with parents {:?} has an empty name",
                seed.parents
            )));
        }
        Ok(family)
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Final state of one person, names sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonSummary {
    pub name: String,
    pub likes_dogs: bool,
    pub parents: Vec<String>,
    pub children: Vec<String>,
    pub ancestors: Vec<String>,
    pub descendants: Vec<String>,
}

/// Result of a genealogy run.
#[derive(Debug, Clone, Serialize)]
pub struct GenealogyReport {
    /// Sorted by name.
    pub people: Vec<PersonSummary>,
    pub run: RunReport,
}

impl GenealogyReport {
    #[must_use]
    pub fn person(&self, name: &str) -> Option<&PersonSummary> {
        self.people.iter().find(|p| p.name == name)
    }
}

/// FIFO and LIFO runs of the same family compared.
#[derive(Debug, Clone, Serialize)]
pub struct ConfluenceReport {
    pub identical: bool,
    /// Names of people whose final state differs.
    pub differences: Vec<String>,
    pub fifo: RunReport,
    pub lifo: RunReport,
}

impl ConfluenceReport {
    /// Fail with [`FixpointError::NotConfluent`] when the runs disagree.
    pub fn ensure_identical(&self) -> Result<(), FixpointError> {
        if self.identical {
            return Ok(());
        }
        Err(FixpointError::NotConfluent {
            count: self.differences.len(),
        })
    }
}

// =============================================================================
// SCHEMA AND RUN
// =============================================================================

/// The genealogy schema.
pub fn schema() -> Result<Schema, FixpointError> {
    let mut builder = SchemaBuilder::new();
    builder
        .entity("Person")
        .scalar("name", Kind::Str)
        .scalar_or("likes_dogs", Kind::Bool, false)
        .relation("parents", Kind::entity("Person"))
        .relation("children", Kind::entity("Person"))
        .relation("ancestors", Kind::entity("Person"))
        .relation("descendants", Kind::entity("Person"))
        .index(Index::on("unique_name", ["name"]))
        .handler("inherit_ancestors", |ctx, person| {
            ctx.subscribe(person, "parents", move |ctx, parent| {
                let parent = parent
                    .as_entity()
                    .ok_or_else(|| FixpointError::task("parent is not a person"))?;
                ctx.add(person, "ancestors", parent)?;
                ctx.merge(parent, "ancestors", person, "ancestors")?;
                Ok(())
            })?;
            Ok(())
        });
    builder
        .bind_exchange(slot("Person", "parents"), slot("Person", "children"))
        .bind_exchange(slot("Person", "ancestors"), slot("Person", "descendants"));
    builder.build()
}

/// Run a family to its fixpoint.
pub fn run(family: &FamilyFile, config: RuntimeConfig) -> Result<GenealogyReport, FixpointError> {
    let seeds = family.person.clone();
    let mut ctx = Context::with_config(schema()?, config);

    tracing::info!(people = seeds.len(), "running genealogy");
    let run = ctx.run(move |ctx| {
        let mut people = Vec::with_capacity(seeds.len());
        for seed in &seeds {
            people.push(ctx.construct(
                "Person",
                Record::new()
                    .set("name", seed.name.as_str())
                    .set("likes_dogs", seed.likes_dogs),
            )?);
        }
        for (seed, child) in seeds.iter().zip(people) {
            for parent in &seed.parents {
                let parent = match ctx.find("Person", "unique_name", parent.as_str())? {
                    Some(existing) => existing,
                    None => ctx.construct("Person", Record::new().set("name", parent.as_str()))?,
                };
                ctx.add(child, "parents", parent)?;
            }
        }
        Ok(())
    })?;

    let mut people: Vec<PersonSummary> = ctx
        .instances_of("Person")?
        .into_iter()
        .filter_map(|person| summarize(&ctx, person))
        .collect();
    people.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(GenealogyReport { people, run })
}

/// Run a family under FIFO and LIFO dispatch and compare the final states.
pub fn check_confluence(
    family: &FamilyFile,
    config: RuntimeConfig,
) -> Result<ConfluenceReport, FixpointError> {
    let fifo = run(family, config.clone().with_dispatch(DispatchOrder::Fifo))?;
    let lifo = run(family, config.with_dispatch(DispatchOrder::Lifo))?;

    let by_name = |report: &GenealogyReport| -> BTreeMap<String, PersonSummary> {
        report
            .people
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect()
    };
    let left = by_name(&fifo);
    let right = by_name(&lifo);

    let differences: Vec<String> = left
        .keys()
        .chain(right.keys())
        .filter(|name| left.get(*name) != right.get(*name))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if !differences.is_empty() {
        tracing::warn!(count = differences.len(), "dispatch orders disagree");
    }

    Ok(ConfluenceReport {
        identical: differences.is_empty(),
        differences,
        fifo: fifo.run,
        lifo: lifo.run,
    })
}

fn summarize(ctx: &Context, person: EntityId) -> Option<PersonSummary> {
    Some(PersonSummary {
        name: name_of(ctx, person)?,
        likes_dogs: ctx.scalar(person, "likes_dogs").ok()?.as_bool()?,
        parents: sorted_names(ctx, person, "parents"),
        children: sorted_names(ctx, person, "children"),
        ancestors: sorted_names(ctx, person, "ancestors"),
        descendants: sorted_names(ctx, person, "descendants"),
    })
}

// =============================================================================
// TESTS
// =============================================================================
