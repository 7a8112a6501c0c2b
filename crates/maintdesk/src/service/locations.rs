use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::Value;

use crate::db::{location_repo, machine_repo, Database};
use crate::error::{MaintError, Result};
use crate::model::{new_id, non_blank, Location, LocationInput, LocationNode};
use crate::pagination::{Page, PageWindow};
use crate::validation::{self, rules, Payload};

const KIND: &str = "Location";

pub fn list(db: &Database, search: Option<&str>, window: PageWindow) -> Result<Page<Location>> {
    let filter = location_repo::LocationFilter {
        search: search.map(str::to_string),
        parent_id: None,
        limit: Some(window.limit),
        offset: Some(window.offset()),
    };
    let (items, total) = location_repo::query(db, &filter)?;
    Ok(Page::new(items, total, window))
}

pub fn get(db: &Database, id: &str) -> Result<Location> {
    location_repo::find_by_id(db, id)?.ok_or_else(|| MaintError::not_found(KIND, id))
}

fn parse(payload: Value) -> Result<LocationInput> {
    let input: LocationInput = validation::parse(Payload::Location, payload)?;
    rules::location(&input)?;
    Ok(input)
}

pub fn create(db: &Database, payload: Value) -> Result<Location> {
    let _span = tracing::info_span!("location.create").entered();
    let input = parse(payload)?;
    let parent_id = non_blank(input.parent_id);
    if let Some(ref parent) = parent_id {
        ensure_parent(db, parent)?;
    }

    let now = Utc::now();
    let location = Location {
        id: new_id(),
        name: input.name.trim().to_string(),
        description: non_blank(input.description),
        parent_id,
        created_at: now,
        updated_at: now,
    };
    location_repo::insert(db, &location)?;
    log::info!("Created location {} ({})", location.id, location.name);
    Ok(location)
}

pub fn update(db: &Database, id: &str, payload: Value) -> Result<Location> {
    let _span = tracing::info_span!("location.update", id).entered();
    let mut location = get(db, id)?;
    let input = parse(payload)?;
    let parent_id = non_blank(input.parent_id);

    if let Some(ref parent) = parent_id {
        if parent == id {
            return Err(MaintError::invalid("A location cannot be its own parent"));
        }
        ensure_parent(db, parent)?;
        if location_repo::ancestor_ids(db, parent)?.iter().any(|a| a == id) {
            return Err(MaintError::invalid(
                "A location cannot be moved under one of its own sub-locations",
            ));
        }
    }

    location.name = input.name.trim().to_string();
    location.description = non_blank(input.description);
    location.parent_id = parent_id;
    location.updated_at = Utc::now();
    location_repo::update(db, &location)?;
    Ok(location)
}

/// Deletes a location that holds neither machines nor sub-locations.
pub fn delete(db: &Database, id: &str) -> Result<()> {
    let _span = tracing::info_span!("location.delete", id).entered();
    get(db, id)?;

    let machines = machine_repo::count_by_location(db, id)?;
    let children = location_repo::count_children(db, id)?;
    if machines > 0 || children > 0 {
        return Err(MaintError::Conflict {
            message: format!(
                "Location is in use by {} machine(s) and has {} sub-location(s)",
                machines, children
            ),
            blocking: vec![("machinesCount", machines), ("childrenCount", children)],
        });
    }

    location_repo::delete(db, id)?;
    log::info!("Deleted location {}", id);
    Ok(())
}

pub fn children(db: &Database, id: &str) -> Result<Vec<Location>> {
    get(db, id)?;
    Ok(location_repo::list_children(db, id)?)
}

/// All locations as a forest, siblings sorted by name.
pub fn tree(db: &Database) -> Result<Vec<LocationNode>> {
    Ok(build_tree(location_repo::list_all(db)?))
}

/// Nests `locations` (already sorted) under their parents. Locations whose
/// parent is unknown become roots.
pub fn build_tree(locations: Vec<Location>) -> Vec<LocationNode> {
    let ids: HashSet<String> = locations.iter().map(|l| l.id.clone()).collect();
    let mut by_parent: HashMap<Option<String>, Vec<Location>> = HashMap::new();
    for location in locations {
        let key = location.parent_id.clone().filter(|p| ids.contains(p));
        by_parent.entry(key).or_default().push(location);
    }
    attach(None, &mut by_parent)
}

fn attach(
    parent: Option<String>,
    by_parent: &mut HashMap<Option<String>, Vec<Location>>,
) -> Vec<LocationNode> {
    // Each parent is taken out once, so a corrupt cycle cannot recurse forever.
    let Some(locations) = by_parent.remove(&parent) else {
        return Vec::new();
    };
    locations
        .into_iter()
        .map(|location| {
            let children = attach(Some(location.id.clone()), by_parent);
            LocationNode { location, children }
        })
        .collect()
}

fn ensure_parent(db: &Database, parent: &str) -> Result<()> {
    match location_repo::find_by_id(db, parent)? {
        Some(_) => Ok(()),
        None => Err(MaintError::invalid(format!(
            "Parent location '{}' does not exist",
            parent
        ))),
    }
}
