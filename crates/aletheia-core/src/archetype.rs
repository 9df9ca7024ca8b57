//! Archetype — named template fixing which traits a belief may carry (§4.4).

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::ids::{ArchetypeId, TraittypeId};
use crate::subject::Subject;

/// The resolved default for one trait slot in an archetype's template.
/// String-typed defaults that name an archetype stay as that archetype
/// (marker); defaults that name a shared prototype become that prototype's
/// subject. Resolved once, at registration time (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TraitDefault {
    Archetype(ArchetypeId),
    Prototype(Subject),
}

/// Named template: bases plus the set of traits beliefs bearing this
/// archetype are permitted to carry, each with an optional resolved default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archetype {
    pub id: ArchetypeId,
    pub label: String,
    pub bases: Vec<ArchetypeId>,
    pub trait_template: HashMap<TraittypeId, Option<TraitDefault>>,
}

impl Archetype {
    pub fn permits(&self, traittype: TraittypeId) -> bool {
        self.trait_template.contains_key(&traittype)
    }
}

/// Breadth-first walk of `start` then each base's archetypes, deduplicated.
/// Stops descending once an archetype has already been visited — mirrors
/// `Belief::get_archetypes`, which performs the identical walk starting from
/// a belief's own archetype bases (§4.6).
pub fn archetype_chain(
    archetypes: &HashMap<ArchetypeId, Archetype>,
    start: ArchetypeId,
) -> Vec<ArchetypeId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);
    visited.insert(start);

    while let Some(id) = queue.pop_front() {
        order.push(id);
        if let Some(archetype) = archetypes.get(&id) {
            for base in &archetype.bases {
                if visited.insert(*base) {
                    queue.push_back(*base);
                }
            }
        }
    }
    order
}

/// Same walk starting from several roots at once (a belief typically has
/// more than one archetype base).
pub fn archetype_chain_multi(
    archetypes: &HashMap<ArchetypeId, Archetype>,
    starts: impl IntoIterator<Item = ArchetypeId>,
) -> Vec<ArchetypeId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    for start in starts {
        if visited.insert(start) {
            queue.push_back(start);
        }
    }

    while let Some(id) = queue.pop_front() {
        order.push(id);
        if let Some(archetype) = archetypes.get(&id) {
            for base in &archetype.bases {
                if visited.insert(*base) {
                    queue.push_back(*base);
                }
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archetype(id: u64, bases: Vec<u64>) -> Archetype {
        Archetype {
            id: ArchetypeId(id),
            label: format!("archetype-{id}"),
            bases: bases.into_iter().map(ArchetypeId).collect(),
            trait_template: HashMap::new(),
        }
    }

    #[test]
    fn diamond_bases_deduplicate() {
        let mut map = HashMap::new();
        map.insert(ArchetypeId(1), archetype(1, vec![]));
        map.insert(ArchetypeId(2), archetype(2, vec![1]));
        map.insert(ArchetypeId(3), archetype(3, vec![1]));
        map.insert(ArchetypeId(4), archetype(4, vec![2, 3]));

        let chain = archetype_chain(&map, ArchetypeId(4));
        assert_eq!(chain.len(), 4);
        assert_eq!(chain[0], ArchetypeId(4));
        assert!(chain.contains(&ArchetypeId(1)));
    }
}
