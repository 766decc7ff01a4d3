use serde::{Deserialize, Serialize};

/// Stable handle for a resource on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

/// A fixed amount of value sitting on one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resource {
    amount: i64,
}

impl Resource {
    pub fn new(amount: i64) -> Self {
        Self { amount }
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }
}

/// Slot registry of the resources still on the grid.
///
/// Ids are never reused within a run, so a stale `ResourceId` can only miss.
#[derive(Clone, Debug, Default)]
pub struct ResourceRegistry {
    slots: Vec<Option<Resource>>,
    live: usize,
    total: i64,
}

impl ResourceRegistry {
    pub fn insert(&mut self, resource: Resource) -> ResourceId {
        let id = ResourceId(self.slots.len() as u32);
        self.total += resource.amount();
        self.live += 1;
        self.slots.push(Some(resource));
        id
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Remove a resource and return it, or `None` if it was already collected.
    pub fn remove(&mut self, id: ResourceId) -> Option<Resource> {
        let taken = self.slots.get_mut(id.0 as usize)?.take()?;
        self.total -= taken.amount();
        self.live -= 1;
        Some(taken)
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Sum of the amounts of all resources still on the grid.
    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Resource)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|r| (ResourceId(idx as u32), r)))
    }
}
