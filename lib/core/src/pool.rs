// Candidate pool lookups shared by the route search
use crate::item::{IdSet, Item, ItemId};
use ahash::AHashMap;

/// A borrowed view over the items a query may route through.
///
/// Lookup by id returns the first item registered under that id.
#[derive(Debug, Clone, Default)]
pub struct ItemPool<'a> {
    items: Vec<&'a Item>,
    index: AHashMap<&'a ItemId, usize>,
}

impl<'a> ItemPool<'a> {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a Item>,
    {
        let items: Vec<&'a Item> = items.into_iter().collect();
        let mut index = AHashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            index.entry(&item.id).or_insert(i);
        }
        Self { items, index }
    }

    /// Pool of every item except the one with id `excluded`
    pub fn excluding(items: &'a [Item], excluded: &ItemId) -> Self {
        Self::new(items.iter().filter(|item| &item.id != excluded))
    }

    #[inline]
    pub fn get(&self, id: &ItemId) -> Option<&'a Item> {
        self.index.get(id).map(|&i| self.items[i])
    }

    #[inline]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.index.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Item> + '_ {
        self.items.iter().copied()
    }

    /// Ids of the pool items labelled under `relation_type`
    pub fn labelled_ids(&self, relation_type: &str) -> IdSet {
        self.items
            .iter()
            .filter(|item| item.is_labelled(relation_type))
            .map(|item| item.id.clone())
            .collect()
    }
}
