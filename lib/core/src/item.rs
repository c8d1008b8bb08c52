use crate::vector::Vector;
use crate::{Error, Result};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Set of item ids, used for allowed targets and label lookups
pub type IdSet = AHashSet<ItemId>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Integer(i64),
    String(String),
}

impl ItemId {
    /// Parse an id out of a JSON value. Only integers and strings are ids.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(ItemId::Integer),
            Value::String(s) => Some(ItemId::String(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Integer(i) => write!(f, "{}", i),
            ItemId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(i: i64) -> Self {
        ItemId::Integer(i)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId::String(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::String(s.to_string())
    }
}

/// An item of the corpus: an embedding, display metadata and labelled relations
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub embedding: Vector,
    pub name: String,
    pub description: String,
    /// Relation type name -> ordered target ids
    pub relations: AHashMap<String, Vec<ItemId>>,
}

/// Wire shape of an item. Every field other than the known ones is a
/// candidate relation field.
#[derive(Debug, Deserialize)]
struct RawItem {
    id: ItemId,
    embedding: Vector,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    fields: serde_json::Map<String, Value>,
}

impl Item {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ItemId>, embedding: Vector) -> Self {
        Self {
            id: id.into(),
            embedding,
            name: String::new(),
            description: String::new(),
            relations: AHashMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_relation<I>(mut self, relation_type: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ItemId>,
    {
        self.relations
            .insert(relation_type.into(), targets.into_iter().map(Into::into).collect());
        self
    }

    /// Build a typed item from one JSON object of the corpus.
    ///
    /// Any extra field holding an array made only of ids becomes a relation.
    /// Other extra fields (null, scalars, nested data) are not relations and
    /// are dropped.
    pub fn from_json(value: Value) -> Result<Self> {
        let raw: RawItem =
            serde_json::from_value(value).map_err(|e| Error::InvalidItem(e.to_string()))?;

        let mut relations = AHashMap::new();
        for (key, field) in raw.fields {
            if let Value::Array(values) = field {
                let ids: Option<Vec<ItemId>> = values.iter().map(ItemId::from_json).collect();
                if let Some(ids) = ids {
                    relations.insert(key, ids);
                }
            }
        }

        Ok(Self {
            id: raw.id,
            embedding: raw.embedding,
            name: raw.name,
            description: raw.description,
            relations,
        })
    }

    /// Targets labelled under `relation_type`, empty when there is no label
    #[inline]
    pub fn related(&self, relation_type: &str) -> &[ItemId] {
        self.relations
            .get(relation_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when the item carries at least one label of `relation_type`
    #[inline]
    pub fn is_labelled(&self, relation_type: &str) -> bool {
        !self.related(relation_type).is_empty()
    }

    /// Copy of this item with the `relation_type` labels emptied
    #[must_use]
    pub fn without_relation(&self, relation_type: &str) -> Self {
        let mut item = self.clone();
        item.relations.insert(relation_type.to_string(), Vec::new());
        item
    }
}

/// Items carrying non-empty labels for every relation type in `relation_types`
pub fn items_with_relations<'a>(items: &'a [Item], relation_types: &[&str]) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|item| relation_types.iter().all(|rt| item.is_labelled(rt)))
        .collect()
}
