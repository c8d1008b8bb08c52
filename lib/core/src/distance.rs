//! Pairwise cosine distance index
//!
//! For every item the index holds the ascending list of cosine distances to
//! every other item of the corpus. The index is built once per item set and
//! kept beside the items, which stay immutable.

use crate::item::{Item, ItemId};
use crate::vector::Vector;
use crate::{Error, Result};
use ahash::{AHashMap, AHashSet};
use tracing::info;

/// Distance from an indexed item to another item
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbour {
    pub distance: f64,
    pub id: ItemId,
}

/// Item id -> ascending distance ranking over all other items
#[derive(Debug, Clone, Default)]
pub struct DistanceIndex {
    rankings: AHashMap<ItemId, Vec<Neighbour>>,
}

impl DistanceIndex {
    /// Compute the full cosine distance matrix and sort each row.
    ///
    /// Every embedding must be non-empty and share the first item's
    /// dimension, and ids must be unique.
    pub fn build(items: &[Item]) -> Result<Self> {
        info!("Calculating cosine distances for {} items", items.len());

        let expected = items.first().map(|item| item.embedding.dim()).unwrap_or(0);
        let mut normalized: Vec<Vector> = Vec::with_capacity(items.len());
        let mut seen = AHashSet::with_capacity(items.len());
        for item in items {
            if item.embedding.is_empty() {
                return Err(Error::EmptyEmbedding(item.id.to_string()));
            }
            if item.embedding.dim() != expected {
                return Err(Error::InvalidDimension {
                    id: item.id.to_string(),
                    expected,
                    actual: item.embedding.dim(),
                });
            }
            if !seen.insert(&item.id) {
                return Err(Error::DuplicateItem(item.id.to_string()));
            }
            normalized.push(item.embedding.normalized());
        }

        let mut rankings = AHashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut row: Vec<Neighbour> = items
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, other)| Neighbour {
                    distance: normalized[i].unit_cosine_distance(&normalized[j]),
                    id: other.id.clone(),
                })
                .collect();

            // Stable: equal distances keep corpus order
            row.sort_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            rankings.insert(item.id.clone(), row);
        }

        Ok(Self { rankings })
    }

    /// Ascending distance ranking of `id` against every other item
    pub fn neighbours(&self, id: &ItemId) -> Result<&[Neighbour]> {
        self.rankings
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingDistances(id.to_string()))
    }

    #[inline]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.rankings.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rankings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }
}

/// Build the distance index for `items`
pub fn distances_semantic(items: &[Item]) -> Result<DistanceIndex> {
    DistanceIndex::build(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Item> {
        vec![
            Item::new(1, Vector::new(vec![1.0, 0.0])),
            Item::new(2, Vector::new(vec![0.0, 1.0])),
            Item::new(3, Vector::new(vec![1.0, 1.0])),
            Item::new(4, Vector::new(vec![-1.0, 0.0])),
        ]
    }

    #[test]
    fn test_rows_exclude_self_and_are_sorted() {
        let items = corpus();
        let index = distances_semantic(&items).unwrap();
        assert_eq!(index.len(), items.len());

        for item in &items {
            let row = index.neighbours(&item.id).unwrap();
            assert_eq!(row.len(), items.len() - 1);
            assert!(row.iter().all(|n| n.id != item.id));
            assert!(row.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }

    #[test]
    fn test_distance_values() {
        let items = corpus();
        let index = distances_semantic(&items).unwrap();
        let row = index.neighbours(&ItemId::Integer(1)).unwrap();

        assert_eq!(row[0].id, ItemId::Integer(3));
        assert!((row[0].distance - (1.0 - std::f64::consts::FRAC_1_SQRT_2)).abs() < 1e-12);
        assert_eq!(row[1].id, ItemId::Integer(2));
        assert!((row[1].distance - 1.0).abs() < 1e-12);
        assert_eq!(row[2].id, ItemId::Integer(4));
        assert!((row[2].distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_equal_distances_keep_corpus_order() {
        let items = vec![
            Item::new(1, Vector::new(vec![1.0, 0.0])),
            Item::new(2, Vector::new(vec![0.0, 1.0])),
            Item::new(3, Vector::new(vec![0.0, -1.0])),
        ];
        let index = distances_semantic(&items).unwrap();
        let row = index.neighbours(&ItemId::Integer(1)).unwrap();
        assert_eq!(row[0].id, ItemId::Integer(2));
        assert_eq!(row[1].id, ItemId::Integer(3));
    }

    #[test]
    fn test_dimension_mismatch() {
        let items = vec![
            Item::new(1, Vector::new(vec![1.0, 0.0])),
            Item::new(2, Vector::new(vec![1.0, 0.0, 0.0])),
        ];
        let err = distances_semantic(&items).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { expected: 2, actual: 3, .. }));
    }

    #[test]
    fn test_empty_embedding_and_duplicates() {
        let empty = vec![Item::new(1, Vector::new(vec![]))];
        assert!(matches!(
            distances_semantic(&empty).unwrap_err(),
            Error::EmptyEmbedding(_)
        ));

        let dup = vec![
            Item::new(1, Vector::new(vec![1.0])),
            Item::new(1, Vector::new(vec![2.0])),
        ];
        assert!(matches!(
            distances_semantic(&dup).unwrap_err(),
            Error::DuplicateItem(_)
        ));
    }

    #[test]
    fn test_missing_id() {
        let index = distances_semantic(&corpus()).unwrap();
        assert!(matches!(
            index.neighbours(&ItemId::Integer(99)),
            Err(Error::MissingDistances(_))
        ));
    }
}
