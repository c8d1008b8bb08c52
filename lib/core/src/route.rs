//! Two-step route search
//!
//! A route leads from the query to a candidate target through a labelled item
//! that is semantically close to the query (hop 1), one of its explicit
//! relations (hop 2, free), and optionally an allowed item close to that
//! relation (hop 3).

use crate::distance::DistanceIndex;
use crate::item::{IdSet, Item};
use crate::pool::ItemPool;
use crate::scoring::{score_routes, ScoringMode, TargetAggregate};
use crate::Result;
use tracing::debug;

/// One evidentiary path from the query to a target
#[derive(Debug, Clone, Copy)]
pub struct Route<'a> {
    pub target: &'a Item,
    /// Labelled item close to the query
    pub similar: &'a Item,
    /// Item explicitly related to `similar`
    pub related: &'a Item,
    /// Hop 1 distance, plus the hop 3 distance when there is one
    pub distance: f64,
}

impl Route<'_> {
    /// Similarity of the route mapped to [0, 1]
    #[inline]
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance / 2.0
    }
}

/// Search bounds and scoring mode of an inference call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceConfig {
    /// How many labelled neighbours of the query to route through.
    /// `None` or `Some(0)` means all of them.
    pub max_similar: Option<usize>,
    /// How many allowed neighbours of each related item to add.
    /// `None` or `Some(0)` means all of them.
    pub max_related: Option<usize>,
    pub mode: ScoringMode,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_similar: Some(5),
            max_related: Some(10),
            mode: ScoringMode::AStar,
        }
    }
}

impl InferenceConfig {
    #[must_use]
    pub fn new(max_similar: Option<usize>, max_related: Option<usize>, mode: ScoringMode) -> Self {
        Self {
            max_similar,
            max_related,
            mode,
        }
    }
}

#[inline]
fn bounded<I: Iterator>(rows: I, limit: Option<usize>) -> std::iter::Take<I> {
    rows.take(limit.filter(|&n| n > 0).unwrap_or(usize::MAX))
}

/// Walks labelled neighbours of a query and their relations
pub struct RouteFinder<'p, 'a> {
    pool: &'p ItemPool<'a>,
    distances: &'p DistanceIndex,
}

impl<'p, 'a> RouteFinder<'p, 'a> {
    pub fn new(pool: &'p ItemPool<'a>, distances: &'p DistanceIndex) -> Self {
        Self { pool, distances }
    }

    /// Collect every route from `query` to an allowed target, in traversal order
    pub fn find_routes(
        &self,
        query: &Item,
        allowed_target_ids: &IdSet,
        relation_type: &str,
        max_similar: Option<usize>,
        max_related: Option<usize>,
    ) -> Result<Vec<Route<'a>>> {
        let mut routes = Vec::new();
        if allowed_target_ids.is_empty() {
            return Ok(routes);
        }

        let labelled = self.pool.labelled_ids(relation_type);
        let similar = bounded(
            self.distances
                .neighbours(&query.id)?
                .iter()
                .filter(|n| labelled.contains(&n.id)),
            max_similar,
        );

        for hop1 in similar {
            let Some(si) = self.pool.get(&hop1.id) else {
                continue;
            };

            for ri_id in si.related(relation_type) {
                let Some(ri) = self.pool.get(ri_id) else {
                    continue;
                };

                if allowed_target_ids.contains(&ri.id) {
                    routes.push(Route {
                        target: ri,
                        similar: si,
                        related: ri,
                        distance: hop1.distance,
                    });
                }

                let near_related = bounded(
                    self.distances
                        .neighbours(&ri.id)?
                        .iter()
                        .filter(|n| allowed_target_ids.contains(&n.id)),
                    max_related,
                );
                for hop3 in near_related {
                    let Some(ti) = self.pool.get(&hop3.id) else {
                        continue;
                    };
                    routes.push(Route {
                        target: ti,
                        similar: si,
                        related: ri,
                        distance: hop1.distance + hop3.distance,
                    });
                }
            }
        }

        Ok(routes)
    }
}

/// Rank allowed targets for `query` by the routes leading to them.
///
/// Only `query.id` is read from the query; it must be present in `distances`.
/// Items referenced by relation labels but missing from `pool` are
/// unreachable and skipped.
pub fn infer<'a>(
    config: &InferenceConfig,
    query: &Item,
    pool: &ItemPool<'a>,
    distances: &DistanceIndex,
    allowed_target_ids: &IdSet,
    relation_type: &str,
) -> Result<Vec<TargetAggregate<'a>>> {
    let routes = RouteFinder::new(pool, distances).find_routes(
        query,
        allowed_target_ids,
        relation_type,
        config.max_similar,
        config.max_related,
    )?;
    debug!(
        "Query {}: {} routes over relation {:?}",
        query.id,
        routes.len(),
        relation_type
    );

    let ranked = score_routes(routes, config.mode)?;
    debug!("Query {}: {} targets ranked", query.id, ranked.len());
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::distances_semantic;
    use crate::item::ItemId;
    use crate::Vector;

    fn ids(values: &[i64]) -> IdSet {
        values.iter().map(|&v| ItemId::Integer(v)).collect()
    }

    // Q=1, S=2 (relates to 3 and 9, 9 is not in the corpus), R=3, T=4
    fn corpus() -> Vec<Item> {
        vec![
            Item::new(1, Vector::new(vec![1.0, 0.0, 0.0])),
            Item::new(2, Vector::new(vec![0.6, 0.8, 0.0])).with_relation("rel", [3i64, 9]),
            Item::new(3, Vector::new(vec![0.0, 0.0, 1.0])),
            Item::new(4, Vector::new(vec![0.0, 0.6, 0.8])),
        ]
    }

    #[test]
    fn test_direct_and_third_hop_routes() {
        let items = corpus();
        let index = distances_semantic(&items).unwrap();
        let pool = ItemPool::excluding(&items, &ItemId::Integer(1));
        let finder = RouteFinder::new(&pool, &index);

        let routes = finder
            .find_routes(&items[0], &ids(&[3, 4]), "rel", None, None)
            .unwrap();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].target.id, ItemId::Integer(3));
        assert_eq!(routes[0].similar.id, ItemId::Integer(2));
        assert_eq!(routes[0].related.id, ItemId::Integer(3));
        assert!((routes[0].distance - 0.4).abs() < 1e-12);

        assert_eq!(routes[1].target.id, ItemId::Integer(4));
        assert_eq!(routes[1].related.id, ItemId::Integer(3));
        assert!((routes[1].distance - (0.4 + 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_max_related_truncates_third_hop() {
        let mut items = corpus();
        items.push(Item::new(5, Vector::new(vec![0.0, 0.8, 0.6])));
        let index = distances_semantic(&items).unwrap();
        let pool = ItemPool::excluding(&items, &ItemId::Integer(1));
        let finder = RouteFinder::new(&pool, &index);

        let all = finder
            .find_routes(&items[0], &ids(&[4, 5]), "rel", Some(1), Some(0))
            .unwrap();
        assert_eq!(all.len(), 2);

        let one = finder
            .find_routes(&items[0], &ids(&[4, 5]), "rel", Some(1), Some(1))
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].target.id, ItemId::Integer(4));
    }

    #[test]
    fn test_max_similar_keeps_nearest_labelled_items() {
        // Q=1 with two labelled neighbours: 2 at 0.2 relates to 5, 3 at 0.4 relates to 6
        let items = vec![
            Item::new(1, Vector::new(vec![1.0, 0.0, 0.0])),
            Item::new(2, Vector::new(vec![0.8, 0.6, 0.0])).with_relation("rel", [5i64]),
            Item::new(3, Vector::new(vec![0.6, 0.8, 0.0])).with_relation("rel", [6i64]),
            Item::new(5, Vector::new(vec![0.0, 0.0, 1.0])),
            Item::new(6, Vector::new(vec![0.0, 1.0, 0.0])),
        ];
        let index = distances_semantic(&items).unwrap();
        let pool = ItemPool::excluding(&items, &ItemId::Integer(1));
        let finder = RouteFinder::new(&pool, &index);
        let allowed = ids(&[5, 6]);

        let nearest = finder
            .find_routes(&items[0], &allowed, "rel", Some(1), None)
            .unwrap();
        assert_eq!(nearest.len(), 2);
        assert!(nearest.iter().all(|r| r.similar.id == ItemId::Integer(2)));

        let summary = |limit: Option<usize>| {
            finder
                .find_routes(&items[0], &allowed, "rel", limit, None)
                .unwrap()
                .iter()
                .map(|r| (r.target.id.clone(), r.similar.id.clone(), r.related.id.clone(), r.distance))
                .collect::<Vec<_>>()
        };
        let unbounded = summary(None);
        assert_eq!(unbounded.len(), 4);
        assert_eq!(unbounded[2].1, ItemId::Integer(3));
        assert_eq!(summary(Some(0)), unbounded);
        assert_eq!(summary(Some(2)), unbounded);
    }

    #[test]
    fn test_query_outside_pool_is_not_routed_through() {
        let mut items = corpus();
        // The query itself is labelled, but it is excluded from the pool
        items[0] = items[0].clone().with_relation("rel", [4i64]);
        let index = distances_semantic(&items).unwrap();
        let pool = ItemPool::excluding(&items, &ItemId::Integer(1));

        let routes = RouteFinder::new(&pool, &index)
            .find_routes(&items[0], &ids(&[1, 3]), "rel", None, Some(1))
            .unwrap();
        assert!(routes.iter().all(|r| r.similar.id == ItemId::Integer(2)));
        assert!(routes.iter().all(|r| r.target.id != ItemId::Integer(1)));
    }

    #[test]
    fn test_empty_allowed_targets() {
        let items = corpus();
        let index = distances_semantic(&items).unwrap();
        let pool = ItemPool::excluding(&items, &ItemId::Integer(1));
        let ranked = infer(
            &InferenceConfig::default(),
            &items[0],
            &pool,
            &index,
            &IdSet::default(),
            "rel",
        )
        .unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_unindexed_query() {
        let items = corpus();
        let index = distances_semantic(&items).unwrap();
        let pool = ItemPool::new(&items);
        let stranger = Item::new(42, Vector::new(vec![1.0, 0.0, 0.0]));
        let err = infer(
            &InferenceConfig::default(),
            &stranger,
            &pool,
            &index,
            &ids(&[3]),
            "rel",
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::MissingDistances(_)));
    }
}
