//! Route aggregation and scoring
//!
//! Routes are grouped per target and each group is reduced to a single score
//! by one of the scoring modes below. With `d = distance / 2` and `j` the
//! 1-based rank of a route within its target (shortest first):
//!
//! | mode | score | rescaled |
//! |------|-------|----------|
//! | `a`  | `1 - d` of the shortest route | no |
//! | `a*` | `1 - d` of the shortest route | yes |
//! | `b`  | `n - d` of the shortest route | yes |
//! | `c`  | `(1 - d) * n` of the shortest route | yes |
//! | `d`  | `Σ (1 - d)` | yes |
//! | `e`  | `(1 - d₁) + (1 - d₂) / 2` | yes |
//! | `f`  | `Σ (1 - d) / j` | yes |
//! | `g`  | `Σ (1 - d) / j²` | yes |
//! | `h`  | `Σ (1 - d) / j³` | yes |
//! | `i`  | `Σ (1 - d²)` | yes |
//! | `j`  | `Σ (1 - d³)` | yes |
//! | `k`  | `Σ (1 - d) / 2^j` | yes |
//! | `l`  | `Σ (1 - d) / (j (j + 1))`, halved | yes |
//! | `m`  | `Σ 1 / (d j³)` | yes |
//! | `n`  | `Σ 1 / d²` | yes |
//! | `o`  | `Σ 1 / (d j)` | yes |
//! | `p`  | `Σ 1 / (d j²)` | yes |
//! | `q`  | `Σ 1 / d` | yes |
//!
//! Rescaled modes are min-max fitted to [0, 1] across all targets of a call.

use crate::item::{Item, ItemId};
use crate::route::Route;
use crate::{Error, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Scoring formula applied to the routes of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoringMode {
    /// Shortest distance, raw
    #[serde(rename = "a")]
    A,
    /// Shortest distance, rescaled
    #[serde(rename = "a*")]
    AStar,
    /// Route count, then shortest distance
    #[serde(rename = "b")]
    B,
    /// Best similarity times route count
    #[serde(rename = "c")]
    C,
    /// Sum of similarities
    #[serde(rename = "d")]
    D,
    /// Best similarity plus half the second best
    #[serde(rename = "e")]
    E,
    /// Similarity / rank
    #[serde(rename = "f")]
    F,
    /// Similarity / rank²
    #[serde(rename = "g")]
    G,
    /// Similarity / rank³
    #[serde(rename = "h")]
    H,
    /// Sum of 1 - d²
    #[serde(rename = "i")]
    I,
    /// Sum of 1 - d³
    #[serde(rename = "j")]
    J,
    /// Geometric series weights
    #[serde(rename = "k")]
    K,
    /// Telescoping series weights
    #[serde(rename = "l")]
    L,
    /// 1 / (d · rank³)
    #[serde(rename = "m")]
    M,
    /// 1 / d²
    #[serde(rename = "n")]
    N,
    /// 1 / (d · rank)
    #[serde(rename = "o")]
    O,
    /// 1 / (d · rank²)
    #[serde(rename = "p")]
    P,
    /// 1 / d
    #[serde(rename = "q")]
    Q,
}

impl ScoringMode {
    pub const ALL: [ScoringMode; 18] = [
        ScoringMode::A,
        ScoringMode::AStar,
        ScoringMode::B,
        ScoringMode::C,
        ScoringMode::D,
        ScoringMode::E,
        ScoringMode::F,
        ScoringMode::G,
        ScoringMode::H,
        ScoringMode::I,
        ScoringMode::J,
        ScoringMode::K,
        ScoringMode::L,
        ScoringMode::M,
        ScoringMode::N,
        ScoringMode::O,
        ScoringMode::P,
        ScoringMode::Q,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::A => "a",
            ScoringMode::AStar => "a*",
            ScoringMode::B => "b",
            ScoringMode::C => "c",
            ScoringMode::D => "d",
            ScoringMode::E => "e",
            ScoringMode::F => "f",
            ScoringMode::G => "g",
            ScoringMode::H => "h",
            ScoringMode::I => "i",
            ScoringMode::J => "j",
            ScoringMode::K => "k",
            ScoringMode::L => "l",
            ScoringMode::M => "m",
            ScoringMode::N => "n",
            ScoringMode::O => "o",
            ScoringMode::P => "p",
            ScoringMode::Q => "q",
        }
    }

    /// Whether scores of this mode are min-max fitted after scoring.
    /// Mode `a` keeps raw similarities so it can be compared with `a*`.
    #[inline]
    pub fn is_rescaled(&self) -> bool {
        !matches!(self, ScoringMode::A)
    }

    /// Score of one target before rescaling.
    ///
    /// `routes` must be non-empty and sorted by ascending distance.
    pub fn raw_score(&self, routes: &[Route<'_>]) -> Result<f64> {
        let Some(best) = routes.first() else {
            return Ok(0.0);
        };
        let n = routes.len() as f64;
        let d = best.distance / 2.0;

        // (j, d_i, sim_i) with j the 1-based rank
        let ranked = || {
            routes.iter().enumerate().map(|(i, r)| {
                let d = r.distance / 2.0;
                ((i + 1) as f64, d, 1.0 - d)
            })
        };

        let score = match self {
            ScoringMode::A | ScoringMode::AStar => 1.0 - d,
            ScoringMode::B => n - d,
            ScoringMode::C => (1.0 - d) * n,
            ScoringMode::D => ranked().fold(0.0, |s, (_, _, sim)| s + sim),
            ScoringMode::E => {
                let mut s = 1.0 - d;
                if let Some(second) = routes.get(1) {
                    s += (1.0 - second.distance / 2.0) / 2.0;
                }
                s
            }
            ScoringMode::F => ranked().fold(0.0, |s, (j, _, sim)| s + sim / j),
            ScoringMode::G => ranked().fold(0.0, |s, (j, _, sim)| s + sim / (j * j)),
            ScoringMode::H => ranked().fold(0.0, |s, (j, _, sim)| s + sim / (j * j * j)),
            ScoringMode::I => ranked().fold(0.0, |s, (_, d, _)| s + (1.0 - d * d)),
            ScoringMode::J => ranked().fold(0.0, |s, (_, d, _)| s + (1.0 - d * d * d)),
            ScoringMode::K => {
                let mut s = 0.0;
                let mut den = 2.0;
                for (_, _, sim) in ranked() {
                    s += sim / den;
                    den *= 2.0;
                }
                s
            }
            ScoringMode::L => ranked().fold(0.0, |s, (j, _, sim)| s + sim / (j * (j + 1.0))) / 2.0,
            ScoringMode::M => self.reciprocal_sum(routes, |d, j| d * j * j * j)?,
            ScoringMode::N => self.reciprocal_sum(routes, |d, _| d * d)?,
            ScoringMode::O => self.reciprocal_sum(routes, |d, j| d * j)?,
            ScoringMode::P => self.reciprocal_sum(routes, |d, j| d * j * j)?,
            ScoringMode::Q => self.reciprocal_sum(routes, |d, _| d)?,
        };
        Ok(score)
    }

    /// `Σ 1 / den(d_i, j)`, refusing zero-distance routes
    fn reciprocal_sum(&self, routes: &[Route<'_>], den: impl Fn(f64, f64) -> f64) -> Result<f64> {
        let mut s = 0.0;
        for (i, route) in routes.iter().enumerate() {
            let d = route.distance / 2.0;
            if d == 0.0 {
                return Err(Error::ZeroDistance {
                    mode: self.to_string(),
                    target: route.target.id.to_string(),
                });
            }
            s += 1.0 / den(d, (i + 1) as f64);
        }
        Ok(s)
    }
}

impl std::fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim();
        ScoringMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == tag)
            .ok_or_else(|| Error::UnknownScoringMode(s.to_string()))
    }
}

/// All routes found towards one target, with its final score
#[derive(Debug, Clone)]
pub struct TargetAggregate<'a> {
    pub target_id: ItemId,
    /// Ascending by distance
    pub routes: Vec<Route<'a>>,
    /// Distance of the shortest route
    pub distance: f64,
    pub score: f64,
}

impl<'a> TargetAggregate<'a> {
    /// The target item, borrowed from the shortest route
    #[inline]
    pub fn target(&self) -> &'a Item {
        self.routes[0].target
    }
}

/// Fit scores to [0, 1] by min-max.
///
/// A range too small to divide by is treated as 1, so identical scores all
/// map to 0.
pub fn min_max_rescale(scores: &mut [f64]) {
    let Some(first) = scores.first().copied() else {
        return;
    };
    let (min, max) = scores
        .iter()
        .fold((first, first), |(lo, hi), &s| (lo.min(s), hi.max(s)));

    let mut range = max - min;
    if range < 10.0 * f64::EPSILON {
        range = 1.0;
    }
    let scale = 1.0 / range;
    let offset = -min * scale;
    for s in scores.iter_mut() {
        *s = *s * scale + offset;
    }
}

/// Group routes by target, score every target with `mode` and return the
/// targets by descending score. Ties keep the order in which targets were
/// first reached.
pub fn score_routes<'a>(routes: Vec<Route<'a>>, mode: ScoringMode) -> Result<Vec<TargetAggregate<'a>>> {
    let mut slots: AHashMap<&'a ItemId, usize> = AHashMap::new();
    let mut groups: Vec<Vec<Route<'a>>> = Vec::new();
    for route in routes {
        let slot = *slots.entry(&route.target.id).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(route);
    }

    let mut targets = Vec::with_capacity(groups.len());
    for mut group in groups {
        group.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        let score = mode.raw_score(&group)?;
        targets.push(TargetAggregate {
            target_id: group[0].target.id.clone(),
            distance: group[0].distance,
            routes: group,
            score,
        });
    }

    if mode.is_rescaled() {
        let mut scores: Vec<f64> = targets.iter().map(|t| t.score).collect();
        min_max_rescale(&mut scores);
        for (target, score) in targets.iter_mut().zip(scores) {
            target.score = score;
        }
    }

    targets.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vector;

    fn item(id: i64) -> Item {
        Item::new(id, Vector::new(vec![1.0]))
    }

    fn routes<'a>(via: &'a Item, hops: &[(&'a Item, f64)]) -> Vec<Route<'a>> {
        hops.iter()
            .map(|&(target, distance)| Route {
                target,
                similar: via,
                related: via,
                distance,
            })
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_parse_modes() {
        for mode in ScoringMode::ALL {
            assert_eq!(mode.as_str().parse::<ScoringMode>().unwrap(), mode);
        }
        assert_eq!("a*".parse::<ScoringMode>().unwrap(), ScoringMode::AStar);
        assert!(matches!(
            "z".parse::<ScoringMode>(),
            Err(Error::UnknownScoringMode(_))
        ));
        assert!("A".parse::<ScoringMode>().is_err());
    }

    #[test]
    fn test_only_mode_a_is_raw() {
        let raw: Vec<_> = ScoringMode::ALL.iter().filter(|m| !m.is_rescaled()).collect();
        assert_eq!(raw, vec![&ScoringMode::A]);
    }

    #[test]
    fn test_raw_scores_two_routes() {
        let via = item(0);
        let t = item(1);
        // d = 0.1 and 0.3
        let group = routes(&via, &[(&t, 0.2), (&t, 0.6)]);

        let expect = [
            (ScoringMode::A, 0.9),
            (ScoringMode::AStar, 0.9),
            (ScoringMode::B, 1.9),
            (ScoringMode::C, 1.8),
            (ScoringMode::D, 0.9 + 0.7),
            (ScoringMode::E, 0.9 + 0.35),
            (ScoringMode::F, 0.9 + 0.7 / 2.0),
            (ScoringMode::G, 0.9 + 0.7 / 4.0),
            (ScoringMode::H, 0.9 + 0.7 / 8.0),
            (ScoringMode::I, (1.0 - 0.01) + (1.0 - 0.09)),
            (ScoringMode::J, (1.0 - 0.001) + (1.0 - 0.027)),
            (ScoringMode::K, 0.9 / 2.0 + 0.7 / 4.0),
            (ScoringMode::L, (0.9 / 2.0 + 0.7 / 6.0) / 2.0),
            (ScoringMode::M, 1.0 / 0.1 + 1.0 / (0.3 * 8.0)),
            (ScoringMode::N, 1.0 / 0.01 + 1.0 / 0.09),
            (ScoringMode::O, 1.0 / 0.1 + 1.0 / 0.6),
            (ScoringMode::P, 1.0 / 0.1 + 1.0 / 1.2),
            (ScoringMode::Q, 1.0 / 0.1 + 1.0 / 0.3),
        ];
        for (mode, expected) in expect {
            let got = mode.raw_score(&group).unwrap();
            assert!(
                (got - expected).abs() < 1e-9,
                "mode {}: expected {}, got {}",
                mode,
                expected,
                got
            );
        }
    }

    #[test]
    fn test_single_route_reduces_to_first_term() {
        let via = item(0);
        let t = item(1);
        let group = routes(&via, &[(&t, 0.4)]);
        let sim = 0.8;

        assert!(close(ScoringMode::E.raw_score(&group).unwrap(), sim));
        assert!(close(ScoringMode::F.raw_score(&group).unwrap(), sim));
        assert!(close(ScoringMode::G.raw_score(&group).unwrap(), sim));
        assert!(close(ScoringMode::H.raw_score(&group).unwrap(), sim));
        assert!(close(ScoringMode::K.raw_score(&group).unwrap(), sim / 2.0));
        assert!(close(ScoringMode::L.raw_score(&group).unwrap(), sim / 4.0));
    }

    #[test]
    fn test_zero_distance_reciprocal_modes() {
        let via = item(0);
        let t = item(1);
        let group = routes(&via, &[(&t, 0.0)]);
        for mode in [ScoringMode::M, ScoringMode::N, ScoringMode::O, ScoringMode::P, ScoringMode::Q] {
            assert!(matches!(mode.raw_score(&group), Err(Error::ZeroDistance { .. })));
        }
        assert!(close(ScoringMode::D.raw_score(&group).unwrap(), 1.0));
    }

    #[test]
    fn test_grouping_and_ordering() {
        let via = item(0);
        let (t1, t2, t3) = (item(1), item(2), item(3));
        let all = routes(
            &via,
            &[(&t2, 0.8), (&t1, 0.6), (&t2, 0.2), (&t3, 1.0), (&t1, 0.4)],
        );

        let ranked = score_routes(all, ScoringMode::A).unwrap();
        assert_eq!(ranked.len(), 3);

        let order: Vec<_> = ranked.iter().map(|t| t.target_id.clone()).collect();
        assert_eq!(order, vec![ItemId::Integer(2), ItemId::Integer(1), ItemId::Integer(3)]);

        for target in &ranked {
            assert!(target.routes.iter().all(|r| r.target.id == target.target_id));
            assert!(target.routes.windows(2).all(|w| w[0].distance <= w[1].distance));
            assert_eq!(target.distance, target.routes[0].distance);
        }
        assert_eq!(ranked[0].routes.len(), 2);
        assert!(close(ranked[0].score, 0.9));
    }

    #[test]
    fn test_a_star_is_rescaled_a() {
        let via = item(0);
        let (t1, t2, t3) = (item(1), item(2), item(3));
        let hops = [(&t1, 0.6), (&t2, 0.2), (&t3, 1.0)];

        let raw = score_routes(routes(&via, &hops), ScoringMode::A).unwrap();
        let fitted = score_routes(routes(&via, &hops), ScoringMode::AStar).unwrap();

        let raw_order: Vec<_> = raw.iter().map(|t| t.target_id.clone()).collect();
        let fitted_order: Vec<_> = fitted.iter().map(|t| t.target_id.clone()).collect();
        assert_eq!(raw_order, fitted_order);

        assert!(close(raw[0].score, 0.9));
        assert!(close(fitted[0].score, 1.0));
        assert!(close(fitted[1].score, 0.5));
        assert!(close(fitted[2].score, 0.0));
    }

    #[test]
    fn test_degenerate_rescale_is_zero() {
        let mut one = [0.42];
        min_max_rescale(&mut one);
        assert_eq!(one, [0.0]);

        let mut same = [3.0, 3.0, 3.0];
        min_max_rescale(&mut same);
        assert_eq!(same, [0.0, 0.0, 0.0]);

        let mut empty: [f64; 0] = [];
        min_max_rescale(&mut empty);
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let via = item(0);
        let (t1, t2) = (item(1), item(2));
        let ranked = score_routes(routes(&via, &[(&t2, 0.5), (&t1, 0.5)]), ScoringMode::D).unwrap();
        assert_eq!(ranked[0].target_id, ItemId::Integer(2));
        assert_eq!(ranked[1].target_id, ItemId::Integer(1));
    }
}
