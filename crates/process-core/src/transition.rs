//! Weighted successor selection with destination exclusion.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::NodeId;
use crate::rng::StreamRng;
use crate::SimError;

/// Draw the next node from `edges`, skipping `excluded` destinations.
///
/// Remaining weights are renormalized, so they need not have summed to 1.
/// Exactly one value is consumed from the stream per call, including when a
/// single candidate remains; constant draw consumption keeps replay stable.
/// An exclusion set as large as the edge set signals a topology/logic bug and
/// fails rather than being silently handled.
pub fn select(
    node: NodeId,
    edges: &BTreeMap<NodeId, f64>,
    excluded: &BTreeSet<NodeId>,
    rng: &mut StreamRng,
) -> Result<NodeId, SimError> {
    let unviable = || SimError::NoViableTransition {
        node,
        edges: edges.len(),
        excluded: excluded.len(),
    };

    if excluded.len() >= edges.len() {
        return Err(unviable());
    }

    let viable = edges
        .iter()
        .filter(|(destination, _)| !excluded.contains(destination))
        .map(|(destination, weight)| (*destination, *weight))
        .collect::<Vec<_>>();
    if viable.is_empty() {
        return Err(unviable());
    }

    let total: f64 = viable.iter().map(|(_, weight)| weight).sum();
    let draw = rng.next_unit() * total;

    let mut cumulative = 0.0;
    for &(destination, weight) in &viable {
        cumulative += weight;
        if draw < cumulative {
            return Ok(destination);
        }
    }
    // Floating-point tail: the draw landed on the upper boundary.
    Ok(viable[viable.len() - 1].0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(entries: &[(NodeId, f64)]) -> BTreeMap<NodeId, f64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn single_destination_is_deterministic_but_consumes_a_draw() {
        let mut rng = StreamRng::new(5);
        let before = rng.clone();
        let chosen = select(0, &edges(&[(3, 1.0)]), &BTreeSet::new(), &mut rng).expect("select");
        assert_eq!(chosen, 3);
        assert_ne!(rng, before);
    }

    #[test]
    fn excluded_destinations_are_never_drawn() {
        let mut rng = StreamRng::new(11);
        let excluded = BTreeSet::from([2]);
        for _ in 0..200 {
            let chosen = select(0, &edges(&[(1, 0.5), (2, 0.4), (3, 0.1)]), &excluded, &mut rng)
                .expect("select");
            assert_ne!(chosen, 2);
        }
    }

    #[test]
    fn exclusion_covering_all_destinations_fails() {
        let mut rng = StreamRng::new(1);
        let all = BTreeSet::from([1, 2]);
        let err = select(9, &edges(&[(1, 0.5), (2, 0.5)]), &all, &mut rng).unwrap_err();
        assert_eq!(
            err,
            SimError::NoViableTransition {
                node: 9,
                edges: 2,
                excluded: 2
            }
        );
    }

    #[test]
    fn oversized_exclusion_set_fails_even_with_unrelated_members() {
        let mut rng = StreamRng::new(1);
        let excluded = BTreeSet::from([7, 8]);
        assert!(select(0, &edges(&[(1, 1.0)]), &excluded, &mut rng).is_err());
    }

    #[test]
    fn empty_edge_set_fails() {
        let mut rng = StreamRng::new(1);
        assert!(select(4, &BTreeMap::new(), &BTreeSet::new(), &mut rng).is_err());
    }

    #[test]
    fn frequencies_converge_to_renormalized_weights() {
        // Weights 3:1 after excluding the 6.0 edge => expect 75% / 25%.
        let mut rng = StreamRng::new(20_240_601);
        let excluded = BTreeSet::from([0]);
        let table = edges(&[(0, 6.0), (1, 3.0), (2, 1.0)]);
        let draws = 20_000;
        let mut hits = [0_u32; 3];
        for _ in 0..draws {
            let chosen = select(5, &table, &excluded, &mut rng).expect("select");
            hits[chosen] += 1;
        }
        assert_eq!(hits[0], 0);
        let share = f64::from(hits[1]) / f64::from(draws);
        // Binomial std-dev at p=0.75, n=20k is ~0.3%; allow 5 sigma.
        assert!((share - 0.75).abs() < 0.016, "share was {share}");
    }
}
