use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::visited::with_visited;
use super::{ProximityGraph, Scored};
use crate::index::SearchParams;

/// Best-first beam traversal.
///
/// Seeds are the entry point plus `num_seeds - 1` nodes strided evenly over
/// the id space. The beam keeps the best `max(itopk_size, k)` nodes seen;
/// traversal stops once the nearest unexpanded candidate cannot improve a full
/// beam, or after `max_expansions` nodes have been expanded.
///
/// Returns up to `k` nodes ascending by `(distance, id)`.
pub(crate) fn beam_search(g: &ProximityGraph, query: &[f32], k: usize, params: &SearchParams) -> Vec<Scored> {
    let n = g.len();
    if n == 0 || k == 0 {
        return Vec::new();
    }
    let width = params.itopk_size.max(k);
    with_visited(n, |visited| {
        let mut candidates: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(width);
        let mut beam: BinaryHeap<Scored> = BinaryHeap::with_capacity(width + 1);

        for seed in seeds(g, params.num_seeds) {
            if !visited.insert(seed) {
                continue;
            }
            let scored = Scored::new(seed, g.distance_to(query, seed));
            candidates.push(Reverse(scored));
            beam.push(scored);
            if beam.len() > width {
                beam.pop();
            }
        }

        let mut expansions = 0usize;
        while let Some(Reverse(current)) = candidates.pop() {
            if beam.len() >= width && beam.peek().is_some_and(|worst| current > *worst) {
                break;
            }
            if expansions >= params.max_expansions {
                break;
            }
            expansions += 1;

            for &neighbor in g.neighbors(current.id as usize) {
                let neighbor = neighbor as usize;
                if !visited.insert(neighbor) {
                    continue;
                }
                let scored = Scored::new(neighbor, g.distance_to(query, neighbor));
                let improves = beam.len() < width || beam.peek().is_some_and(|worst| scored < *worst);
                if improves {
                    candidates.push(Reverse(scored));
                    beam.push(scored);
                    if beam.len() > width {
                        beam.pop();
                    }
                }
            }
        }

        let mut out = beam.into_sorted_vec();
        out.truncate(k);
        out
    })
}

fn seeds(g: &ProximityGraph, num_seeds: usize) -> impl Iterator<Item = usize> {
    let n = g.len();
    let count = num_seeds.clamp(1, n);
    let stride = n / count;
    let entry = g.entry_point();
    std::iter::once(entry).chain((1..count).map(move |i| (entry + i * stride) % n))
}
