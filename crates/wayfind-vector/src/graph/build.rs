//! Graph construction.
//!
//! Phases, each parallel over nodes:
//! 1. wide candidate lists (`intermediate_graph_degree`): exact for small
//!    inputs, NN-descent above `exact_build_limit`
//! 2. diversity prune to `graph_degree`, backfilled with the nearest leftovers
//! 3. reverse-edge merge
//! 4. long-range edges: a quarter of each list goes to uniformly drawn nodes
//!
//! followed by entry-point selection and a connectivity pass.
//!
//! Pruned local edges alone keep tight clusters closed off from each other,
//! and a beam started in the wrong cluster never leaves it. The long-range
//! edges make every cluster a few hops from any other.
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{ProximityGraph, Scored};
use crate::index::GraphParams;

/// Neighbours-of-neighbours taken from each neighbour per NN-descent round.
const NEIGHBOR_FANOUT: usize = 8;
/// Random ids mixed into each node's pool per NN-descent round.
const RANDOM_PROBES: usize = 4;
/// RNG round reserved for drawing long-range edges.
const LONG_RANGE_ROUND: u64 = u64::MAX;

/// Build a graph over `data` (row-major, `dim` floats per row). Inputs are
/// assumed validated.
pub(crate) fn build_graph(dim: usize, data: Vec<f32>, params: &GraphParams) -> ProximityGraph {
    let n = if dim == 0 { 0 } else { data.len() / dim };
    if n == 0 {
        return ProximityGraph::empty(dim);
    }
    if n == 1 {
        return ProximityGraph::from_parts(dim, data, vec![Vec::new()], 0);
    }
    let staged = ProximityGraph::from_parts(dim, data, vec![Vec::new(); n], 0);

    let width = params.intermediate_graph_degree.min(n - 1);
    let degree = params.graph_degree.min(n - 1);
    let candidates = if n <= params.exact_build_limit {
        tracing::info!(nodes = n, width, "building exact candidate lists");
        exact_knn(&staged, width)
    } else {
        tracing::info!(nodes = n, width, iterations = params.nn_descent_iterations, "building candidate lists with NN-descent");
        nn_descent(&staged, width, params.nn_descent_iterations, params.seed)
    };

    tracing::info!(degree, "pruning candidate lists");
    let pruned: Vec<Vec<Scored>> = candidates
        .par_iter()
        .enumerate()
        .map(|(node, list)| prune(&staged, node, list, degree))
        .collect();
    let long_range = degree / 4;
    let mut adjacency = merge_reverse(&pruned, degree - long_range);
    add_long_range_edges(&mut adjacency, long_range, params.seed);

    let entry_point = nearest_to_centroid(&staged);
    let bridged = connect_components(&staged, &mut adjacency, entry_point);
    if bridged > 0 {
        tracing::debug!(bridged, "bridged unreachable components");
    }
    tracing::info!(nodes = n, entry_point, "graph built");

    let ProximityGraph { dim, data, .. } = staged;
    ProximityGraph::from_parts(dim, data, adjacency, entry_point as u32)
}

/// Brute-force `width` nearest neighbours of every node.
fn exact_knn(g: &ProximityGraph, width: usize) -> Vec<Vec<Scored>> {
    (0..g.len())
        .into_par_iter()
        .map(|node| {
            let mut all: Vec<Scored> = (0..g.len())
                .filter(|&other| other != node)
                .map(|other| Scored::new(other, g.distance_between(node, other)))
                .collect();
            if all.len() > width {
                all.select_nth_unstable(width);
                all.truncate(width);
            }
            all.sort_unstable();
            all
        })
        .collect()
}

fn node_rng(seed: u64, round: u64, node: usize) -> StdRng {
    let mix = (node as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ round.wrapping_mul(0xD1B5_4A32_D192_ED03);
    StdRng::seed_from_u64(seed ^ mix)
}

/// Approximate `width` nearest neighbours by iterated local joins.
///
/// Each node draws from its own seeded RNG, so the result does not depend on
/// how rayon schedules the work.
fn nn_descent(g: &ProximityGraph, width: usize, iterations: usize, seed: u64) -> Vec<Vec<Scored>> {
    let n = g.len();
    let mut lists: Vec<Vec<Scored>> = (0..n)
        .into_par_iter()
        .map(|node| {
            let mut rng = node_rng(seed, 0, node);
            let mut list: Vec<Scored> = sample(&mut rng, n - 1, width)
                .into_iter()
                .map(|pick| if pick >= node { pick + 1 } else { pick })
                .map(|other| Scored::new(other, g.distance_between(node, other)))
                .collect();
            list.sort_unstable();
            list
        })
        .collect();

    for round in 1..=iterations {
        let reverse = reverse_ids(&lists, width);
        let refined: Vec<(Vec<Scored>, usize)> = (0..n)
            .into_par_iter()
            .map(|node| {
                let mut rng = node_rng(seed, round as u64, node);
                let current = &lists[node];
                let mut pool: Vec<u32> = Vec::with_capacity(current.len() * (NEIGHBOR_FANOUT + 1) + RANDOM_PROBES);
                for neighbor in current {
                    pool.push(neighbor.id);
                    pool.extend(lists[neighbor.id as usize].iter().take(NEIGHBOR_FANOUT).map(|s| s.id));
                }
                pool.extend_from_slice(&reverse[node]);
                pool.extend((0..RANDOM_PROBES).map(|_| rng.gen_range(0..n) as u32));
                pool.sort_unstable();
                pool.dedup();

                let mut next: Vec<Scored> = pool
                    .into_iter()
                    .filter(|&other| other as usize != node)
                    .map(|other| Scored::new(other as usize, g.distance_between(node, other as usize)))
                    .collect();
                if next.len() > width {
                    next.select_nth_unstable(width);
                    next.truncate(width);
                }
                next.sort_unstable();
                let changed = next.iter().filter(|s| !current.iter().any(|c| c.id == s.id)).count();
                (next, changed)
            })
            .collect();

        let changed: usize = refined.iter().map(|(_, c)| c).sum();
        lists = refined.into_iter().map(|(list, _)| list).collect();
        tracing::debug!(round, changed, "nn-descent round");
        if changed == 0 {
            break;
        }
    }
    lists
}

/// Reverse neighbour ids, at most `cap` per node, in ascending source order.
fn reverse_ids(lists: &[Vec<Scored>], cap: usize) -> Vec<Vec<u32>> {
    let mut reverse = vec![Vec::new(); lists.len()];
    for (node, list) in lists.iter().enumerate() {
        for neighbor in list {
            let slot: &mut Vec<u32> = &mut reverse[neighbor.id as usize];
            if slot.len() < cap {
                slot.push(node as u32);
            }
        }
    }
    reverse
}

/// Keep a candidate only if no already-kept neighbour is closer to it than
/// `node` is; then backfill with the nearest unkept candidates. Returns the
/// kept edges nearest-first.
fn prune(g: &ProximityGraph, node: usize, candidates: &[Scored], degree: usize) -> Vec<Scored> {
    let mut kept: Vec<Scored> = Vec::with_capacity(degree);
    for candidate in candidates {
        if kept.len() >= degree {
            break;
        }
        if candidate.id as usize == node {
            continue;
        }
        let occluded = kept
            .iter()
            .any(|k| g.distance_between(k.id as usize, candidate.id as usize) < candidate.distance);
        if !occluded {
            kept.push(*candidate);
        }
    }
    for candidate in candidates {
        if kept.len() >= degree {
            break;
        }
        if candidate.id as usize != node && !kept.iter().any(|k| k.id == candidate.id) {
            kept.push(*candidate);
        }
    }
    kept.sort_unstable();
    kept
}

/// Nearer half of each forward list, then reverse edges nearest-first, then
/// the remaining forward edges, capped at `degree`.
fn merge_reverse(pruned: &[Vec<Scored>], degree: usize) -> Vec<Vec<u32>> {
    let mut reverse: Vec<Vec<Scored>> = vec![Vec::new(); pruned.len()];
    for (node, list) in pruned.iter().enumerate() {
        for edge in list {
            reverse[edge.id as usize].push(Scored::new(node, edge.distance));
        }
    }
    let keep_forward = degree.div_ceil(2);
    pruned
        .par_iter()
        .zip(reverse.par_iter_mut())
        .map(|(forward, incoming)| {
            incoming.sort_unstable();
            let mut out: Vec<u32> = Vec::with_capacity(degree);
            let (near, far) = forward.split_at(keep_forward.min(forward.len()));
            out.extend(near.iter().map(|s| s.id));
            for id in incoming.iter().map(|s| s.id).chain(far.iter().map(|s| s.id)) {
                if out.len() >= degree {
                    break;
                }
                if !out.contains(&id) {
                    out.push(id);
                }
            }
            out
        })
        .collect()
}

/// Append up to `count` distinct random nodes to every list.
fn add_long_range_edges(adjacency: &mut [Vec<u32>], count: usize, seed: u64) {
    let n = adjacency.len();
    if count == 0 || n < 2 {
        return;
    }
    adjacency.par_iter_mut().enumerate().for_each(|(node, list)| {
        let mut rng = node_rng(seed, LONG_RANGE_ROUND, node);
        // Drawing past the ids already taken guarantees `count` usable picks.
        let draws = (count + list.len() + 1).min(n);
        let picks: Vec<u32> = sample(&mut rng, n, draws)
            .into_iter()
            .map(|other| other as u32)
            .filter(|&other| other as usize != node && !list.contains(&other))
            .take(count)
            .collect();
        list.extend(picks);
    });
}

fn nearest_to_centroid(g: &ProximityGraph) -> usize {
    let dim = g.dim();
    let mut sum = vec![0f64; dim];
    for row in g.data().chunks_exact(dim) {
        for (acc, x) in sum.iter_mut().zip(row) {
            *acc += f64::from(*x);
        }
    }
    let centroid: Vec<f32> = sum.iter().map(|s| (s / g.len() as f64) as f32).collect();
    (0..g.len())
        .into_par_iter()
        .map(|id| Scored::new(id, g.distance_to(&centroid, id)))
        .min()
        .map_or(0, |s| s.id as usize)
}

/// Make every node reachable from `entry_point`: each unreached node is linked
/// both ways to its nearest reached node, then everything reachable from it is
/// marked. Returns the number of bridges added.
fn connect_components(g: &ProximityGraph, adjacency: &mut [Vec<u32>], entry_point: usize) -> usize {
    let n = adjacency.len();
    let mut reached = vec![false; n];
    mark_reachable(adjacency, entry_point, &mut reached);

    let mut bridges = 0;
    for node in 0..n {
        if reached[node] {
            continue;
        }
        let nearest = (0..n)
            .into_par_iter()
            .filter(|&other| reached[other])
            .map(|other| Scored::new(other, g.distance_between(node, other)))
            .min();
        let Some(anchor) = nearest else { continue };
        let anchor_id = anchor.id as usize;
        adjacency[anchor_id].push(node as u32);
        if !adjacency[node].contains(&anchor.id) {
            adjacency[node].push(anchor.id);
        }
        mark_reachable(adjacency, node, &mut reached);
        bridges += 1;
    }
    bridges
}

fn mark_reachable(adjacency: &[Vec<u32>], start: usize, reached: &mut [bool]) {
    let mut queue = VecDeque::from([start]);
    reached[start] = true;
    while let Some(node) = queue.pop_front() {
        for &next in &adjacency[node] {
            let next = next as usize;
            if !reached[next] {
                reached[next] = true;
                queue.push_back(next);
            }
        }
    }
}
