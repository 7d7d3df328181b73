use super::chain::MemoryChain;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::trace;

/// Penalty applied once when a candidate cannot supply a full neighbor
/// walk. Large enough to sink boundary nodes below any real distance
/// without excluding them from selection outright.
pub const UNLINKED_PENALTY: f32 = 100_000.0;

/// Distance metric parameters.
#[derive(Debug, Clone, Copy)]
pub struct RankConfig {
    /// Rescales element deltas into a convenient numeric range.
    pub factor: f32,
    /// Keeps every element's square root strictly positive.
    pub epsilon: f32,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            factor: 1000.0,
            epsilon: 1e-6,
        }
    }
}

/// One stage of a refine pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RankPass {
    /// Number of candidates to keep.
    pub top_k: usize,
    /// Neighbor hops per side folded into the ranking key.
    pub depth: usize,
    /// Recompute candidate distances, or trust the score table as-is.
    pub recompute: bool,
}

/// Elementwise distance between two engrams.
///
/// Strictly positive: `distance(a, a)` is `len * sqrt(epsilon)`, never
/// exactly zero. Both engrams must share one dimension, which the chain
/// guarantees for anything it stores.
pub fn distance(a: &[f32], b: &[f32], config: &RankConfig) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "engram dimensions must match");
    a.iter()
        .zip(b)
        .map(|(x, y)| ((x - y).abs() / config.factor + config.epsilon).sqrt())
        .sum()
}

/// Per-node scratch scores for one ranking pipeline.
///
/// Indexed by node handle and shared across the passes of a pipeline so
/// later, deeper passes can reuse distances the first pass computed.
#[derive(Debug)]
pub struct ScoreTable {
    distances: Vec<f32>,
}

impl ScoreTable {
    pub fn for_chain(chain: &MemoryChain) -> Self {
        Self {
            distances: vec![0.0; chain.len()],
        }
    }

    pub fn get(&self, index: usize) -> f32 {
        self.distances.get(index).copied().unwrap_or(0.0)
    }

    fn set(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.distances.get_mut(index) {
            *slot = value;
        }
    }
}

// Max-heap entry so the heap root is always the current worst keeper.
struct Keyed {
    key: f32,
    index: usize,
}

impl PartialEq for Keyed {
    fn eq(&self, other: &Self) -> bool {
        self.key.total_cmp(&other.key) == Ordering::Equal
    }
}

impl Eq for Keyed {}

impl PartialOrd for Keyed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyed {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key)
    }
}

/// Ranks chain nodes against a query engram.
pub struct Ranker<'a> {
    chain: &'a MemoryChain,
    config: RankConfig,
}

impl<'a> Ranker<'a> {
    pub fn new(chain: &'a MemoryChain, config: RankConfig) -> Self {
        Self { chain, config }
    }

    /// Returns the `min(top_k, candidates.len())` candidates with the
    /// smallest ranking key, ascending.
    ///
    /// Partial selection through a bounded heap: the candidate set is
    /// typically far larger than `top_k`, so a full sort is wasted work.
    pub fn rank(
        &self,
        query: &[f32],
        candidates: &[usize],
        scores: &mut ScoreTable,
        pass: RankPass,
    ) -> Vec<usize> {
        if pass.recompute {
            for &index in candidates {
                if let Some(node) = self.chain.get(index) {
                    scores.set(index, distance(node.engram(), query, &self.config));
                }
            }
        }

        if pass.top_k == 0 {
            return Vec::new();
        }

        let mut heap: BinaryHeap<Keyed> = BinaryHeap::with_capacity(pass.top_k + 1);
        for &index in candidates {
            let key = self.key_for(index, scores, pass.depth);
            heap.push(Keyed { key, index });
            if heap.len() > pass.top_k {
                heap.pop();
            }
        }

        let selected: Vec<usize> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|k| k.index)
            .collect();
        trace!(
            candidates = candidates.len(),
            selected = selected.len(),
            depth = pass.depth,
            "ranking pass complete"
        );
        selected
    }

    /// Ranking key: the node's own distance, plus at `depth > 1` the
    /// distances of up to `depth - 1` neighbors per side with weight
    /// `1 / (2k)` for the k-th hop. A walk that runs off either end of
    /// the chain takes [`UNLINKED_PENALTY`] once and stops.
    fn key_for(&self, index: usize, scores: &ScoreTable, depth: usize) -> f32 {
        let own = scores.get(index);
        if depth <= 1 {
            return own;
        }

        let mut total = own;
        let mut up = index;
        let mut down = index;
        for step in 0..depth - 1 {
            match (self.chain.previous_of(up), self.chain.next_of(down)) {
                (Some(previous), Some(next)) => {
                    let fade = 2.0 * (step as f32 + 1.0);
                    total += scores.get(previous) / fade + scores.get(next) / fade;
                    up = previous;
                    down = next;
                }
                _ => {
                    total += UNLINKED_PENALTY;
                    break;
                }
            }
        }
        total
    }
}
