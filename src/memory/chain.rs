use super::node::{Engram, MemoryNode, NO_LINK};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("engram dimension mismatch: chain holds {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("engrams must not be empty")]
    EmptyEngram,
    #[error("node {index} has a broken {direction} link to {target}")]
    BrokenLink {
        index: usize,
        direction: &'static str,
        target: i32,
    },
    #[error("chain is not a single linear sequence")]
    NotLinear,
}

/// Chronological, append-only arena of memory nodes.
///
/// Indices are stable for the life of the chain. Links always form one
/// acyclic line: exactly one head (`previous == NO_LINK`) and one tail
/// (`next == NO_LINK`) unless the chain is empty. The engram dimension is
/// fixed by the first append and every later append is checked against it.
#[derive(Debug, Clone, Default)]
pub struct MemoryChain {
    nodes: Vec<MemoryNode>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Rebuilds a chain from stored nodes, validating every link invariant.
    ///
    /// Rejects snapshots whose links do not form a single reciprocal line
    /// or whose engram dimensions disagree.
    pub fn from_nodes(nodes: Vec<MemoryNode>) -> Result<Self, ChainError> {
        let chain = Self { nodes };
        chain.validate()?;
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Engram dimension, fixed by the first appended node.
    pub fn dimension(&self) -> Option<usize> {
        self.nodes.first().map(|n| n.engram().len())
    }

    pub fn get(&self, index: usize) -> Option<&MemoryNode> {
        self.nodes.get(index)
    }

    /// All nodes in chronological (index) order.
    pub fn nodes(&self) -> &[MemoryNode] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryNode> {
        self.nodes.iter()
    }

    /// Oldest node index.
    pub fn head(&self) -> Option<usize> {
        (!self.nodes.is_empty()).then_some(0)
    }

    /// Newest node index.
    pub fn tail(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    pub fn previous_of(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|n| n.previous_index())
    }

    pub fn next_of(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|n| n.next_index())
    }

    /// Appends a node, linking it to the current tail.
    ///
    /// The new node becomes the tail; the old tail's `next` is rewired to
    /// it. Callers never observe a half-linked tail: the node is fully
    /// wired before the method returns.
    pub fn append(&mut self, text: String, engram: Engram) -> Result<usize, ChainError> {
        if engram.is_empty() {
            return Err(ChainError::EmptyEngram);
        }
        if let Some(expected) = self.dimension() {
            if engram.len() != expected {
                return Err(ChainError::DimensionMismatch {
                    expected,
                    got: engram.len(),
                });
            }
        }

        let index = self.nodes.len();
        let mut node = MemoryNode::new(text, engram);
        if let Some(tail) = self.tail() {
            node.set_previous(tail as i32);
            self.nodes[tail].set_next(index as i32);
        }
        self.nodes.push(node);
        debug!(index, len = self.nodes.len(), "appended memory node");
        Ok(index)
    }

    fn validate(&self) -> Result<(), ChainError> {
        let len = self.nodes.len();
        if len == 0 {
            return Ok(());
        }

        if let Some(expected) = self.dimension() {
            for (index, node) in self.nodes.iter().enumerate() {
                if node.engram().is_empty() {
                    return Err(ChainError::EmptyEngram);
                }
                if node.engram().len() != expected {
                    return Err(ChainError::DimensionMismatch {
                        expected,
                        got: self.nodes[index].engram().len(),
                    });
                }
            }
        }

        let mut heads = 0;
        let mut tails = 0;
        for (index, node) in self.nodes.iter().enumerate() {
            match node.previous_index() {
                None => heads += 1,
                Some(p) => {
                    let ok = self
                        .nodes
                        .get(p)
                        .map_or(false, |prev| prev.next_index() == Some(index));
                    if !ok {
                        return Err(ChainError::BrokenLink {
                            index,
                            direction: "previous",
                            target: node.previous(),
                        });
                    }
                }
            }
            match node.next_index() {
                None => tails += 1,
                Some(n) => {
                    let ok = self
                        .nodes
                        .get(n)
                        .map_or(false, |next| next.previous_index() == Some(index));
                    if !ok {
                        return Err(ChainError::BrokenLink {
                            index,
                            direction: "next",
                            target: node.next(),
                        });
                    }
                }
            }
        }
        if heads != 1 || tails != 1 {
            return Err(ChainError::NotLinear);
        }

        // Reciprocal links plus a single head still admit disjoint cycles;
        // a full walk from the head must reach every node.
        let head = self
            .nodes
            .iter()
            .position(|n| n.previous() == NO_LINK)
            .ok_or(ChainError::NotLinear)?;
        let mut visited = 0;
        let mut cursor = Some(head);
        while let Some(index) = cursor {
            visited += 1;
            if visited > len {
                return Err(ChainError::NotLinear);
            }
            cursor = self.next_of(index);
        }
        if visited != len {
            return Err(ChainError::NotLinear);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_chain(count: usize) -> MemoryChain {
        let mut chain = MemoryChain::new();
        for i in 0..count {
            chain
                .append(format!("A: line {i}"), vec![i as f32, i as f32])
                .unwrap();
        }
        chain
    }

    #[test]
    fn test_append_links_tail() {
        let chain = build_chain(3);
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.head(), Some(0));
        assert_eq!(chain.tail(), Some(2));

        assert_eq!(chain.get(0).unwrap().previous(), NO_LINK);
        assert_eq!(chain.next_of(0), Some(1));
        assert_eq!(chain.previous_of(1), Some(0));
        assert_eq!(chain.next_of(1), Some(2));
        assert_eq!(chain.get(2).unwrap().next(), NO_LINK);
    }

    #[test]
    fn test_forward_and_reverse_traversal() {
        let chain = build_chain(5);

        let mut forward = Vec::new();
        let mut cursor = chain.head();
        while let Some(i) = cursor {
            forward.push(i);
            cursor = chain.next_of(i);
        }
        assert_eq!(forward, vec![0, 1, 2, 3, 4]);

        let mut backward = Vec::new();
        let mut cursor = chain.tail();
        while let Some(i) = cursor {
            backward.push(i);
            cursor = chain.previous_of(i);
        }
        backward.reverse();
        assert_eq!(backward, forward);
    }

    #[test]
    fn test_dimension_enforced_at_append() {
        let mut chain = build_chain(1);
        let err = chain.append("A: bad".into(), vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            ChainError::DimensionMismatch { expected: 2, got: 3 }
        ));
        assert_eq!(chain.len(), 1, "failed append must not change the chain");
    }

    #[test]
    fn test_empty_engram_rejected() {
        let mut chain = MemoryChain::new();
        assert!(matches!(
            chain.append("A: void".into(), vec![]),
            Err(ChainError::EmptyEngram)
        ));
    }

    #[test]
    fn test_from_nodes_roundtrip() {
        let chain = build_chain(4);
        let rebuilt = MemoryChain::from_nodes(chain.nodes().to_vec()).unwrap();
        assert_eq!(rebuilt.len(), 4);
        assert_eq!(rebuilt.tail(), Some(3));
    }

    #[test]
    fn test_from_nodes_rejects_broken_backlink() {
        let nodes = vec![
            MemoryNode::with_links("A: a".into(), vec![0.0], NO_LINK, 1),
            // claims previous = 0 is fine, but next points nowhere valid
            MemoryNode::with_links("B: b".into(), vec![0.0], 0, 5),
        ];
        assert!(matches!(
            MemoryChain::from_nodes(nodes),
            Err(ChainError::BrokenLink { .. })
        ));
    }

    #[test]
    fn test_from_nodes_rejects_two_heads() {
        let nodes = vec![
            MemoryNode::with_links("A: a".into(), vec![0.0], NO_LINK, NO_LINK),
            MemoryNode::with_links("B: b".into(), vec![0.0], NO_LINK, NO_LINK),
        ];
        assert!(matches!(
            MemoryChain::from_nodes(nodes),
            Err(ChainError::NotLinear)
        ));
    }

    #[test]
    fn test_from_nodes_rejects_mixed_dimensions() {
        let nodes = vec![
            MemoryNode::with_links("A: a".into(), vec![0.0, 1.0], NO_LINK, 1),
            MemoryNode::with_links("B: b".into(), vec![0.0], 0, NO_LINK),
        ];
        assert!(matches!(
            MemoryChain::from_nodes(nodes),
            Err(ChainError::DimensionMismatch { .. })
        ));
    }
}
