use serde::{Deserialize, Serialize};

/// Sentinel link value meaning "no such neighbor".
pub const NO_LINK: i32 = -1;

/// A fixed-length activation fingerprint for one utterance.
pub type Engram = Vec<f32>;

/// A single utterance in the memory chain.
///
/// `next` and `previous` are indices into the chain's storage array, or
/// [`NO_LINK`]. This is the schema the persistent store writes; ranking
/// scores never live here (see `ranker::ScoreTable`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    text: String,
    engram: Engram,
    next: i32,
    previous: i32,
}

impl MemoryNode {
    /// Creates an unlinked node; the chain wires the links on append.
    pub fn new(text: String, engram: Engram) -> Self {
        Self {
            text,
            engram,
            next: NO_LINK,
            previous: NO_LINK,
        }
    }

    /// Creates a node with explicit links, for rebuilding a loaded chain.
    pub fn with_links(text: String, engram: Engram, previous: i32, next: i32) -> Self {
        Self {
            text,
            engram,
            next,
            previous,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn engram(&self) -> &[f32] {
        &self.engram
    }

    pub fn next(&self) -> i32 {
        self.next
    }

    pub fn previous(&self) -> i32 {
        self.previous
    }

    /// Forward link as an index, `None` at the tail.
    pub fn next_index(&self) -> Option<usize> {
        (self.next != NO_LINK).then(|| self.next as usize)
    }

    /// Backward link as an index, `None` at the head.
    pub fn previous_index(&self) -> Option<usize> {
        (self.previous != NO_LINK).then(|| self.previous as usize)
    }

    /// The speaker label: everything through the first `:`, or the whole
    /// text when no label is present.
    pub fn speaker_label(&self) -> &str {
        match self.text.find(':') {
            Some(pos) => &self.text[..=pos],
            None => &self.text,
        }
    }

    pub(crate) fn set_next(&mut self, next: i32) {
        self.next = next;
    }

    pub(crate) fn set_previous(&mut self, previous: i32) {
        self.previous = previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = MemoryNode::new("A: hello".into(), vec![0.5, 0.5]);
        assert_eq!(node.text(), "A: hello");
        assert_eq!(node.engram(), &[0.5, 0.5]);
        assert_eq!(node.next(), NO_LINK);
        assert_eq!(node.previous(), NO_LINK);
        assert!(node.next_index().is_none());
        assert!(node.previous_index().is_none());
    }

    #[test]
    fn test_link_indices() {
        let node = MemoryNode::with_links("B: hi".into(), vec![0.0], 3, 5);
        assert_eq!(node.previous_index(), Some(3));
        assert_eq!(node.next_index(), Some(5));
    }

    #[test]
    fn test_speaker_label() {
        let node = MemoryNode::new("JULIET: wherefore".into(), vec![0.0]);
        assert_eq!(node.speaker_label(), "JULIET:");

        let unlabeled = MemoryNode::new("stage direction".into(), vec![0.0]);
        assert_eq!(unlabeled.speaker_label(), "stage direction");
    }
}
