use super::chain::MemoryChain;
use super::ranker::{RankConfig, RankPass, Ranker, ScoreTable};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("query node {0} does not exist")]
    UnknownQuery(usize),
}

/// Configuration for context assembly.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Most recent utterances always rendered verbatim, and excluded from
    /// the ranked candidate pool.
    pub short_term: usize,
    /// Distance metric shared by every pass.
    pub ranking: RankConfig,
    /// Coarse-to-fine refine pipeline; each pass ranks the survivors of
    /// the one before it.
    pub passes: Vec<RankPass>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            short_term: 10,
            ranking: RankConfig::default(),
            passes: vec![
                RankPass {
                    top_k: 600,
                    depth: 1,
                    recompute: true,
                },
                RankPass {
                    top_k: 150,
                    depth: 2,
                    recompute: false,
                },
                RankPass {
                    top_k: 42,
                    depth: 3,
                    recompute: false,
                },
            ],
        }
    }
}

/// Builds the linear context text for a generation call.
///
/// A first cheap pass narrows the whole chain by raw distance, then the
/// survivors are re-ranked with progressively deeper neighbor-aware keys.
/// Walking neighbors over the full chain up front would cost the same
/// deep scoring for thousands of nodes that the first pass discards.
pub struct ContextAssembler {
    config: AssemblerConfig,
}

impl ContextAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Renders the context for `query`: retrieved memories first (best
    /// match last), then the tail of `recent` verbatim.
    ///
    /// Retrieved nodes are paired back into conversation: a node spoken by
    /// someone other than the query speaker carries the line it was
    /// responding to, a node spoken by the query speaker carries the reply
    /// that followed it. Nodes at the chain ends render without the
    /// missing half.
    pub fn assemble(
        &self,
        chain: &MemoryChain,
        query: usize,
        recent: &[String],
    ) -> Result<String, AssembleError> {
        let query_node = chain.get(query).ok_or(AssembleError::UnknownQuery(query))?;
        let query_speaker = query_node.speaker_label().to_owned();

        // The short-term tail is rendered verbatim below; ranking it too
        // would duplicate those lines.
        let pool_end = chain.len().saturating_sub(self.config.short_term);
        let mut selected: Vec<usize> = (0..pool_end).collect();

        let ranker = Ranker::new(chain, self.config.ranking);
        let mut scores = ScoreTable::for_chain(chain);
        for pass in &self.config.passes {
            selected = ranker.rank(query_node.engram(), &selected, &mut scores, *pass);
        }
        debug!(
            query,
            pool = pool_end,
            retrieved = selected.len(),
            "assembling context"
        );

        // Best match last, adjacent to the live conversation.
        selected.reverse();

        let mut text = String::new();
        let mut push_line = |line: &str| {
            text.push_str(line);
            text.push('\n');
        };

        for &index in &selected {
            let node = match chain.get(index) {
                Some(node) => node,
                None => continue,
            };
            let spoken_by_query = node.text().starts_with(&query_speaker);
            if !spoken_by_query {
                if let Some(previous) = chain.previous_of(index) {
                    if let Some(prompt) = chain.get(previous) {
                        push_line(prompt.text());
                    }
                }
            }
            push_line(node.text());
            if spoken_by_query {
                if let Some(next) = chain.next_of(index) {
                    if let Some(reply) = chain.get(next) {
                        push_line(reply.text());
                    }
                }
            }
        }

        let tail_start = recent.len().saturating_sub(self.config.short_term);
        for line in &recent[tail_start..] {
            push_line(line);
        }

        Ok(text)
    }
}
