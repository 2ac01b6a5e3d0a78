//! Scripted reveal schedules: word-by-word typing of the answer and
//! node-then-edge growth of the map. Only the timing plan lives here; the
//! tutor app runs it on a cancellable task.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::document::{DocumentError, GraphDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealTimings {
    pub word_delay_ms: u64,
    /// Extra pause after `.`, `!` or `?`.
    pub sentence_pause_ms: u64,
    /// Extra pause after `,` or `;`.
    pub clause_pause_ms: u64,
    pub node_step_ms: u64,
    pub edge_step_ms: u64,
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            word_delay_ms: 250,
            sentence_pause_ms: 150,
            clause_pause_ms: 80,
            node_step_ms: 400,
            edge_step_ms: 300,
        }
    }
}

impl RevealTimings {
    /// Pause after typing `word`.
    pub fn word_delay(&self, word: &str) -> Duration {
        let extra = match word.chars().last() {
            Some('.' | '!' | '?') => self.sentence_pause_ms,
            Some(',' | ';') => self.clause_pause_ms,
            _ => 0,
        };
        Duration::from_millis(self.word_delay_ms + extra)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingStep {
    /// Text typed so far, this word included.
    pub typed: String,
    /// Wait after publishing `typed`.
    pub delay: Duration,
}

pub fn typing_steps(answer: &str, timings: &RevealTimings) -> Vec<TypingStep> {
    let mut typed = String::with_capacity(answer.len());
    answer
        .split(' ')
        .enumerate()
        .map(|(i, word)| {
            if i > 0 {
                typed.push(' ');
            }
            typed.push_str(word);
            TypingStep {
                typed: typed.clone(),
                delay: timings.word_delay(word),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStep {
    /// Wait before publishing `json`.
    pub delay: Duration,
    pub json: String,
}

/// One step per node, then one per edge. Every partial graph keeps the full
/// metadata and audio segments. A graph without nodes still gets one
/// immediate step so it replaces whatever was shown before.
pub fn graph_steps(
    document: &GraphDocument,
    timings: &RevealTimings,
) -> Result<Vec<GraphStep>, DocumentError> {
    let mut partial = GraphDocument {
        nodes: Vec::with_capacity(document.nodes.len()),
        edges: Vec::with_capacity(document.edges.len()),
        ..document.clone()
    };
    let mut steps = Vec::with_capacity(document.nodes.len() + document.edges.len() + 1);
    if document.nodes.is_empty() {
        steps.push(GraphStep {
            delay: Duration::ZERO,
            json: partial.to_json()?,
        });
    }

    for node in &document.nodes {
        let delay = if steps.is_empty() {
            Duration::ZERO
        } else {
            Duration::from_millis(timings.node_step_ms)
        };
        partial.nodes.push(node.clone());
        steps.push(GraphStep {
            delay,
            json: partial.to_json()?,
        });
    }

    for edge in &document.edges {
        partial.edges.push(edge.clone());
        steps.push(GraphStep {
            delay: Duration::from_millis(timings.edge_step_ms),
            json: partial.to_json()?,
        });
    }

    Ok(steps)
}
