use std::collections::BTreeSet;

use crate::document::{AudioSegment, Edge, GraphDocument};

/// Visibility and highlight state at one point of the speech timeline.
///
/// Everything is derived from `(document, time, is_playing)`; nothing is
/// cached, so callers can rebuild one per frame.
#[derive(Debug, Clone, Copy)]
pub struct AudioSync<'a> {
    document: &'a GraphDocument,
    time: f32,
    is_playing: bool,
}

impl<'a> AudioSync<'a> {
    pub fn new(document: &'a GraphDocument, time: f32, is_playing: bool) -> Self {
        Self {
            document,
            time,
            is_playing,
        }
    }

    /// List position of the first segment containing the current time.
    /// Overlapping segments resolve to the earliest one.
    pub fn current_position(&self) -> Option<usize> {
        if !self.is_playing {
            return None;
        }
        self.document
            .audio_segments
            .iter()
            .position(|segment| segment.contains(self.time))
    }

    pub fn current_segment(&self) -> Option<&'a AudioSegment> {
        self.current_position()
            .map(|position| &self.document.audio_segments[position])
    }

    /// Stopped playback shows the whole map. While playing, a node stays
    /// visible once a segment has revealed it, including in the silence
    /// between two segments.
    pub fn visible_node_ids(&self) -> BTreeSet<&'a str> {
        if !self.is_playing {
            return self.document.node_ids().collect();
        }

        let segments = &self.document.audio_segments;
        match self.current_position() {
            Some(position) => union_shown(&segments[..=position]),
            None if self.time > 0.0 => {
                union_shown(segments.iter().filter(|s| s.end_time <= self.time))
            }
            None => BTreeSet::new(),
        }
    }

    pub fn highlighted_node_ids(&self) -> BTreeSet<&'a str> {
        self.current_segment()
            .map(|segment| segment.highlight_node_ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn highlighted_edge_ids(&self) -> BTreeSet<&'a str> {
        self.current_segment()
            .map(|segment| segment.highlight_edge_ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Edges whose endpoints are both visible, in document order.
    pub fn drawable_edges(&self) -> Vec<&'a Edge> {
        let visible = self.visible_node_ids();
        drawable_edges(self.document, &visible)
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            visible_node_ids: owned(self.visible_node_ids()),
            highlighted_node_ids: owned(self.highlighted_node_ids()),
            highlighted_edge_ids: owned(self.highlighted_edge_ids()),
            segment_index: self.current_segment().map(|segment| segment.index),
        }
    }
}

fn owned(ids: BTreeSet<&str>) -> BTreeSet<String> {
    ids.into_iter().map(str::to_string).collect()
}

fn union_shown<'a>(segments: impl IntoIterator<Item = &'a AudioSegment>) -> BTreeSet<&'a str> {
    segments
        .into_iter()
        .flat_map(|segment| segment.show_node_ids.iter().map(String::as_str))
        .collect()
}

pub fn drawable_edges<'a>(document: &'a GraphDocument, visible: &BTreeSet<&str>) -> Vec<&'a Edge> {
    document
        .edges
        .iter()
        .filter(|edge| visible.contains(edge.from.as_str()) && visible.contains(edge.to.as_str()))
        .collect()
}

/// Owned copy of one [`AudioSync`] query, handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub visible_node_ids: BTreeSet<String>,
    pub highlighted_node_ids: BTreeSet<String>,
    pub highlighted_edge_ids: BTreeSet<String>,
    pub segment_index: Option<usize>,
}

impl SyncSnapshot {
    pub fn is_visible(&self, node_id: &str) -> bool {
        self.visible_node_ids.contains(node_id)
    }

    pub fn is_node_highlighted(&self, node_id: &str) -> bool {
        self.highlighted_node_ids.contains(node_id)
    }

    pub fn is_edge_highlighted(&self, edge_id: &str) -> bool {
        self.highlighted_edge_ids.contains(edge_id)
    }

    pub fn is_edge_drawable(&self, edge: &Edge) -> bool {
        self.is_visible(&edge.from) && self.is_visible(&edge.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SegmentAction;
    use proptest::prelude::*;

    fn node_json(id: &str) -> String {
        format!(r#"{{"id": "{id}", "label": "{id}", "category": "Core"}}"#)
    }

    /// Document with nodes `ids`, edges A->B and A->C where present, and one
    /// segment per `(duration, shown ids)` entry.
    fn document(ids: &[&str], segments: &[(f32, &[&str])]) -> GraphDocument {
        let nodes: Vec<String> = ids.iter().map(|id| node_json(id)).collect();
        let segments: Vec<String> = segments
            .iter()
            .enumerate()
            .map(|(i, (duration, show))| {
                let show: Vec<String> = show.iter().map(|id| format!("\"{id}\"")).collect();
                format!(
                    r#"{{"segmentIndex": {i}, "spokenText": "s{i}", "estimatedDuration": {duration}, "showNodeIds": [{show}], "highlightNodeIds": [{show}], "highlightEdgeIds": ["A->B"]}}"#,
                    show = show.join(", ")
                )
            })
            .collect();
        let json = format!(
            r#"{{"visualization_type": "Concept Map", "main_concept": "Test", "nodes": [{}], "edges": [{{"from": "A", "to": "B"}}, {{"from": "A", "to": "C"}}], "audioSegments": [{}]}}"#,
            nodes.join(", "),
            segments.join(", ")
        );
        GraphDocument::try_decode(&json).expect("test document")
    }

    fn ids<'a>(items: &[&'a str]) -> BTreeSet<&'a str> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_static_mode_shows_everything() {
        let doc = document(&["A", "B", "C"], &[]);
        let sync = AudioSync::new(&doc, 3.0, false);

        assert_eq!(sync.visible_node_ids(), ids(&["A", "B", "C"]));
        assert_eq!(sync.drawable_edges().len(), 2);
        assert!(sync.current_segment().is_none());
        assert!(sync.highlighted_node_ids().is_empty());
    }

    #[test]
    fn test_reveal_holds_between_and_after_segments() {
        let doc = document(&["A", "B", "C"], &[(2.0, &["A"]), (3.0, &["B"])]);

        let at = |t| AudioSync::new(&doc, t, true).visible_node_ids();
        assert_eq!(at(1.0), ids(&["A"]));
        assert_eq!(at(4.0), ids(&["A", "B"]));
        assert_eq!(at(6.0), ids(&["A", "B"]), "past the end keeps the last reveal");

        let sync = AudioSync::new(&doc, 4.0, true);
        assert_eq!(sync.current_segment().map(|s| s.index), Some(1));
        assert_eq!(sync.highlighted_node_ids(), ids(&["B"]));
        assert_eq!(sync.drawable_edges().len(), 1, "only A->B has both ends visible");
    }

    #[test]
    fn test_gap_between_segments() {
        let mut doc = document(&["A", "B", "C"], &[(1.0, &["A"]), (1.0, &["B"])]);
        doc.audio_segments[1].start_time = 3.0;
        doc.audio_segments[1].end_time = 4.0;

        let sync = AudioSync::new(&doc, 2.0, true);
        assert!(sync.current_segment().is_none());
        assert_eq!(sync.visible_node_ids(), ids(&["A"]));
        assert!(sync.highlighted_edge_ids().is_empty());
    }

    #[test]
    fn test_playing_before_first_segment_is_empty() {
        let mut doc = document(&["A"], &[(1.0, &["A"])]);
        doc.audio_segments[0].start_time = 0.5;
        doc.audio_segments[0].end_time = 1.5;

        assert!(AudioSync::new(&doc, 0.0, true).visible_node_ids().is_empty());
        assert!(AudioSync::new(&doc, 0.2, true).visible_node_ids().is_empty());
    }

    #[test]
    fn test_overlapping_segments_first_match_wins() {
        let mut doc = document(&["A", "B", "C"], &[(2.0, &["A"]), (2.0, &["B"])]);
        doc.audio_segments[0].end_time = 5.0;
        doc.audio_segments[1].action = SegmentAction::Connect;

        let sync = AudioSync::new(&doc, 3.0, true);
        assert_eq!(sync.current_position(), Some(0));
        assert_eq!(sync.visible_node_ids(), ids(&["A"]));
    }

    #[test]
    fn test_boundary_time_belongs_to_earlier_segment() {
        let doc = document(&["A", "B"], &[(2.0, &["A"]), (3.0, &["B"])]);
        let snapshot = AudioSync::new(&doc, 2.0, true).snapshot();

        assert_eq!(snapshot.segment_index, Some(0));
        assert!(snapshot.is_visible("A"));
        assert!(!snapshot.is_visible("B"));
        assert!(snapshot.is_edge_highlighted("A->B"));
    }

    #[test]
    fn test_edges_to_unknown_nodes_are_not_drawable() {
        let doc = document(&["A", "B"], &[]);
        let sync = AudioSync::new(&doc, 0.0, false);
        let edges: Vec<&str> = sync.drawable_edges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edges, vec!["A->B"]);
    }

    proptest! {
        #[test]
        fn prop_visibility_is_monotonic(
            durations in prop::collection::vec(0.0f32..4.0, 1..6),
            t1 in 0.0f32..25.0,
            step in 0.001f32..10.0,
        ) {
            let names = ["A", "B", "C", "D", "E", "F"];
            let shows: Vec<[&str; 1]> = (0..durations.len()).map(|i| [names[i]]).collect();
            let segments: Vec<(f32, &[&str])> = durations
                .iter()
                .zip(shows.iter())
                .map(|(d, show)| (*d, &show[..]))
                .collect();
            let doc = document(&names, &segments);

            let early = AudioSync::new(&doc, t1, true).visible_node_ids();
            let late = AudioSync::new(&doc, t1 + step, true).visible_node_ids();
            prop_assert!(early.is_subset(&late), "{early:?} not within {late:?}");
        }

        #[test]
        fn prop_stopped_playback_shows_all_nodes(t in -10.0f32..100.0) {
            let doc = document(&["A", "B", "C"], &[(1.0, &["A"]), (1.0, &["B"])]);
            prop_assert_eq!(
                AudioSync::new(&doc, t, false).visible_node_ids(),
                ids(&["A", "B", "C"])
            );
        }
    }
}
