use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

pub type NodeId = String;
pub type EdgeId = String;

/// Wire form of [`GraphDocument::fallback`], handed out whenever no usable
/// concept map can be recovered from a model response.
pub const DEFAULT_GRAPH_JSON: &str = r#"{
  "visualization_type": "Concept Map",
  "main_concept": "Loading...",
  "nodes": [
    {"id": "A", "label": "Concept", "category": "Core"}
  ],
  "edges": [],
  "audioSegments": [
    {
      "segmentIndex": 0,
      "spokenText": "Loading concept map...",
      "estimatedDuration": 2.0,
      "highlightNodeIds": ["A"],
      "showNodeIds": ["A"],
      "highlightEdgeIds": [],
      "action": "introduce"
    }
  ]
}"#;

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error("graph JSON could not be decoded: {0}")]
    Json(#[from] serde_json::Error),
}

/// Treat an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ------------------------------------------------------------------
// Nodes and edges
// ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    /// Only drives the fill colour; unknown categories fall back to grey.
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: EdgeId,
}

impl Edge {
    pub fn synthesized_id(from: &str, to: &str) -> EdgeId {
        format!("{from}->{to}")
    }
}

// ------------------------------------------------------------------
// Audio segments
// ------------------------------------------------------------------

/// What a segment does to the map while it is spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SegmentAction {
    #[default]
    Introduce,
    Expand,
    Connect,
}

impl From<String> for SegmentAction {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "expand" => Self::Expand,
            "connect" => Self::Connect,
            _ => Self::Introduce,
        }
    }
}

impl From<SegmentAction> for String {
    fn from(action: SegmentAction) -> Self {
        match action {
            SegmentAction::Introduce => "introduce",
            SegmentAction::Expand => "expand",
            SegmentAction::Connect => "connect",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    #[serde(rename = "segmentIndex", default, deserialize_with = "null_as_default")]
    pub index: usize,
    #[serde(rename = "spokenText", default, deserialize_with = "null_as_default")]
    pub spoken_text: String,
    #[serde(
        rename = "estimatedDuration",
        default,
        deserialize_with = "null_as_default"
    )]
    pub estimated_duration: f32,
    #[serde(
        rename = "highlightNodeIds",
        alias = "highlightNodeId",
        default,
        deserialize_with = "null_as_default"
    )]
    pub highlight_node_ids: Vec<NodeId>,
    #[serde(rename = "showNodeIds", default, deserialize_with = "null_as_default")]
    pub show_node_ids: Vec<NodeId>,
    #[serde(
        rename = "highlightEdgeIds",
        default,
        deserialize_with = "null_as_default"
    )]
    pub highlight_edge_ids: Vec<EdgeId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: SegmentAction,
    #[serde(rename = "startTime", default, deserialize_with = "null_as_default")]
    pub start_time: f32,
    #[serde(rename = "endTime", default, deserialize_with = "null_as_default")]
    pub end_time: f32,
}

impl AudioSegment {
    /// Duration used for timeline derivation; garbage estimates count as zero.
    pub fn duration(&self) -> f32 {
        if self.estimated_duration.is_finite() && self.estimated_duration > 0.0 {
            self.estimated_duration
        } else {
            0.0
        }
    }

    pub fn has_explicit_times(&self) -> bool {
        !(self.start_time == 0.0 && self.end_time == 0.0)
    }

    pub fn contains(&self, time: f32) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

/// Fill in start/end times for every segment whose times are both zero.
///
/// A segment's start is the sum of the durations of all segments before it,
/// its end is start + duration. Segments with explicit times are left alone,
/// so running this twice is a no-op.
pub fn normalize_segment_times(segments: &mut [AudioSegment]) {
    let mut elapsed = 0.0_f32;
    for segment in segments.iter_mut() {
        let duration = segment.duration();
        if !segment.has_explicit_times() {
            segment.start_time = elapsed;
            segment.end_time = elapsed + duration;
        }
        elapsed += duration;
    }
}

// ------------------------------------------------------------------
// Document
// ------------------------------------------------------------------

/// A decoded concept map. Built once per distinct model response and never
/// mutated afterwards; derived UI state (positions, camera) lives elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub visualization_type: String,
    pub main_concept: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(
        rename = "audioSegments",
        default,
        deserialize_with = "null_as_default"
    )]
    pub audio_segments: Vec<AudioSegment>,
}

impl GraphDocument {
    /// Decode and normalize, reporting why decoding failed.
    pub fn try_decode(json: &str) -> Result<Self, DocumentError> {
        let mut document: Self = serde_json::from_str(json)?;
        document.normalize();
        Ok(document)
    }

    /// Decode and normalize; any failure yields [`GraphDocument::fallback`].
    pub fn decode(json: &str) -> Self {
        match Self::try_decode(json) {
            Ok(document) => {
                debug!(
                    nodes = document.nodes.len(),
                    edges = document.edges.len(),
                    segments = document.audio_segments.len(),
                    "decoded concept map"
                );
                document
            }
            Err(e) => {
                warn!("falling back to placeholder concept map: {e}");
                Self::fallback()
            }
        }
    }

    /// Single placeholder node with one short "loading" segment.
    pub fn fallback() -> Self {
        let mut document = Self {
            visualization_type: "Concept Map".to_string(),
            main_concept: "Loading...".to_string(),
            nodes: vec![Node {
                id: "A".to_string(),
                label: "Concept".to_string(),
                category: "Core".to_string(),
            }],
            edges: Vec::new(),
            audio_segments: vec![AudioSegment {
                index: 0,
                spoken_text: "Loading concept map...".to_string(),
                estimated_duration: 2.0,
                highlight_node_ids: vec!["A".to_string()],
                show_node_ids: vec!["A".to_string()],
                highlight_edge_ids: Vec::new(),
                action: SegmentAction::Introduce,
                start_time: 0.0,
                end_time: 0.0,
            }],
        };
        document.normalize();
        document
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    fn normalize(&mut self) {
        for edge in &mut self.edges {
            if edge.id.trim().is_empty() {
                edge.id = Edge::synthesized_id(&edge.from, &edge.to);
            }
        }
        // Stable: segments sharing an index keep their list order.
        self.audio_segments.sort_by_key(|segment| segment.index);
        normalize_segment_times(&mut self.audio_segments);
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(|node| node.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(duration: f32) -> AudioSegment {
        AudioSegment {
            index: 0,
            spoken_text: String::new(),
            estimated_duration: duration,
            highlight_node_ids: Vec::new(),
            show_node_ids: Vec::new(),
            highlight_edge_ids: Vec::new(),
            action: SegmentAction::Introduce,
            start_time: 0.0,
            end_time: 0.0,
        }
    }

    #[test]
    fn test_decode_synthesizes_missing_and_blank_edge_ids() {
        let json = r#"{
            "visualization_type": "Concept Map",
            "main_concept": "Photosynthesis",
            "nodes": [
                {"id": "A", "label": "Photosynthesis", "category": "Main"},
                {"id": "B", "label": "Light", "category": "Secondary"},
                {"id": "C", "label": "Water", "category": "Secondary"}
            ],
            "edges": [
                {"from": "A", "to": "B", "label": "needs"},
                {"from": "A", "to": "C", "label": "needs", "id": "  "},
                {"from": "B", "to": "C", "label": "with", "id": "custom"}
            ]
        }"#;

        let document = GraphDocument::try_decode(json).expect("valid document");
        let ids: Vec<&str> = document.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["A->B", "A->C", "custom"]);
        assert!(
            document.audio_segments.is_empty(),
            "older payloads without segments decode to an empty list"
        );
    }

    #[test]
    fn test_segment_times_derived_from_durations() {
        let json = r#"{
            "visualization_type": "Concept Map",
            "main_concept": "Plants",
            "nodes": [
                {"id": "A", "label": "Plants", "category": "Main"},
                {"id": "B", "label": "Roots", "category": "Leaf"}
            ],
            "edges": [{"from": "A", "to": "B", "label": "have"}],
            "audioSegments": [
                {"segmentIndex": 0, "spokenText": "Plants", "estimatedDuration": 2.0, "showNodeIds": ["A"]},
                {"segmentIndex": 1, "spokenText": "have roots", "estimatedDuration": 3.0, "showNodeIds": ["B"], "action": "expand"}
            ]
        }"#;

        let document = GraphDocument::decode(json);
        let times: Vec<(f32, f32)> = document
            .audio_segments
            .iter()
            .map(|s| (s.start_time, s.end_time))
            .collect();
        assert_eq!(times, vec![(0.0, 2.0), (2.0, 5.0)]);
        assert_eq!(document.audio_segments[1].action, SegmentAction::Expand);
    }

    #[test]
    fn test_time_normalization_is_idempotent() {
        let mut derived = vec![segment(1.5), segment(2.5), segment(4.0)];
        normalize_segment_times(&mut derived);
        let once = derived.clone();
        normalize_segment_times(&mut derived);
        assert_eq!(once, derived, "second pass must not move any segment");

        let mut explicit = vec![segment(1.0), segment(1.0)];
        explicit[0].start_time = 10.0;
        explicit[0].end_time = 12.0;
        explicit[1].start_time = 20.0;
        explicit[1].end_time = 21.0;
        let before = explicit.clone();
        normalize_segment_times(&mut explicit);
        assert_eq!(before, explicit, "explicit times are never recomputed");
    }

    #[test]
    fn test_running_sum_matches_prefix_durations() {
        let durations = [0.5, 1.25, 3.0, 0.75, 2.0];
        let mut segments: Vec<AudioSegment> =
            durations.iter().map(|&d| segment(d)).collect();
        normalize_segment_times(&mut segments);

        for (i, s) in segments.iter().enumerate() {
            let prefix: f32 = durations[..i].iter().sum();
            assert!((s.start_time - prefix).abs() < 1e-5, "start of segment {i}");
            assert!(
                (s.end_time - (prefix + durations[i])).abs() < 1e-5,
                "end of segment {i}"
            );
        }
    }

    #[test]
    fn test_garbage_durations_count_as_zero() {
        let mut segments = vec![segment(-3.0), segment(f32::NAN), segment(2.0)];
        normalize_segment_times(&mut segments);
        assert_eq!(segments[2].start_time, 0.0);
        assert_eq!(segments[2].end_time, 2.0);
    }

    #[test]
    fn test_missing_required_key_falls_back() {
        let json = r#"{"visualization_type": "Concept Map", "nodes": [], "edges": []}"#;
        assert!(GraphDocument::try_decode(json).is_err());

        let document = GraphDocument::decode(json);
        assert_eq!(document, GraphDocument::fallback());
        assert_eq!(document.main_concept, "Loading...");
        assert_eq!(document.audio_segments[0].end_time, 2.0);
    }

    #[test]
    fn test_default_json_matches_fallback() {
        assert_eq!(
            GraphDocument::decode(DEFAULT_GRAPH_JSON),
            GraphDocument::fallback()
        );
    }

    #[test]
    fn test_lenient_segment_fields() {
        let json = r#"{
            "visualization_type": "Concept Map",
            "main_concept": "Cells",
            "nodes": [{"id": "A", "label": "Cell", "category": null}],
            "edges": [],
            "audioSegments": [
                {"segmentIndex": 1, "estimatedDuration": 1.0, "highlightNodeId": ["A"], "showNodeIds": null, "action": "zoom"},
                {"segmentIndex": 0, "estimatedDuration": 2.0, "showNodeIds": ["A"]}
            ]
        }"#;

        let document = GraphDocument::decode(json);
        assert_eq!(document.nodes[0].category, "");
        let first = &document.audio_segments[0];
        let second = &document.audio_segments[1];
        assert_eq!(first.index, 0, "segments are ordered by index");
        assert_eq!((first.start_time, first.end_time), (0.0, 2.0));
        assert_eq!((second.start_time, second.end_time), (2.0, 3.0));
        assert_eq!(second.highlight_node_ids, vec!["A".to_string()]);
        assert!(second.show_node_ids.is_empty());
        assert_eq!(second.action, SegmentAction::Introduce);
    }

    #[test]
    fn test_json_round_trip_keeps_wire_keys() {
        let document = GraphDocument::fallback();
        let json = document.to_json().expect("serializable");
        assert!(json.contains("\"audioSegments\""));
        assert!(json.contains("\"showNodeIds\""));
        assert!(json.contains("\"action\":\"introduce\""));
        assert_eq!(GraphDocument::decode(&json), document);
    }
}
