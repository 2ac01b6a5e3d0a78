pub mod audio_sync;
pub mod document;
pub mod response;
pub mod reveal;

pub use audio_sync::{AudioSync, SyncSnapshot};
pub use document::{
    AudioSegment, DEFAULT_GRAPH_JSON, DocumentError, Edge, EdgeId, GraphDocument, Node, NodeId,
    SegmentAction,
};
pub use response::{DEFAULT_ANSWER, ParsedResponse};
pub use reveal::{GraphStep, RevealTimings, TypingStep};
