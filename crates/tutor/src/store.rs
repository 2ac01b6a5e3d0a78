use crate::chat::ChatMessage;
use crate::interaction::InteractionController;
use crate::persistence::UserProfile;
use crate::settings::{AppSettings, LayoutSpacing};
use crate::versioned::Versioned;
use concept_map::{AudioSync, DEFAULT_GRAPH_JSON, GraphDocument, SyncSnapshot};
use tracing::debug;

/// Speech playback clock as last reported by the poller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioClock {
    pub time: f32,
    pub is_playing: bool,
}

pub struct Store {
    pub settings: AppSettings,
    pub profile: UserProfile,
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub is_loading: bool,
    pub last_user_message: Option<String>,
    /// Latest finished tutor answer, spoken by the play button.
    pub answer: String,
    /// Partially typed answer while a scripted reveal runs.
    pub typed_text: Option<String>,
    pub graph_json: String,
    pub document: Versioned<GraphDocument>,
    pub reveal_generation: u64,
    /// Bumped whenever speech starts or stops; older poller ticks are
    /// dropped.
    pub playback_generation: u64,
    pub audio: AudioClock,
    pub interaction: InteractionController,
    pub layout: Versioned<LayoutSpacing>,
    pub is_listening: bool,
    pub error_message: Option<String>,
}

impl Store {
    pub fn new(
        settings: AppSettings,
        profile: UserProfile,
        messages: Vec<ChatMessage>,
    ) -> Self {
        let answer = messages
            .iter()
            .rev()
            .find(|m| !m.is_from_user() && !m.is_error)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Self {
            interaction: InteractionController::from_settings(&settings.view),
            layout: Versioned::new(settings.view.layout),
            settings,
            profile,
            messages,
            input: String::new(),
            is_loading: false,
            last_user_message: None,
            answer,
            typed_text: None,
            graph_json: DEFAULT_GRAPH_JSON.to_string(),
            document: Versioned::new(GraphDocument::fallback()),
            reveal_generation: 0,
            playback_generation: 0,
            audio: AudioClock::default(),
            is_listening: false,
            error_message: None,
        }
    }

    /// Decodes `json` into a new document unless it is the one already
    /// shown. A new document ends any drag; the camera stays where it is.
    pub fn publish_graph_json(&mut self, json: String) {
        if json == self.graph_json {
            return;
        }
        let document = GraphDocument::decode(&json);
        debug!(
            nodes = document.nodes.len(),
            edges = document.edges.len(),
            segments = document.audio_segments.len(),
            "graph published"
        );
        self.graph_json = json;
        self.document.set(document);
        self.interaction.pointer_up();
    }

    /// Starts a new reveal generation; queued messages from older ones
    /// are ignored from now on.
    pub fn next_generation(&mut self) -> u64 {
        self.reveal_generation = self.reveal_generation.wrapping_add(1);
        self.typed_text = None;
        self.reveal_generation
    }

    /// Stops the playback clock and starts a new playback generation.
    pub fn next_playback(&mut self) -> u64 {
        self.playback_generation = self.playback_generation.wrapping_add(1);
        self.audio = AudioClock::default();
        self.playback_generation
    }

    pub fn sync_snapshot(&self) -> SyncSnapshot {
        AudioSync::new(
            self.document.get(),
            self.audio.time,
            self.audio.is_playing,
        )
        .snapshot()
    }
}
