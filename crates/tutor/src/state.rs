use crate::actions::{self, Action};
use crate::cache::Cache;
use crate::effects::{self, Effect};
use crate::layout_hierarchical::Positions;
use crate::services::Services;
use crate::store::Store;
use eframe::egui::{Pos2, Vec2};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct State {
    pub store: Store,
    pub cache: Cache,
    services: Services,
    inbox: UnboundedReceiver<Action>,
    action_queue: Vec<Action>,
    effect_queue: Vec<Effect>,
}

impl State {
    pub fn new(
        store: Store,
        services: Services,
        inbox: UnboundedReceiver<Action>,
    ) -> Self {
        Self {
            store,
            cache: Cache::new(),
            services,
            inbox,
            action_queue: Vec::new(),
            effect_queue: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        self.action_queue.push(action);
    }

    /// Queue what background tasks and the recognizer produced since the
    /// last frame.
    pub fn pull_background_actions(&mut self) {
        while let Ok(action) = self.inbox.try_recv() {
            self.action_queue.push(action);
        }
        if let Some(text) = self.services.recognizer.take_result() {
            self.action_queue.push(Action::SpeechResult { text });
        }
    }

    pub fn flush_actions(&mut self) {
        let actions = std::mem::take(&mut self.action_queue);
        for action in actions {
            let mut effects = actions::update(&mut self.store, action);
            self.effect_queue.append(&mut effects);
        }
    }

    pub fn flush_effects(&mut self) {
        let effects = std::mem::take(&mut self.effect_queue);
        for effect in effects {
            effects::run(&mut self.store, &mut self.services, effect);
        }
    }

    // ---------------------------------------------------------------
    // Canvas gestures
    // ---------------------------------------------------------------

    pub fn positions(&mut self) -> &Positions {
        self.cache.positions.get(&self.store)
    }

    pub fn pointer_down(&mut self, screen: Pos2) -> bool {
        let positions = self.cache.positions.get(&self.store);
        self.store.interaction.pointer_down(screen, positions)
    }

    pub fn pointer_move(&mut self, screen_delta: Vec2) {
        let positions = self.cache.positions.get_mut(&self.store);
        self.store.interaction.pointer_move(screen_delta, positions);
    }

    pub fn pointer_up(&mut self) {
        self.store.interaction.pointer_up();
    }

    pub fn pinch(&mut self, zoom_factor: f32, screen_delta: Vec2) {
        self.store.interaction.pinch(zoom_factor, screen_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;
    use crate::llm::{LlmClient, LlmError, LlmFuture};
    use crate::persistence::{
        ChatHistory, PersistenceError, ProfileStore, UserProfile,
    };
    use crate::prompt::Prompt;
    use crate::services::ActionSender;
    use crate::settings::{AppSettings, RevealMode};
    use crate::speech::{SimulatedSpeech, UnavailableRecognizer};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    const RAW: &str = r#"[ANSWER] Bees make honey.
[CONCEPT_MAP_JSON]
{"visualization_type": "Concept Map", "main_concept": "Bees",
 "nodes": [{"id": "A", "label": "Bees", "category": "Main"},
           {"id": "B", "label": "Honey", "category": "Outcome"},
           {"id": "C", "label": "Flowers", "category": "Ecology"}],
 "edges": [{"from": "A", "to": "B", "label": "make"},
           {"from": "A", "to": "C", "label": "visit"}],
 "audioSegments": [
   {"segmentIndex": 0, "estimatedDuration": 0.8, "showNodeIds": ["A"]},
   {"segmentIndex": 1, "estimatedDuration": 0.8, "showNodeIds": ["B", "C"],
    "highlightEdgeIds": ["A->B"]}]}"#;

    const EMPTY_MAP: &str = r#"[ANSWER] Nothing to map.
[CONCEPT_MAP_JSON]
{"visualization_type": "Concept Map", "main_concept": "Nothing",
 "nodes": [], "edges": []}"#;

    struct CannedLlm(Result<String, u16>);

    impl LlmClient for CannedLlm {
        fn complete(&self, _prompt: Prompt) -> LlmFuture<'_> {
            let result = self.0.clone().map_err(|code| LlmError::Status {
                code,
                reason: "Service Unavailable".to_string(),
            });
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        profile: Mutex<UserProfile>,
        history: Mutex<Vec<ChatMessage>>,
    }

    impl ProfileStore for MemoryStore {
        fn profile(&self) -> UserProfile {
            self.profile.lock().clone()
        }

        fn set_field(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
            self.profile.lock().set_field(key, value);
            Ok(())
        }
    }

    impl ChatHistory for MemoryStore {
        fn append(&self, message: &ChatMessage) -> Result<(), PersistenceError> {
            self.history.lock().push(message.clone());
            Ok(())
        }

        fn messages(&self) -> Vec<ChatMessage> {
            self.history.lock().clone()
        }

        fn clear(&self) -> Result<(), PersistenceError> {
            self.history.lock().clear();
            Ok(())
        }
    }

    fn state(llm: CannedLlm, mode: RevealMode) -> (State, Arc<MemoryStore>) {
        let mut settings = AppSettings::default();
        settings.reveal.mode = mode;
        let memory = Arc::new(MemoryStore::default());
        let (sender, inbox) = ActionSender::channel();
        let services = Services::new(
            Handle::current(),
            sender,
            Arc::new(llm),
            Arc::new(SimulatedSpeech::new(2.5)),
            Arc::new(UnavailableRecognizer),
            memory.clone(),
            memory.clone(),
        );
        let store = Store::new(settings, UserProfile::default(), vec![]);
        (State::new(store, services, inbox), memory)
    }

    fn frame(state: &mut State) {
        state.pull_background_actions();
        state.flush_actions();
        state.flush_effects();
    }

    async fn run_for(state: &mut State, duration: Duration) {
        let step = Duration::from_millis(10);
        let mut elapsed = Duration::ZERO;
        while elapsed < duration {
            tokio::time::sleep(step).await;
            frame(state);
            elapsed += step;
        }
    }

    fn ask(state: &mut State, question: &str) {
        state.dispatch(Action::SetInput {
            text: question.to_string(),
        });
        state.dispatch(Action::SendMessage);
        frame(state);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_round_trip() {
        let (mut state, memory) =
            state(CannedLlm(Ok(RAW.to_string())), RevealMode::Scripted);
        ask(&mut state, "What do bees do?");
        assert!(state.store.is_loading);

        run_for(&mut state, Duration::from_millis(50)).await;
        assert!(!state.store.is_loading);
        assert!(state.store.typed_text.is_some(), "typing under way");

        run_for(&mut state, Duration::from_secs(3)).await;
        assert_eq!(state.store.typed_text, None);
        assert_eq!(state.store.answer, "Bees make honey.");
        assert_eq!(state.store.document.get().edges.len(), 2);
        assert_eq!(state.positions().len(), 3);

        let history = memory.messages();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "Bees make honey.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_sync_round_trip() {
        let (mut state, _) =
            state(CannedLlm(Ok(RAW.to_string())), RevealMode::AudioSync);
        ask(&mut state, "What do bees do?");

        // Three words at 2.5 words per second: 1.2 s of speech.
        run_for(&mut state, Duration::from_millis(300)).await;
        assert!(state.store.audio.is_playing);
        let early = state.store.sync_snapshot();
        assert_eq!(early.visible_node_ids.len(), 1);

        run_for(&mut state, Duration::from_millis(700)).await;
        let later = state.store.sync_snapshot();
        assert!(later.visible_node_ids.is_superset(&early.visible_node_ids));
        assert_eq!(later.visible_node_ids.len(), 3);
        assert!(later.is_edge_highlighted("A->B"));

        run_for(&mut state, Duration::from_secs(1)).await;
        assert!(!state.store.audio.is_playing);
        assert_eq!(state.store.sync_snapshot().visible_node_ids.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ignores_late_playback_tick() {
        let (mut state, _) =
            state(CannedLlm(Ok(RAW.to_string())), RevealMode::AudioSync);
        ask(&mut state, "What do bees do?");
        run_for(&mut state, Duration::from_millis(300)).await;
        assert!(state.store.audio.is_playing);
        let speaking = state.store.playback_generation;

        // A tick sent by the poller just before it was aborted.
        state.dispatch(Action::StopSpeech);
        state.services.sender.send(Action::AudioProgress {
            generation: speaking,
            time: 0.3,
        });
        frame(&mut state);
        run_for(&mut state, Duration::from_secs(5)).await;

        assert!(!state.store.audio.is_playing);
        assert_eq!(
            state.store.sync_snapshot().visible_node_ids.len(),
            3,
            "stopped playback shows the whole map"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_empty_map_replaces_previous_one() {
        let (mut state, _) =
            state(CannedLlm(Ok(RAW.to_string())), RevealMode::Scripted);
        ask(&mut state, "What do bees do?");
        run_for(&mut state, Duration::from_secs(3)).await;
        assert_eq!(state.store.document.get().main_concept, "Bees");

        state.dispatch(Action::AnswerReceived {
            raw: EMPTY_MAP.to_string(),
        });
        run_for(&mut state, Duration::from_secs(3)).await;

        assert_eq!(state.store.answer, "Nothing to map.");
        assert_eq!(state.store.document.get().main_concept, "Nothing");
        assert!(state.store.document.get().nodes.is_empty());
        assert!(state.positions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_request_offers_retry() {
        let (mut state, memory) =
            state(CannedLlm(Err(503)), RevealMode::Scripted);
        ask(&mut state, "Why?");
        run_for(&mut state, Duration::from_millis(20)).await;

        let bubble = state.store.messages.last().expect("error bubble");
        assert_eq!(bubble.content, "Error: 503 - Service Unavailable");
        assert!(bubble.can_retry);
        assert_eq!(memory.messages().len(), 1, "errors are not stored");

        state.dispatch(Action::RetryLastMessage);
        frame(&mut state);
        assert!(state.store.is_loading);
        run_for(&mut state, Duration::from_millis(20)).await;
        assert_eq!(
            state.store.messages.iter().filter(|m| m.is_error).count(),
            1,
            "one bubble per attempt"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_question_cancels_running_reveal() {
        let (mut state, _) =
            state(CannedLlm(Ok(RAW.to_string())), RevealMode::Scripted);
        ask(&mut state, "first");
        run_for(&mut state, Duration::from_millis(30)).await;
        let first = state.store.reveal_generation;

        ask(&mut state, "second");
        assert_eq!(state.store.typed_text, None);
        run_for(&mut state, Duration::from_secs(3)).await;

        assert!(state.store.reveal_generation > first);
        let answers = state
            .store
            .messages
            .iter()
            .filter(|m| !m.is_from_user())
            .count();
        assert_eq!(answers, 1, "the cancelled reveal never commits");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_moves_cached_position() {
        let (mut state, _) =
            state(CannedLlm(Ok(RAW.to_string())), RevealMode::AudioSync);
        let start = state.positions()["A"];
        let screen = state.store.interaction.graph_to_screen(start);

        assert!(state.pointer_down(screen));
        state.pinch(2.0, Vec2::ZERO);
        state.pointer_move(Vec2::new(20.0, 10.0));
        state.pointer_up();

        assert_eq!(state.positions()["A"], start + Vec2::new(10.0, 5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_microphone_unavailable_reports_error() {
        let (mut state, _) =
            state(CannedLlm(Ok(RAW.to_string())), RevealMode::Scripted);
        state.dispatch(Action::StartListening);
        frame(&mut state);
        assert!(!state.store.is_listening);
        assert!(state.store.error_message.is_some());
    }
}
