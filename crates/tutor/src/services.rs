use crate::actions::Action;
use crate::llm::LlmClient;
use crate::persistence::{ChatHistory, ProfileStore};
use crate::playback::PlaybackPoller;
use crate::reveal::RevealOrchestrator;
use crate::speech::{SpeechEngine, SpeechRecognizer};
use eframe::egui;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Background tasks report back through this; the UI thread drains the
/// matching receiver once per frame.
#[derive(Clone)]
pub struct ActionSender {
    tx: UnboundedSender<Action>,
    repaint: Option<egui::Context>,
}

impl ActionSender {
    pub fn channel() -> (Self, UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, repaint: None }, rx)
    }

    /// Wake the UI whenever an action arrives.
    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    /// False once the UI side has gone away.
    pub fn send(&self, action: Action) -> bool {
        let delivered = self.tx.send(action).is_ok();
        if let Some(ctx) = &self.repaint {
            ctx.request_repaint();
        }
        delivered
    }
}

/// Collaborators handed to the effect runner.
pub struct Services {
    pub runtime: Handle,
    pub sender: ActionSender,
    pub llm: Arc<dyn LlmClient>,
    pub speech: Arc<dyn SpeechEngine>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub profile: Arc<dyn ProfileStore>,
    pub history: Arc<dyn ChatHistory>,
    pub reveal: RevealOrchestrator,
    pub playback: PlaybackPoller,
}

impl Services {
    pub fn new(
        runtime: Handle,
        sender: ActionSender,
        llm: Arc<dyn LlmClient>,
        speech: Arc<dyn SpeechEngine>,
        recognizer: Arc<dyn SpeechRecognizer>,
        profile: Arc<dyn ProfileStore>,
        history: Arc<dyn ChatHistory>,
    ) -> Self {
        Self {
            reveal: RevealOrchestrator::new(runtime.clone()),
            playback: PlaybackPoller::new(runtime.clone()),
            runtime,
            sender,
            llm,
            speech,
            recognizer,
            profile,
            history,
        }
    }
}
