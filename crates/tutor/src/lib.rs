pub mod actions;
pub mod app;
pub mod cache;
pub mod chat;
pub mod effects;
pub mod interaction;
pub mod layout_hierarchical;
pub mod llm;
pub mod native;
pub mod persistence;
pub mod playback;
pub mod prompt;
pub mod render;
pub mod reveal;
pub mod services;
pub mod settings;
pub mod speech;
pub mod state;
pub mod store;
pub mod versioned;

use crate::app::TutorApp;
use crate::llm::{HttpLlmClient, LlmClient, LlmError, LlmFuture};
use crate::persistence::{ChatHistory, JsonFileStore, ProfileStore};
use crate::prompt::Prompt;
use crate::services::{ActionSender, Services};
use crate::settings::AppSettings;
use crate::speech::{SimulatedSpeech, UnavailableRecognizer};
use crate::state::State;
use crate::store::Store;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::error;

/// Client used when the HTTP client cannot be built; every request
/// fails with the construction error.
struct BrokenClient(String);

impl LlmClient for BrokenClient {
    fn complete(&self, _prompt: Prompt) -> LlmFuture<'_> {
        let message = self.0.clone();
        Box::pin(async move { Err(LlmError::Api(message)) })
    }
}

/// Wire the store, collaborators and background runtime into the app.
pub fn create_app(
    cc: &eframe::CreationContext<'_>,
    settings: AppSettings,
    runtime: Handle,
) -> TutorApp {
    let data = Arc::new(JsonFileStore::open_or_empty(&settings.data_file));
    let llm: Arc<dyn LlmClient> = match HttpLlmClient::new(settings.llm.clone())
    {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("cannot build HTTP client: {e}");
            Arc::new(BrokenClient(e.to_string()))
        }
    };

    let (sender, inbox) = ActionSender::channel();
    let services = Services::new(
        runtime,
        sender.with_repaint(cc.egui_ctx.clone()),
        llm,
        Arc::new(SimulatedSpeech::new(settings.speech.words_per_second)),
        Arc::new(UnavailableRecognizer),
        Arc::clone(&data) as Arc<dyn ProfileStore>,
        Arc::clone(&data) as Arc<dyn ChatHistory>,
    );
    let store = Store::new(settings, data.profile(), data.messages());
    TutorApp::new(State::new(store, services, inbox))
}
