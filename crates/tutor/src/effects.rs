use crate::actions::Action;
use crate::chat::ChatMessage;
use crate::prompt::Prompt;
use crate::services::Services;
use crate::store::Store;
use concept_map::GraphDocument;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Deferred work that must run outside the reducer (IO, tasks, speech)
#[derive(Debug, Clone)]
pub enum Effect {
    /// Ask the model; answers come back as an action
    RequestAnswer { prompt: Prompt },
    StartReveal {
        generation: u64,
        answer: String,
        document: GraphDocument,
    },
    CancelReveal,
    Speak { generation: u64, text: String },
    StopSpeech,
    StartListening,
    StopListening,
    AppendHistory { message: ChatMessage },
    ClearHistory,
    SaveProfileField { key: String, value: String },
    SaveSettings { path: PathBuf },
}

/// Execute a single effect against the store
pub fn run(store: &mut Store, services: &mut Services, effect: Effect) {
    match effect {
        Effect::RequestAnswer { prompt } => {
            let llm = Arc::clone(&services.llm);
            let sender = services.sender.clone();
            services.runtime.spawn(async move {
                let action = match llm.complete(prompt).await {
                    Ok(raw) => Action::AnswerReceived { raw },
                    Err(e) => Action::RequestFailed {
                        message: e.to_string(),
                    },
                };
                sender.send(action);
            });
        }
        Effect::StartReveal {
            generation,
            answer,
            document,
        } => {
            services.reveal.start(
                generation,
                answer,
                document,
                store.settings.reveal.timings,
                services.sender.clone(),
            );
        }
        Effect::CancelReveal => services.reveal.cancel(),
        Effect::Speak { generation, text } => {
            services.speech.speak(&text);
            services.playback.start(
                generation,
                Arc::clone(&services.speech),
                store.settings.speech.poll_interval(),
                services.sender.clone(),
            );
        }
        Effect::StopSpeech => {
            services.playback.cancel();
            services.speech.stop();
        }
        Effect::StartListening => {
            match services.recognizer.start_listening() {
                Ok(()) => store.is_listening = true,
                Err(e) => {
                    warn!("{e}");
                    store.error_message = Some(e.to_string());
                }
            }
        }
        Effect::StopListening => {
            services.recognizer.stop_listening();
            store.is_listening = false;
        }
        Effect::AppendHistory { message } => {
            if let Err(e) = services.history.append(&message) {
                store.error_message = Some(e.to_string());
            }
        }
        Effect::ClearHistory => {
            if let Err(e) = services.history.clear() {
                store.error_message = Some(e.to_string());
            }
        }
        Effect::SaveProfileField { key, value } => {
            if let Err(e) = services.profile.set_field(&key, &value) {
                store.error_message = Some(e.to_string());
            }
        }
        Effect::SaveSettings { path } => {
            if let Err(e) = store.settings.save(&path) {
                store.error_message = Some(e.to_string());
            }
        }
    }
}
