use crate::chat::ChatMessage;
use crate::effects::Effect;
use crate::prompt;
use crate::settings::{
    HORIZONTAL_SPACING_RANGE, LEVEL_HEIGHT_RANGE, LayoutSpacing,
    NODE_RADIUS_RANGE, RevealMode, START_Y_RANGE,
};
use crate::store::Store;
use concept_map::{GraphDocument, response};
use std::path::PathBuf;
use tracing::debug;

/// Everything that can change the store, from the UI or from a
/// background task.
#[derive(Debug, Clone)]
pub enum Action {
    // Chat
    /// Replace the text in the input box
    SetInput { text: String },
    /// Send the input box as a question
    SendMessage,
    /// Drop error bubbles and ask the last question again
    RetryLastMessage,
    /// Raw model output for the question in flight
    AnswerReceived { raw: String },
    /// The request failed; `message` is shown to the user
    RequestFailed { message: String },
    /// Forget the conversation
    ClearHistory,

    // Scripted reveal
    TypingProgress { generation: u64, typed: String },
    TypingFinished { generation: u64, answer: String },
    GraphRevealed { generation: u64, json: String },
    /// Choose scripted or speech-driven reveal for the next answer
    SetRevealMode { mode: RevealMode },

    // Speech
    /// Speak the latest answer and follow it on the map
    PlayAnswer,
    StopSpeech,
    AudioProgress { generation: u64, time: f32 },
    AudioFinished { generation: u64 },
    StartListening,
    StopListening,
    /// Final transcript from the recognizer
    SpeechResult { text: String },

    // View
    ZoomIn,
    ZoomOut,
    ResetView,
    SetNodeRadius { radius: f32 },
    /// New layout spacing; re-lays out the current graph once
    SetLayoutSpacing { spacing: LayoutSpacing },

    // Profile and settings
    SetProfileField { key: String, value: String },
    SaveSettings { path: PathBuf },
    /// Clear any error message
    ClearErrorMessage,
}

/// Apply a single action to the store
pub fn update(store: &mut Store, action: Action) -> Vec<Effect> {
    match action {
        // Chat
        Action::SetInput { text } => {
            store.input = text;
            vec![]
        }
        Action::SendMessage => {
            let question = store.input.trim().to_string();
            if question.is_empty() || store.is_loading {
                return vec![];
            }
            store.input.clear();
            let message = ChatMessage::user(question.clone());
            store.messages.push(message.clone());
            store.last_user_message = Some(question.clone());
            let mut effects = start_request(store, &question);
            effects.insert(0, Effect::AppendHistory { message });
            effects
        }
        Action::RetryLastMessage => {
            let Some(question) = store.last_user_message.clone() else {
                return vec![];
            };
            if store.is_loading {
                return vec![];
            }
            store.messages.retain(|m| !m.is_error);
            start_request(store, &question)
        }
        Action::AnswerReceived { raw } => {
            store.is_loading = false;
            let parsed = response::parse(&raw);
            let generation = store.next_generation();
            match store.settings.reveal.mode {
                RevealMode::Scripted => {
                    store.typed_text = Some(String::new());
                    vec![Effect::StartReveal {
                        generation,
                        answer: parsed.answer,
                        document: GraphDocument::decode(
                            &parsed.graph_json,
                        ),
                    }]
                }
                RevealMode::AudioSync => {
                    store.publish_graph_json(parsed.graph_json);
                    let mut effects =
                        commit_answer(store, parsed.answer);
                    effects.extend(start_speaking(store));
                    effects
                }
            }
        }
        Action::RequestFailed { message } => {
            store.is_loading = false;
            store.messages.push(ChatMessage::error(message));
            vec![]
        }
        Action::ClearHistory => {
            store.messages.clear();
            store.last_user_message = None;
            vec![Effect::ClearHistory]
        }

        // Scripted reveal
        Action::TypingProgress { generation, typed } => {
            if generation == store.reveal_generation {
                store.typed_text = Some(typed);
            }
            vec![]
        }
        Action::TypingFinished { generation, answer } => {
            if generation != store.reveal_generation {
                return vec![];
            }
            store.typed_text = None;
            commit_answer(store, answer)
        }
        Action::GraphRevealed { generation, json } => {
            if generation == store.reveal_generation {
                store.publish_graph_json(json);
            }
            vec![]
        }
        Action::SetRevealMode { mode } => {
            store.settings.reveal.mode = mode;
            vec![]
        }

        // Speech
        Action::PlayAnswer => start_speaking(store),
        Action::StopSpeech => {
            store.next_playback();
            vec![Effect::StopSpeech]
        }
        Action::AudioProgress { generation, time } => {
            if generation == store.playback_generation && store.audio.is_playing {
                store.audio.time = time;
            }
            vec![]
        }
        Action::AudioFinished { generation } => {
            if generation == store.playback_generation {
                store.audio.is_playing = false;
            }
            vec![]
        }
        Action::StartListening => {
            if store.is_listening {
                vec![]
            } else {
                vec![Effect::StartListening]
            }
        }
        Action::StopListening => vec![Effect::StopListening],
        Action::SpeechResult { text } => {
            store.is_listening = false;
            if !text.trim().is_empty() {
                store.input = text;
            }
            vec![]
        }

        // View
        Action::ZoomIn => {
            let step = store.settings.view.zoom_step;
            store.interaction.zoom_by(step);
            vec![]
        }
        Action::ZoomOut => {
            let step = store.settings.view.zoom_step;
            store.interaction.zoom_by(1.0 / step);
            vec![]
        }
        Action::ResetView => {
            store.interaction.reset_view();
            vec![]
        }
        Action::SetNodeRadius { radius } => {
            let radius = NODE_RADIUS_RANGE.clamp(radius);
            store.settings.view.node_radius = radius;
            store.interaction.set_hit_radius(radius);
            vec![]
        }
        Action::SetLayoutSpacing { spacing } => {
            let spacing = LayoutSpacing {
                start_y: START_Y_RANGE.clamp(spacing.start_y),
                level_height: LEVEL_HEIGHT_RANGE
                    .clamp(spacing.level_height),
                horizontal_spacing: HORIZONTAL_SPACING_RANGE
                    .clamp(spacing.horizontal_spacing),
            };
            if spacing != *store.layout.get() {
                store.settings.view.layout = spacing;
                store.layout.set(spacing);
            }
            vec![]
        }

        // Profile and settings
        Action::SetProfileField { key, value } => {
            if store.profile.set_field(&key, &value) {
                vec![Effect::SaveProfileField { key, value }]
            } else {
                store.error_message =
                    Some(format!("Cannot set profile field `{key}`"));
                vec![]
            }
        }
        Action::SaveSettings { path } => {
            vec![Effect::SaveSettings { path }]
        }
        Action::ClearErrorMessage => {
            store.error_message = None;
            vec![]
        }
    }
}

/// Cancels whatever the previous answer was doing and asks the model.
fn start_request(store: &mut Store, question: &str) -> Vec<Effect> {
    store.is_loading = true;
    store.next_generation();
    store.next_playback();
    let prompt = prompt::build(&store.profile, &store.settings.prompt, question);
    debug!(chars = question.len(), "question queued");
    vec![
        Effect::CancelReveal,
        Effect::StopSpeech,
        Effect::RequestAnswer { prompt },
    ]
}

fn commit_answer(store: &mut Store, answer: String) -> Vec<Effect> {
    let message = ChatMessage::tutor(answer.clone());
    store.messages.push(message.clone());
    store.answer = answer;
    vec![Effect::AppendHistory { message }]
}

fn start_speaking(store: &mut Store) -> Vec<Effect> {
    if store.answer.trim().is_empty() {
        return vec![];
    }
    let generation = store.next_playback();
    store.audio.is_playing = true;
    vec![Effect::Speak {
        generation,
        text: store.answer.clone(),
    }]
}
