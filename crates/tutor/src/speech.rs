use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("speech recognition is not available on this platform")]
    Unavailable,
}

/// Text-to-speech with a pollable playback clock.
pub trait SpeechEngine: Send + Sync {
    fn speak(&self, text: &str);
    fn stop(&self);
    fn is_speaking(&self) -> bool;
    /// Seconds since the current utterance started.
    fn playback_position(&self) -> f32;
}

pub trait SpeechRecognizer: Send + Sync {
    fn start_listening(&self) -> Result<(), SpeechError>;
    fn stop_listening(&self);
    fn is_listening(&self) -> bool;
    /// Final transcript of the last session, handed out once.
    fn take_result(&self) -> Option<String>;
}

// -------------------------------------------------------------------
// Simulated engine
// -------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Utterance {
    started: Instant,
    length: Duration,
}

/// Silent engine that "speaks" at a fixed word rate. Drives the same
/// playback clock a platform voice would.
pub struct SimulatedSpeech {
    words_per_second: f32,
    current: Mutex<Option<Utterance>>,
}

impl SimulatedSpeech {
    pub fn new(words_per_second: f32) -> Self {
        Self {
            words_per_second: words_per_second.max(0.1),
            current: Mutex::new(None),
        }
    }

    pub fn estimated_length(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as f32;
        Duration::from_secs_f32(words / self.words_per_second)
    }
}

impl SpeechEngine for SimulatedSpeech {
    fn speak(&self, text: &str) {
        let length = self.estimated_length(text);
        debug!(seconds = length.as_secs_f32(), "speaking");
        *self.current.lock() = Some(Utterance {
            started: Instant::now(),
            length,
        });
    }

    fn stop(&self) {
        self.current.lock().take();
    }

    fn is_speaking(&self) -> bool {
        self.current
            .lock()
            .is_some_and(|u| u.started.elapsed() < u.length)
    }

    fn playback_position(&self) -> f32 {
        self.current.lock().map_or(0.0, |u| {
            u.started.elapsed().min(u.length).as_secs_f32()
        })
    }
}

/// Recognizer for builds without a speech backend.
#[derive(Debug, Default)]
pub struct UnavailableRecognizer;

impl SpeechRecognizer for UnavailableRecognizer {
    fn start_listening(&self) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable)
    }

    fn stop_listening(&self) {}

    fn is_listening(&self) -> bool {
        false
    }

    fn take_result(&self) -> Option<String> {
        None
    }
}
