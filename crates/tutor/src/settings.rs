use concept_map::RevealTimings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const SETTINGS_FILE: &str = "tutor.json";

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Common slider metadata so bounds live in one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SliderRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

// Visual ranges
pub const NODE_RADIUS_RANGE: SliderRange =
    SliderRange::new(30.0, 150.0, 1.0);

// Layout ranges
pub const START_Y_RANGE: SliderRange =
    SliderRange::new(60.0, 400.0, 5.0);
pub const LEVEL_HEIGHT_RANGE: SliderRange =
    SliderRange::new(150.0, 600.0, 5.0);
pub const HORIZONTAL_SPACING_RANGE: SliderRange =
    SliderRange::new(150.0, 600.0, 5.0);

// -------------------------------------------------------------------
// Sections
// -------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    #[serde(rename = "gemini")]
    Gemini,
}

impl Provider {
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::OpenAiCompatible => {
                "https://api.groq.com/openai/v1/chat/completions"
            }
            Self::Gemini => {
                "https://generativelanguage.googleapis.com/v1beta/models"
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Provider,
    /// Blank means the provider's public endpoint. For Gemini this is the
    /// models base URL; the model name is appended.
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAiCompatible,
            endpoint: String::new(),
            model: "meta-llama/llama-4-scout-17b-16e-instruct"
                .to_string(),
            api_key_env: "TUTOR_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoint(&self) -> &str {
        match self.endpoint.trim() {
            "" => self.provider.default_endpoint(),
            endpoint => endpoint,
        }
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Spacing used by the hierarchical layout. Changing it re-lays out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSpacing {
    pub start_y: f32,
    pub level_height: f32,
    pub horizontal_spacing: f32,
}

impl Default for LayoutSpacing {
    fn default() -> Self {
        Self {
            start_y: 180.0,
            level_height: 380.0,
            horizontal_spacing: 350.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub node_radius: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    pub drag_growth: f32,
    pub highlight_growth: f32,
    pub layout: LayoutSpacing,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            node_radius: 90.0,
            min_zoom: 0.25,
            max_zoom: 4.0,
            zoom_step: 1.25,
            drag_growth: 1.15,
            highlight_growth: 1.08,
            layout: LayoutSpacing::default(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RevealMode {
    /// Fixed per-word and per-node delays.
    #[default]
    Scripted,
    /// Visibility follows the speech playback position.
    AudioSync,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealSettings {
    pub mode: RevealMode,
    pub timings: RevealTimings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub poll_interval_ms: u64,
    pub words_per_second: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            words_per_second: 2.5,
        }
    }
}

impl SpeechSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub node_count: u32,
    pub max_answer_words: u32,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            node_count: 8,
            max_answer_words: 120,
        }
    }
}

// -------------------------------------------------------------------
// AppSettings
// -------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub llm: LlmSettings,
    pub view: ViewSettings,
    pub reveal: RevealSettings,
    pub speech: SpeechSettings,
    pub prompt: PromptSettings,
    pub data_file: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            view: ViewSettings::default(),
            reveal: RevealSettings::default(),
            speech: SpeechSettings::default(),
            prompt: PromptSettings::default(),
            data_file: PathBuf::from("tutor-data.json"),
        }
    }
}

impl AppSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Settings from `path` if it exists and parses, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "no settings file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), "{e}; using defaults");
                Self::default()
            }
        }
    }
}
