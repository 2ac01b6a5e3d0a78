use crate::prompt::Prompt;
use crate::settings::{LlmSettings, Provider};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use tracing::{error, info, warn};

/// How much of a rejected response body goes into the log.
const ERROR_BODY_LOG_CHARS: usize = 500;

/// Display strings are what the chat shows in the error bubble.
#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("Error: {code} - {reason}")]
    Status { code: u16, reason: String },
    #[error("Error: {0}")]
    Api(String),
    #[error("Error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Error: unexpected response format ({0})")]
    Envelope(String),
    #[error("Error: no API key, set the {0} environment variable")]
    MissingApiKey(String),
}

pub type LlmFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;

/// One request, one attempt. Resolves to the model's raw text.
pub trait LlmClient: Send + Sync {
    fn complete(&self, prompt: Prompt) -> LlmFuture<'_>;
}

// -------------------------------------------------------------------
// Wire shapes
// -------------------------------------------------------------------

pub fn build_request_body(settings: &LlmSettings, prompt: &Prompt) -> Value {
    match settings.provider {
        Provider::OpenAiCompatible => json!({
            "model": settings.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "temperature": settings.temperature,
            "max_tokens": settings.max_tokens,
        }),
        Provider::Gemini => json!({
            "contents": [{
                "parts": [{
                    "text": format!("{}\n\n{}", prompt.system, prompt.user),
                }],
            }],
            "generationConfig": {
                "temperature": settings.temperature,
                "maxOutputTokens": settings.max_tokens,
            },
        }),
    }
}

pub fn request_url(settings: &LlmSettings) -> String {
    let endpoint = settings.endpoint();
    match settings.provider {
        Provider::OpenAiCompatible => endpoint.to_string(),
        Provider::Gemini => format!(
            "{}/{}:generateContent",
            endpoint.trim_end_matches('/'),
            settings.model
        ),
    }
}

/// Pulls the assistant text out of a provider envelope.
pub fn extract_text(provider: Provider, body: &Value) -> Result<String, LlmError> {
    if let Some(message) = body["error"]["message"].as_str() {
        return Err(LlmError::Api(message.to_string()));
    }

    let text = match provider {
        Provider::OpenAiCompatible => {
            body["choices"][0]["message"]["content"].as_str()
        }
        Provider::Gemini => {
            let candidate = &body["candidates"][0];
            if candidate["finishReason"].as_str() == Some("MAX_TOKENS") {
                warn!("model output truncated at the token limit");
            }
            candidate["content"]["parts"][0]["text"].as_str()
        }
    };

    text.map(str::to_string).ok_or_else(|| {
        LlmError::Envelope(match provider {
            Provider::OpenAiCompatible => "no choices[0].message.content",
            Provider::Gemini => "no candidates[0].content.parts[0].text",
        }
        .to_string())
    })
}

// -------------------------------------------------------------------
// HTTP client
// -------------------------------------------------------------------

pub struct HttpLlmClient {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl HttpLlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;
        Ok(Self { client, settings })
    }

    async fn send(&self, prompt: Prompt) -> Result<String, LlmError> {
        let key = self.settings.api_key().ok_or_else(|| {
            LlmError::MissingApiKey(self.settings.api_key_env.clone())
        })?;

        let url = request_url(&self.settings);
        let body = build_request_body(&self.settings, &prompt);
        let request = match self.settings.provider {
            Provider::OpenAiCompatible => {
                self.client.post(&url).bearer_auth(&key)
            }
            Provider::Gemini => {
                self.client.post(&url).query(&[("key", key.as_str())])
            }
        };

        info!(url = %url, model = %self.settings.model, "sending LLM request");
        let response = request.json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string();
            let body = error_excerpt(&response.text().await.unwrap_or_default());
            error!(code = status.as_u16(), %reason, %body, "LLM request rejected");
            return Err(LlmError::Status {
                code: status.as_u16(),
                reason,
            });
        }

        let envelope: Value = response.json().await?;
        let text = extract_text(self.settings.provider, &envelope)?;
        info!(chars = text.len(), "LLM response received");
        Ok(text)
    }
}

/// Start of a rejected response body, trimmed for the log.
fn error_excerpt(body: &str) -> String {
    body.trim().chars().take(ERROR_BODY_LOG_CHARS).collect()
}

impl LlmClient for HttpLlmClient {
    fn complete(&self, prompt: Prompt) -> LlmFuture<'_> {
        Box::pin(async move {
            let result = self.send(prompt).await;
            if let Err(e) = &result {
                error!("{e}");
            }
            result
        })
    }
}
