use crate::config::NarrationConfig;
use crate::logw;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Turns one page of narration text into an audio file.
///
/// Returns `Ok(false)` when the service answered but produced nothing usable;
/// transport failures are errors.
#[async_trait]
pub trait NarrationSynth: Send + Sync {
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<bool>;
}

pub struct OpenAiTts {
    client: Client,
    cfg: NarrationConfig,
    voice: String,
}

impl OpenAiTts {
    pub fn new(cfg: NarrationConfig, voice_override: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self::with_client(client, cfg, voice_override))
    }

    pub fn with_client(client: Client, cfg: NarrationConfig, voice_override: Option<&str>) -> Self {
        let voice = voice_override
            .map(str::to_string)
            .unwrap_or_else(|| cfg.voice.clone());
        Self { client, cfg, voice }
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.cfg.model,
            "voice": self.voice,
            "speed": self.cfg.effective_speed(),
            "input": text,
            "response_format": "wav",
        })
    }
}

#[async_trait]
impl NarrationSynth for OpenAiTts {
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<bool> {
        if !self.cfg.has_usable_key() {
            anyhow::bail!("narration: no usable OpenAI API key configured");
        }

        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .bearer_auth(&self.cfg.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .context("TTS request failed")?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let snippet = body.chars().take(200).collect::<String>();
            logw(format!("TTS failed HTTP {} ({})", status, snippet));
            return Ok(false);
        }

        let bytes = resp.bytes().await.context("TTS response read failed")?;
        if bytes.is_empty() {
            logw("TTS returned an empty audio payload");
            return Ok(false);
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
        fs::write(out_path, &bytes).await?;

        Ok(fs::metadata(out_path).await.is_ok())
    }
}
