use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Finalized narration/caption text for one video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptText {
    pub hook: String,
    pub body: String,
    pub cta: String,
}

impl ScriptText {
    /// Collapses whitespace runs. The body keeps blank-line paragraph breaks.
    pub fn normalized(hook: &str, body: &str, cta: &str) -> Result<Self> {
        Ok(Self {
            hook: clean_text(hook)?,
            body: clean_paragraphs(body)?,
            cta: clean_text(cta)?,
        })
    }
}

/// The parts of a content atom the render step reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub category: String,
    pub script: ScriptText,
    pub voice: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomRoot {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    script: RawScript,
    #[serde(default)]
    style: RawStyle,
}

#[derive(Debug, Default, Deserialize)]
struct RawScript {
    #[serde(default)]
    hook: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    cta: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStyle {
    #[serde(default)]
    voiceover: RawVoiceover,
}

#[derive(Debug, Default, Deserialize)]
struct RawVoiceover {
    #[serde(default)]
    tts_voice_id: Option<String>,
}

impl Atom {
    pub fn from_json(text: &str) -> Result<Self> {
        let root: AtomRoot =
            serde_json::from_str(text).with_context(|| "Failed to parse atom JSON")?;

        let script = ScriptText::normalized(
            root.script.hook.as_deref().unwrap_or_default(),
            root.script.body.as_deref().unwrap_or_default(),
            root.script.cta.as_deref().unwrap_or_default(),
        )?;

        let voice = root
            .style
            .voiceover
            .tts_voice_id
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            category: root.category.unwrap_or_default().trim().to_string(),
            script,
            voice,
        })
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read atom: {}", path.as_ref().display()))?;
        Self::from_json(&content)
    }
}

pub fn clean_text(value: &str) -> Result<String> {
    Ok(whitespace_regex()?.replace_all(value.trim(), " ").into_owned())
}

fn clean_paragraphs(value: &str) -> Result<String> {
    let mut out = Vec::new();
    for paragraph in blank_line_regex()?.split(value.trim()) {
        let cleaned = clean_text(paragraph)?;
        if !cleaned.is_empty() {
            out.push(cleaned);
        }
    }
    Ok(out.join("\n\n"))
}

fn whitespace_regex() -> Result<&'static Regex> {
    static WS_RE: OnceCell<Regex> = OnceCell::new();
    WS_RE.get_or_try_init(|| Regex::new(r"\s+").context("failed to compile whitespace regex"))
}

fn blank_line_regex() -> Result<&'static Regex> {
    static BLANK_RE: OnceCell<Regex> = OnceCell::new();
    BLANK_RE.get_or_try_init(|| {
        Regex::new(r"\n[ \t\r]*\n").context("failed to compile blank line regex")
    })
}
