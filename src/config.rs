use crate::allocate::BorrowOrder;
use crate::error::EngineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Knobs for the layout and timing engine. Every field has a default so a
/// config file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub wrap_width_hook: usize,
    pub wrap_width_body: usize,
    pub wrap_width_cta: usize,
    pub max_lines_per_page: usize,
    pub max_body_pages: usize,
    pub hook_min_seconds: u32,
    pub hook_max_seconds: u32,
    /// CTA bounds normally come from the atom category's [`CtaPreset`]. Naming
    /// either one in the config file pins both and the preset is skipped.
    pub cta_min_seconds: u32,
    pub cta_max_seconds: u32,
    pub body_min_seconds: u32,
    pub body_page_min_seconds: u32,
    pub total_duration_seconds: u32,
    pub anti_orphan_min_words: usize,
    pub audio_pad_seconds: f64,
    pub borrow_order: BorrowOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let (cta_min_seconds, cta_max_seconds) = CtaPreset::Default.bounds();
        Self {
            wrap_width_hook: 32,
            wrap_width_body: 42,
            wrap_width_cta: 32,
            max_lines_per_page: 9,
            max_body_pages: 3,
            hook_min_seconds: 3,
            hook_max_seconds: 6,
            cta_min_seconds,
            cta_max_seconds,
            body_min_seconds: 8,
            body_page_min_seconds: 4,
            total_duration_seconds: 30,
            anti_orphan_min_words: 5,
            audio_pad_seconds: 0.5,
            borrow_order: BorrowOrder::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, width) in [
            ("wrap_width_hook", self.wrap_width_hook),
            ("wrap_width_body", self.wrap_width_body),
            ("wrap_width_cta", self.wrap_width_cta),
        ] {
            if width == 0 {
                return Err(EngineError::ZeroWrapWidth { field });
            }
        }

        for (field, limit) in [
            ("max_lines_per_page", self.max_lines_per_page),
            ("max_body_pages", self.max_body_pages),
        ] {
            if limit == 0 {
                return Err(EngineError::ZeroLimit { field });
            }
        }

        for (field, secs) in [
            ("total_duration_seconds", self.total_duration_seconds),
            ("hook_max_seconds", self.hook_max_seconds),
            ("cta_max_seconds", self.cta_max_seconds),
        ] {
            if secs == 0 {
                return Err(EngineError::NonPositiveDuration { field });
            }
        }

        for (field, min, max) in [
            ("hook", self.hook_min_seconds, self.hook_max_seconds),
            ("cta", self.cta_min_seconds, self.cta_max_seconds),
        ] {
            if min > max {
                return Err(EngineError::InvertedBounds { field, min, max });
            }
        }

        if !self.audio_pad_seconds.is_finite() || self.audio_pad_seconds < 0.0 {
            return Err(EngineError::InvalidPad(self.audio_pad_seconds));
        }

        Ok(())
    }

    pub fn with_cta_preset(mut self, preset: CtaPreset) -> Self {
        (self.cta_min_seconds, self.cta_max_seconds) = preset.bounds();
        self
    }
}

/// CTA pacing presets, selected by the atom's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CtaPreset {
    CombatWeighted,
    RulesCompact,
    UtilityBalanced,
    Default,
}

impl CtaPreset {
    /// Accepts either a preset name or an atom category. Unknown labels map
    /// to [`CtaPreset::Default`].
    pub fn from_label(label: &str) -> Self {
        let key = label.trim().to_ascii_lowercase().replace('_', "-");
        match key.as_str() {
            "combat-weighted" | "monster-tactic" => CtaPreset::CombatWeighted,
            "rules-compact" | "spell-use-case" => CtaPreset::RulesCompact,
            "utility-balanced" | "item-spotlight" => CtaPreset::UtilityBalanced,
            _ => CtaPreset::Default,
        }
    }

    pub fn bounds(self) -> (u32, u32) {
        match self {
            CtaPreset::CombatWeighted => (4, 7),
            CtaPreset::RulesCompact => (3, 5),
            CtaPreset::UtilityBalanced => (3, 6),
            CtaPreset::Default => (3, 6),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CtaPreset::CombatWeighted => "combat-weighted",
            CtaPreset::RulesCompact => "rules-compact",
            CtaPreset::UtilityBalanced => "utility-balanced",
            CtaPreset::Default => "default",
        }
    }
}

const PLACEHOLDER_KEY_MARKERS: &[&str] =
    &["YOUR_OPENAI_API_KEY", "REPLACE_ME", "PASTE", "SK-XXXXX"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationConfig {
    #[serde(rename = "openai_api_key")]
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_tts_model")]
    pub model: String,
    #[serde(default = "default_tts_voice")]
    pub voice: String,
    #[serde(default = "default_tts_speed")]
    pub speed: f32,
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

fn default_tts_model() -> String {
    "gpt-4o-mini-tts".to_string()
}

fn default_tts_voice() -> String {
    "alloy".to_string()
}

fn default_tts_speed() -> f32 {
    1.0
}

fn default_tts_endpoint() -> String {
    "https://api.openai.com/v1/audio/speech".to_string()
}

fn default_tts_timeout() -> u64 {
    90
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_tts_model(),
            voice: default_tts_voice(),
            speed: default_tts_speed(),
            endpoint: default_tts_endpoint(),
            timeout_secs: default_tts_timeout(),
        }
    }
}

impl NarrationConfig {
    pub fn has_usable_key(&self) -> bool {
        !looks_like_placeholder_key(&self.api_key)
    }

    /// Speaking speed limited to what the speech endpoint accepts.
    pub fn effective_speed(&self) -> f32 {
        if self.speed.is_finite() {
            self.speed.clamp(0.25, 4.0)
        } else {
            1.0
        }
    }

    fn fill_key_from_env(&mut self) {
        if self.has_usable_key() {
            return;
        }
        for var in ["OPENAI_API_KEY", "BIZZAL_OPENAI_API_KEY"] {
            if let Ok(value) = std::env::var(var) {
                if !looks_like_placeholder_key(&value) {
                    self.api_key = value.trim().to_string();
                    return;
                }
            }
        }
    }
}

fn looks_like_placeholder_key(value: &str) -> bool {
    let text = value.trim();
    if text.is_empty() {
        return true;
    }
    let upper = text.to_ascii_uppercase();
    PLACEHOLDER_KEY_MARKERS.iter().any(|m| upper.contains(m))
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("render")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub narration: NarrationConfig,
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Set when the file names `cta_min_seconds` or `cta_max_seconds`.
    #[serde(skip)]
    pub cta_bounds_pinned: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            narration: NarrationConfig::default(),
            work_dir: default_work_dir(),
            cta_bounds_pinned: false,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: serde_json::Value =
            serde_json::from_str(text).context("Failed to parse config JSON")?;
        let pinned = ["cta_min_seconds", "cta_max_seconds"]
            .iter()
            .any(|key| raw.pointer(&format!("/engine/{}", key)).is_some());
        let mut config: Config =
            serde_json::from_value(raw).context("Failed to parse config JSON")?;
        config.cta_bounds_pinned = pinned;
        config
            .engine
            .validate()
            .context("config.json: invalid engine settings")?;
        Ok(config)
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let mut config = Self::from_json(&content)?;
        config.narration.fill_key_from_env();
        Ok(config)
    }

    /// Reads `path` when it exists, otherwise starts from defaults.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if fs::metadata(&path).await.is_ok() {
            return Self::load(path).await;
        }
        let mut config = Self::default();
        config.narration.fill_key_from_env();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_engine_settings() {
        let cfg = EngineConfig {
            wrap_width_body: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(EngineError::ZeroWrapWidth {
                field: "wrap_width_body"
            })
        );

        let cfg = EngineConfig {
            total_duration_seconds: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(EngineError::NonPositiveDuration {
                field: "total_duration_seconds"
            })
        );

        let cfg = EngineConfig {
            hook_min_seconds: 9,
            hook_max_seconds: 4,
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(EngineError::InvertedBounds {
                field: "hook",
                min: 9,
                max: 4
            })
        );

        let cfg = EngineConfig {
            max_body_pages: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(EngineError::ZeroLimit { .. })));

        let cfg = EngineConfig {
            audio_pad_seconds: -0.5,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(), Err(EngineError::InvalidPad(-0.5)));
    }

    #[test]
    fn preset_lookup_by_name_or_category() {
        assert_eq!(CtaPreset::from_label("combat-weighted"), CtaPreset::CombatWeighted);
        assert_eq!(CtaPreset::from_label("monster_tactic"), CtaPreset::CombatWeighted);
        assert_eq!(CtaPreset::from_label(" Spell_Use_Case "), CtaPreset::RulesCompact);
        assert_eq!(CtaPreset::from_label("item_spotlight"), CtaPreset::UtilityBalanced);
        assert_eq!(CtaPreset::from_label("lore_drop"), CtaPreset::Default);
    }

    #[test]
    fn preset_overrides_cta_bounds() {
        let cfg = EngineConfig::default().with_cta_preset(CtaPreset::CombatWeighted);
        assert_eq!((cfg.cta_min_seconds, cfg.cta_max_seconds), (4, 7));
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let cfg = Config::from_json(
            r#"{"engine": {"total_duration_seconds": 45, "borrow_order": "cta_then_hook"},
                "narration": {"voice": "verse"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.engine.total_duration_seconds, 45);
        assert_eq!(cfg.engine.borrow_order, BorrowOrder::CtaThenHook);
        assert_eq!(cfg.engine.wrap_width_body, 42);
        assert_eq!(cfg.narration.voice, "verse");
        assert_eq!(cfg.narration.model, "gpt-4o-mini-tts");
        assert_eq!(cfg.work_dir, PathBuf::from("render"));
    }

    #[test]
    fn cta_bounds_in_file_are_pinned() {
        let cfg = Config::from_json(r#"{"engine": {"cta_max_seconds": 9}}"#).unwrap();
        assert!(cfg.cta_bounds_pinned);
        assert_eq!(cfg.engine.cta_max_seconds, 9);

        let cfg = Config::from_json(r#"{"engine": {"hook_max_seconds": 7}}"#).unwrap();
        assert!(!cfg.cta_bounds_pinned);
        assert!(!Config::default().cta_bounds_pinned);
    }

    #[test]
    fn invalid_engine_settings_fail_to_load() {
        let err = Config::from_json(r#"{"engine": {"wrap_width_cta": 0}}"#).unwrap_err();
        assert!(format!("{:#}", err).contains("wrap_width_cta"));
    }

    #[test]
    fn placeholder_keys_are_not_usable() {
        let mut narration = NarrationConfig::default();
        assert!(!narration.has_usable_key());
        narration.api_key = "sk-xxxxx-replace".to_string();
        assert!(!narration.has_usable_key());
        narration.api_key = "sk-live-123".to_string();
        assert!(narration.has_usable_key());
    }

    #[test]
    fn speed_is_clamped() {
        let narration = NarrationConfig {
            speed: 9.0,
            ..NarrationConfig::default()
        };
        assert_eq!(narration.effective_speed(), 4.0);
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(dir.path().join("nope.json"))
            .await
            .unwrap();
        assert_eq!(cfg.engine, EngineConfig::default());
    }

    #[tokio::test]
    async fn loads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"work_dir": "out/render"}"#)
            .await
            .unwrap();
        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.work_dir, PathBuf::from("out/render"));
    }
}
