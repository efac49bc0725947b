use std::str::FromStr;
use std::time::Duration;

use crate::model::verb::SchemaKind;
use crate::services::speech::voice::DEFAULT_PREFERRED_VOICES;

const DEFAULT_DATASET: &str = "public/conjugations.json";
const DEFAULT_SPEECH_DELAY_MS: u64 = 50;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Whether an appended "- translation" is cut before speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlossSetting {
    /// Strip for the example-sentence schema, keep otherwise.
    #[default]
    Auto,
    On,
    Off,
}

impl FromStr for GlossSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(GlossSetting::Auto),
            "on" | "true" | "1" => Ok(GlossSetting::On),
            "off" | "false" | "0" => Ok(GlossSetting::Off),
            other => Err(format!("expected auto|on|off, got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub dataset_source: String,
    pub default_schema: SchemaKind,
    pub strip_gloss: GlossSetting,
    pub speech_delay: Duration,
    pub preferred_voices: Vec<String>,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_source: DEFAULT_DATASET.to_string(),
            default_schema: SchemaKind::Conjugations,
            strip_gloss: GlossSetting::Auto,
            speech_delay: Duration::from_millis(DEFAULT_SPEECH_DELAY_MS),
            preferred_voices: DEFAULT_PREFERRED_VOICES.iter().map(|s| s.to_string()).collect(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; bad values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Config::default();

        if let Some(src) = non_empty(lookup("VERBO_DATASET")) {
            cfg.dataset_source = src;
        }

        if let Some(v) = non_empty(lookup("VERBO_SCHEMA")) {
            cfg.default_schema = parsed("VERBO_SCHEMA", &v, cfg.default_schema);
        }

        if let Some(v) = non_empty(lookup("VERBO_STRIP_GLOSS")) {
            cfg.strip_gloss = parsed("VERBO_STRIP_GLOSS", &v, cfg.strip_gloss);
        }

        if let Some(v) = non_empty(lookup("VERBO_SPEECH_DELAY_MS")) {
            let ms = parsed("VERBO_SPEECH_DELAY_MS", &v, DEFAULT_SPEECH_DELAY_MS);
            cfg.speech_delay = Duration::from_millis(ms);
        }

        if let Some(v) = non_empty(lookup("VERBO_HTTP_TIMEOUT_SECS")) {
            let secs = parsed("VERBO_HTTP_TIMEOUT_SECS", &v, DEFAULT_HTTP_TIMEOUT_SECS);
            cfg.http_timeout = Duration::from_secs(secs);
        }

        if let Some(v) = non_empty(lookup("VERBO_PREFERRED_VOICES")) {
            let names: Vec<String> = v
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                tracing::warn!("VERBO_PREFERRED_VOICES has no names, keeping defaults");
            } else {
                cfg.preferred_voices = names;
            }
        }

        cfg
    }

    pub fn strips_gloss(&self, schema: SchemaKind) -> bool {
        match self.strip_gloss {
            GlossSetting::On => true,
            GlossSetting::Off => false,
            GlossSetting::Auto => schema == SchemaKind::Examples,
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parsed<T>(key: &str, raw: &str, fallback: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match raw.parse::<T>() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(key, value = raw, error = %e, default = ?fallback, "invalid config value");
            fallback
        }
    }
}
