use std::fmt;

use serde::{Deserialize, Serialize};

pub const UTTERANCE_LANG: &str = "pt-PT";
pub const UTTERANCE_RATE: f32 = 0.98;
pub const UTTERANCE_PITCH: f32 = 1.0;
pub const UTTERANCE_VOLUME: f32 = 1.0;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,

    #[serde(default)]
    pub lang: String,
}

impl Voice {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub lang: &'static str,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    pub fn new(id: UtteranceId, text: String, voice: Option<Voice>) -> Self {
        Self {
            id,
            text,
            lang: UTTERANCE_LANG,
            voice,
            rate: UTTERANCE_RATE,
            pitch: UTTERANCE_PITCH,
            volume: UTTERANCE_VOLUME,
        }
    }
}
