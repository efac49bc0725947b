use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

pub const PERSON_COUNT: usize = 6;

pub const IMPERATIVE_ADDRESSEES: [&str; 5] = ["tu", "você", "nós", "vós", "vocês"];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ar,
    Er,
    Ir,
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ar" => Ok(Category::Ar),
            "er" => Ok(Category::Er),
            "ir" => Ok(Category::Ir),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// Which body a dataset declares for its records.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    #[default]
    Conjugations,
    Examples,
}

impl SchemaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKind::Conjugations => "conjugations",
            SchemaKind::Examples => "examples",
        }
    }
}

impl FromStr for SchemaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conjugations" => Ok(SchemaKind::Conjugations),
            "examples" => Ok(SchemaKind::Examples),
            other => Err(format!("unknown schema '{other}'")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Imperative {
    pub afirmativo: HashMap<String, String>,
    pub negativo: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConjugationSet {
    pub persons: Vec<String>,

    #[serde(default)]
    pub indicativo: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub subjuntivo: HashMap<String, Vec<String>>,

    pub imperativo: Imperative,

    /// Kept in document order; the UI lists these as they appear.
    #[serde(deserialize_with = "ordered_pairs", serialize_with = "pairs_as_map")]
    pub non_finite: Vec<(String, String)>,
}

impl ConjugationSet {
    pub fn non_finite(&self, label: &str) -> Option<&str> {
        self.non_finite
            .iter()
            .find(|(k, _)| k == label)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordBody {
    Conjugations(ConjugationSet),
    Examples(Vec<String>),
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct VerbRecord {
    pub rank: u32,
    pub verb: String,
    pub translation: String,
    pub category: Category,
    pub irregular: bool,
    #[serde(flatten)]
    pub body: RecordBody,
}

impl VerbRecord {
    pub fn conjugations(&self) -> Option<&ConjugationSet> {
        match &self.body {
            RecordBody::Conjugations(c) => Some(c),
            RecordBody::Examples(_) => None,
        }
    }

    pub fn summary(&self) -> VerbSummary<'_> {
        VerbSummary {
            rank: self.rank,
            verb: &self.verb,
            translation: &self.translation,
            category: self.category,
            irregular: self.irregular,
        }
    }
}

/// Card header data: everything but the tables.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct VerbSummary<'a> {
    pub rank: u32,
    pub verb: &'a str,
    pub translation: &'a str,
    pub category: Category,
    pub irregular: bool,
}

/// Record as it sits in the document, before validation.
#[derive(Debug, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub rank: Option<u32>,

    #[serde(default)]
    pub verb: Option<String>,

    #[serde(default)]
    pub translation: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub irregular: bool,

    #[serde(default)]
    pub conjugations: Option<ConjugationSet>,

    #[serde(default)]
    pub examples: Option<Vec<String>>,
}

fn ordered_pairs<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
    map.into_iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => Ok((k, s)),
            other => Err(serde::de::Error::custom(format!(
                "non_finite.{k} must be a string, got {other}"
            ))),
        })
        .collect()
}

fn pairs_as_map<S>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (k, v) in pairs {
        map.serialize_entry(k, v)?;
    }
    map.end()
}
