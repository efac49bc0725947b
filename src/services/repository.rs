use std::collections::{HashMap, HashSet};
use std::fs;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::verb::{
    Category, ConjugationSet, RawRecord, RecordBody, SchemaKind, VerbRecord, IMPERATIVE_ADDRESSEES,
    PERSON_COUNT,
};
use crate::services::digest;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("dataset not found at {location}: {reason}")]
    NotFound { location: String, reason: String },

    #[error("invalid dataset: {0}")]
    SchemaInvalid(String),
}

impl LoadError {
    /// What the user can do about it; the core never retries on its own.
    pub fn hint(&self) -> String {
        match self {
            LoadError::NotFound { location, .. } => format!("add {location} then reload"),
            LoadError::SchemaInvalid(_) => "fix the dataset file then reload".to_string(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> LoadError {
    LoadError::SchemaInvalid(msg.into())
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub source: String,
    pub schema: SchemaKind,
    pub version: Option<u32>,
    pub count: usize,
    pub digest: String,
}

/// Loaded records in source order, plus lookup indexes. Never mutated after load.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<VerbRecord>,
    by_rank: HashMap<u32, usize>,
    by_verb: HashMap<String, usize>,
    info: DatasetInfo,
}

impl Dataset {
    pub fn records(&self) -> &[VerbRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn info(&self) -> &DatasetInfo {
        &self.info
    }

    pub fn schema(&self) -> SchemaKind {
        self.info.schema
    }

    pub fn by_rank(&self, rank: u32) -> Option<&VerbRecord> {
        self.by_rank.get(&rank).map(|&i| &self.records[i])
    }

    pub fn by_verb(&self, verb: &str) -> Option<&VerbRecord> {
        self.by_verb.get(verb).map(|&i| &self.records[i])
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    schema: SchemaKind,

    #[serde(default)]
    version: Option<u32>,

    verbs: Vec<Value>,
}

/// Single attempt: a path on disk or an http(s) URL.
pub fn load(source: &str, default_schema: SchemaKind, timeout: Duration) -> Result<Dataset, LoadError> {
    let bytes = fetch(source, timeout)?;
    let dataset = parse(source, &bytes, default_schema)?;

    tracing::info!(
        source,
        schema = dataset.schema().as_str(),
        count = dataset.len(),
        "dataset loaded"
    );

    Ok(dataset)
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn fetch(source: &str, timeout: Duration) -> Result<Vec<u8>, LoadError> {
    let not_found = |reason: String| LoadError::NotFound {
        location: source.to_string(),
        reason,
    };

    if !is_url(source) {
        return fs::read(source).map_err(|e| not_found(e.to_string()));
    }

    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| not_found(e.to_string()))?;

    let resp = client.get(source).send().map_err(|e| not_found(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(not_found(format!("HTTP {}", status.as_u16())));
    }

    resp.bytes()
        .map(|b| b.to_vec())
        .map_err(|e| not_found(e.to_string()))
}

pub fn parse(source: &str, bytes: &[u8], default_schema: SchemaKind) -> Result<Dataset, LoadError> {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        return Err(invalid("dataset is not valid UTF-8"));
    }

    let doc: Value =
        serde_json::from_str(&text).map_err(|e| invalid(format!("malformed JSON: {e}")))?;

    let (schema, version, items) = match doc {
        Value::Array(items) => (default_schema, None, items),
        Value::Object(_) => {
            let env: Envelope = serde_json::from_value(doc)
                .map_err(|e| invalid(format!("invalid envelope: {e}")))?;
            (env.schema, env.version, env.verbs)
        }
        _ => return Err(invalid("expected an array of records")),
    };

    let mut records = Vec::with_capacity(items.len());
    let mut by_rank = HashMap::with_capacity(items.len());
    let mut by_verb = HashMap::with_capacity(items.len());

    for (i, item) in items.into_iter().enumerate() {
        let raw: RawRecord = serde_json::from_value(item)
            .map_err(|e| invalid(format!("record {i}: {e}")))?;

        let record = validate(i, raw, schema)?;

        if by_rank.insert(record.rank, i).is_some() {
            return Err(invalid(format!("record {i}: duplicate rank {}", record.rank)));
        }
        if by_verb.insert(record.verb.clone(), i).is_some() {
            return Err(invalid(format!("record {i}: duplicate verb '{}'", record.verb)));
        }

        records.push(record);
    }

    let info = DatasetInfo {
        source: source.to_string(),
        schema,
        version,
        count: records.len(),
        digest: digest::sha256_hex(bytes),
    };

    Ok(Dataset {
        records,
        by_rank,
        by_verb,
        info,
    })
}

fn validate(i: usize, raw: RawRecord, schema: SchemaKind) -> Result<VerbRecord, LoadError> {
    let rank = raw.rank.ok_or_else(|| invalid(format!("record {i}: missing rank")))?;
    if rank == 0 {
        return Err(invalid(format!("record {i}: rank must be positive")));
    }

    let verb = raw
        .verb
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| invalid(format!("record {i}: missing verb")))?;

    let category: Category = raw
        .category
        .as_deref()
        .ok_or_else(|| invalid(format!("record {i} ({verb}): missing category")))?
        .parse()
        .map_err(|e| invalid(format!("record {i} ({verb}): {e}")))?;

    let body = match (schema, raw.conjugations, raw.examples) {
        (SchemaKind::Conjugations, Some(set), None) => {
            check_conjugations(&set).map_err(|e| invalid(format!("record {i} ({verb}): {e}")))?;
            RecordBody::Conjugations(set)
        }
        (SchemaKind::Examples, None, Some(examples)) => RecordBody::Examples(examples),
        (SchemaKind::Conjugations, _, _) => {
            return Err(invalid(format!(
                "record {i} ({verb}): conjugations schema requires 'conjugations' and no 'examples'"
            )))
        }
        (SchemaKind::Examples, _, _) => {
            return Err(invalid(format!(
                "record {i} ({verb}): examples schema requires 'examples' and no 'conjugations'"
            )))
        }
    };

    Ok(VerbRecord {
        rank,
        verb,
        translation: raw.translation.unwrap_or_default(),
        category,
        irregular: raw.irregular,
        body,
    })
}

fn check_conjugations(set: &ConjugationSet) -> Result<(), String> {
    if set.persons.len() != PERSON_COUNT {
        return Err(format!(
            "persons has {} entries, expected {PERSON_COUNT}",
            set.persons.len()
        ));
    }

    for (mood, tenses) in [("indicativo", &set.indicativo), ("subjuntivo", &set.subjuntivo)] {
        for (tense, forms) in tenses {
            if forms.len() != PERSON_COUNT {
                return Err(format!(
                    "{mood}.{tense} has {} forms, expected {PERSON_COUNT}",
                    forms.len()
                ));
            }
        }
    }

    let expected: HashSet<&str> = IMPERATIVE_ADDRESSEES.into_iter().collect();
    for (polarity, forms) in [
        ("afirmativo", &set.imperativo.afirmativo),
        ("negativo", &set.imperativo.negativo),
    ] {
        let keys: HashSet<&str> = forms.keys().map(String::as_str).collect();
        if keys != expected {
            return Err(format!(
                "imperativo.{polarity} must have exactly the keys {}",
                IMPERATIVE_ADDRESSEES.join(", ")
            ));
        }
    }

    Ok(())
}
