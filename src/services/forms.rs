use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::verb::{ConjugationSet, VerbRecord, IMPERATIVE_ADDRESSEES, PERSON_COUNT};

/// Suffixes appended to the infinitive, in person order (eu .. eles/elas).
pub const PERSONAL_INFINITIVE_SUFFIXES: [&str; PERSON_COUNT] = ["", "es", "", "mos", "des", "em"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Indicativo,
    Subjuntivo,
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mood::Indicativo => "indicativo",
            Mood::Subjuntivo => "subjuntivo",
        })
    }
}

/// (dataset key, display label)
pub type TenseSpec = (&'static str, &'static str);

pub const INDICATIVE_TENSES: [TenseSpec; 5] = [
    ("presente", "PRESENTE"),
    ("pretérito_perfeito", "P. PERFEITO"),
    ("pretérito_imperfeito", "P. IMPERFEITO"),
    ("futuro", "FUTURO"),
    ("condicional", "CONDICIONAL"),
];

pub const SUBJUNCTIVE_TENSES: [TenseSpec; 3] = [
    ("presente", "SUBJ. PRESENTE"),
    ("imperfeito", "SUBJ. IMPERFEITO"),
    ("futuro", "SUBJ. FUTURO"),
];

impl Mood {
    pub fn default_tenses(self) -> &'static [TenseSpec] {
        match self {
            Mood::Indicativo => &INDICATIVE_TENSES,
            Mood::Subjuntivo => &SUBJUNCTIVE_TENSES,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error("{verb}: {mood} has no tense '{tense}'")]
    MissingTense {
        verb: String,
        mood: Mood,
        tense: String,
    },

    #[error("{verb}: non-finite form '{label}' is missing")]
    MissingNonFinite { verb: String, label: String },

    #[error("{verb}: record carries no conjugation tables")]
    NoConjugations { verb: String },
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct TenseRow<'a> {
    pub key: &'static str,
    pub label: &'static str,
    pub forms: &'a [String],
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ImperativeTable<'a> {
    pub afirmativo: Vec<(&'static str, &'a str)>,
    pub negativo: Vec<(&'static str, &'a str)>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct VerbForms<'a> {
    pub persons: &'a [String],
    pub indicativo: Vec<TenseRow<'a>>,
    pub subjuntivo: Vec<TenseRow<'a>>,
    pub imperativo: ImperativeTable<'a>,
    pub non_finite: Vec<(&'a str, &'a str)>,
    pub personal_infinitive: Vec<String>,
}

fn conjugations(verb: &VerbRecord) -> Result<&ConjugationSet, DeriveError> {
    verb.conjugations().ok_or_else(|| DeriveError::NoConjugations {
        verb: verb.verb.clone(),
    })
}

pub fn derive_table(verb: &VerbRecord, mood: Mood) -> Result<Vec<TenseRow<'_>>, DeriveError> {
    derive_table_with(verb, mood, mood.default_tenses())
}

/// Rows follow `tenses`, not the dataset's key order.
pub fn derive_table_with<'a>(
    verb: &'a VerbRecord,
    mood: Mood,
    tenses: &[TenseSpec],
) -> Result<Vec<TenseRow<'a>>, DeriveError> {
    let set = conjugations(verb)?;
    let table = match mood {
        Mood::Indicativo => &set.indicativo,
        Mood::Subjuntivo => &set.subjuntivo,
    };

    tenses
        .iter()
        .map(|&(key, label)| {
            table
                .get(key)
                .map(|forms| TenseRow {
                    key,
                    label,
                    forms: forms.as_slice(),
                })
                .ok_or_else(|| DeriveError::MissingTense {
                    verb: verb.verb.clone(),
                    mood,
                    tense: key.to_string(),
                })
        })
        .collect()
}

pub fn derive_imperative(verb: &VerbRecord) -> Result<ImperativeTable<'_>, DeriveError> {
    let set = conjugations(verb)?;

    Ok(ImperativeTable {
        afirmativo: by_addressee(&set.imperativo.afirmativo),
        negativo: by_addressee(&set.imperativo.negativo),
    })
}

// Addressee keys are checked at load, so a miss here is a record built by hand.
fn by_addressee(forms: &HashMap<String, String>) -> Vec<(&'static str, &str)> {
    IMPERATIVE_ADDRESSEES
        .iter()
        .map(|&who| (who, forms.get(who).map(String::as_str).unwrap_or("")))
        .collect()
}

pub fn derive_non_finite(verb: &VerbRecord) -> Result<Vec<(&str, &str)>, DeriveError> {
    let set = conjugations(verb)?;
    Ok(set
        .non_finite
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect())
}

pub fn derive_personal_infinitive(verb: &VerbRecord) -> Result<Vec<String>, DeriveError> {
    let set = conjugations(verb)?;
    let base = set
        .non_finite("infinitivo")
        .ok_or_else(|| DeriveError::MissingNonFinite {
            verb: verb.verb.clone(),
            label: "infinitivo".to_string(),
        })?;

    Ok(personal_infinitive(base))
}

pub fn personal_infinitive(infinitive: &str) -> Vec<String> {
    PERSONAL_INFINITIVE_SUFFIXES
        .iter()
        .map(|suffix| format!("{infinitive}{suffix}"))
        .collect()
}

/// Every table for one expanded card; the first missing piece aborts.
pub fn derive_all(verb: &VerbRecord) -> Result<VerbForms<'_>, DeriveError> {
    let set = conjugations(verb)?;

    Ok(VerbForms {
        persons: &set.persons,
        indicativo: derive_table(verb, Mood::Indicativo)?,
        subjuntivo: derive_table(verb, Mood::Subjuntivo)?,
        imperativo: derive_imperative(verb)?,
        non_finite: derive_non_finite(verb)?,
        personal_infinitive: derive_personal_infinitive(verb)?,
    })
}
