use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::model::verb::{Category, VerbRecord};
use crate::services::text;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown filter '{0}' (expected all, ar, er, ir or irregular)")]
    UnknownFilter(String),
}

/// One filter dimension at a time; category and irregularity are not combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    ByCategory(Category),
    IrregularOnly,
}

impl CategoryFilter {
    pub fn matches(self, record: &VerbRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::ByCategory(c) => record.category == c,
            CategoryFilter::IrregularOnly => record.irregular,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(CategoryFilter::All),
            "irregular" => Ok(CategoryFilter::IrregularOnly),
            other => other
                .parse::<Category>()
                .map(CategoryFilter::ByCategory)
                .map_err(|_| QueryError::UnknownFilter(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filter: Option<String>,

    #[serde(default)]
    pub search: String,
}

pub fn filter<'a, I>(records: I, predicate: CategoryFilter) -> Vec<&'a VerbRecord>
where
    I: IntoIterator<Item = &'a VerbRecord>,
{
    records.into_iter().filter(|r| predicate.matches(r)).collect()
}

/// Case-insensitive substring match on verb or translation. Blank query keeps everything.
pub fn search<'a, I>(records: I, query: &str) -> Vec<&'a VerbRecord>
where
    I: IntoIterator<Item = &'a VerbRecord>,
{
    let q = text::fold(query);
    if q.is_empty() {
        return records.into_iter().collect();
    }

    records
        .into_iter()
        .filter(|r| text::fold(&r.verb).contains(&q) || text::fold(&r.translation).contains(&q))
        .collect()
}

/// Filter first, then narrow by search.
pub fn run<'a>(records: &'a [VerbRecord], query: &Query) -> Result<Vec<&'a VerbRecord>, QueryError> {
    let predicate = match query.filter.as_deref() {
        Some(f) => f.parse()?,
        None => CategoryFilter::All,
    };

    Ok(search(filter(records, predicate), &query.search))
}
