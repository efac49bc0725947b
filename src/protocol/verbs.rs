use serde_json::{json, Value};

use super::{Failure, Reply};
use crate::model::verb::VerbRecord;
use crate::services::forms;
use crate::services::query::{self, Query};
use crate::services::repository::Dataset;

fn rank_of(payload: &Value) -> Result<u32, Failure> {
    payload
        .get("rank")
        .and_then(|v| v.as_u64())
        .and_then(|r| u32::try_from(r).ok())
        .ok_or_else(|| Failure::from("payload.rank is required"))
}

/// By `verb` when given, otherwise by `rank`.
fn record<'a>(ds: &'a Dataset, payload: &Value) -> Result<&'a VerbRecord, Failure> {
    if let Some(verb) = payload.get("verb").and_then(|v| v.as_str()) {
        return ds
            .by_verb(verb)
            .ok_or_else(|| Failure::from(format!("no verb '{verb}'")));
    }

    let rank = rank_of(payload)?;
    ds.by_rank(rank)
        .ok_or_else(|| Failure::from(format!("no verb with rank {rank}")))
}

pub fn query(ds: &Dataset, payload: &Value) -> Reply {
    let q: Query = if payload.is_null() {
        Query::default()
    } else {
        serde_json::from_value(payload.clone())
            .map_err(|e| Failure::from(format!("invalid query: {e}")))?
    };

    let hits = query::run(ds.records(), &q)?;
    let verbs: Vec<_> = hits.iter().map(|r| r.summary()).collect();

    Ok(json!({
        "verbs": verbs,
        "count": verbs.len(),
        "total": ds.len(),
    }))
}

pub fn get(ds: &Dataset, payload: &Value) -> Reply {
    let rec = record(ds, payload)?;
    Ok(json!({ "verb": rec }))
}

pub fn derived_forms(ds: &Dataset, payload: &Value) -> Reply {
    let rec = record(ds, payload)?;
    let all = forms::derive_all(rec)?;
    Ok(json!({ "rank": rec.rank, "verb": rec.verb, "forms": all }))
}
