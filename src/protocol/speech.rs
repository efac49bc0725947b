use serde_json::{json, Value};

use super::events::{EventHost, EventSignals};
use super::{Failure, Reply};
use crate::model::voice::{UtteranceId, Voice};
use crate::services::speech::dispatcher::SpeechDispatcher;
use crate::services::speech::voice::{Selection, VoiceFeed, VoiceSelector};

pub type Dispatcher = SpeechDispatcher<EventHost, EventSignals>;

pub fn capability(speech: &mut Dispatcher, payload: &Value) -> Reply {
    let available = payload
        .get("available")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| Failure::from("payload.available is required"))?;

    speech.host_mut().set_available(available);
    tracing::info!(available, "speech capability declared");

    Ok(json!({ "available": available }))
}

pub fn voices_changed(feed: &VoiceFeed, selector: &VoiceSelector, payload: &Value) -> Reply {
    let voices_val = payload.get("voices").cloned().unwrap_or(Value::Null);
    if voices_val.is_null() {
        return Err("payload.voices is required".into());
    }

    let voices: Vec<Voice> = serde_json::from_value(voices_val)
        .map_err(|e| Failure::from(format!("invalid payload.voices: {e}")))?;

    feed.publish(voices);
    Ok(json!({ "voice": selector.current() }))
}

pub fn current(feed: &VoiceFeed, selector: &VoiceSelector) -> Reply {
    let voice = match selector.selection() {
        Selection::Resolved(v) => Some(v),
        Selection::Unresolved => None,
    };
    Ok(json!({
        "voice": voice,
        "available_voices": feed.snapshot().len(),
    }))
}

pub fn speak(speech: &mut Dispatcher, payload: &Value) -> Reply {
    let text = payload
        .get("text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Failure::from("payload.text is required"))?;
    let control = payload.get("control_id").and_then(|v| v.as_str());

    let id = speech.speak(text, control);
    Ok(json!({ "utterance_id": id }))
}

pub fn ended(speech: &mut Dispatcher, payload: &Value) -> Reply {
    let id = payload
        .get("utterance_id")
        .and_then(|v| v.as_u64())
        .map(UtteranceId)
        .ok_or_else(|| Failure::from("payload.utterance_id is required"))?;

    let accepted = speech.on_utterance_end(id);
    Ok(json!({ "accepted": accepted }))
}
