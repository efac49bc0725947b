use serde_json::{json, Value};

use crate::config::Config;
use crate::services::forms::DeriveError;
use crate::services::query::QueryError;
use crate::services::repository::{self, Dataset, LoadError};
use crate::services::speech::dispatcher::SpeechDispatcher;
use crate::services::speech::voice::{Subscription, VoiceFeed, VoiceSelector};

mod command;
pub mod events;
mod speech;
mod verbs;

use command::Command;
use events::{EventHost, EventSignals, Outbox};

/// Error reply: message plus an optional remediation hint for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    message: String,
    hint: Option<String>,
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self {
            message,
            hint: None,
        }
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        message.to_string().into()
    }
}

impl From<LoadError> for Failure {
    fn from(e: LoadError) -> Self {
        Self {
            hint: Some(e.hint()),
            message: e.to_string(),
        }
    }
}

impl From<DeriveError> for Failure {
    fn from(e: DeriveError) -> Self {
        e.to_string().into()
    }
}

impl From<QueryError> for Failure {
    fn from(e: QueryError) -> Self {
        e.to_string().into()
    }
}

type Reply = Result<Value, Failure>;

fn get_cmd(req: &Value) -> &str {
    req.get("cmd").and_then(|v| v.as_str()).unwrap_or("")
}

fn get_id(req: &Value) -> Value {
    req.get("id").cloned().unwrap_or(Value::Null)
}

fn get_payload(req: &Value) -> &Value {
    static EMPTY: Value = Value::Null;
    req.get("payload").unwrap_or(&EMPTY)
}

fn ok(id: Value, payload: Value) -> String {
    json!({
        "id": id,
        "status": "ok",
        "payload": payload
    })
    .to_string()
}

fn err(id: Value, failure: Failure) -> String {
    let mut body = json!({
        "id": id,
        "status": "error",
        "message": failure.message
    });
    if let Some(hint) = failure.hint {
        body["hint"] = Value::String(hint);
    }
    body.to_string()
}

/// Everything the core holds for one UI session.
pub struct Session {
    config: Config,
    dataset: Result<Dataset, LoadError>,
    outbox: Outbox,
    feed: VoiceFeed,
    selector: VoiceSelector,
    speech: speech::Dispatcher,
    _voices: Subscription,
}

impl Session {
    pub fn new(config: Config, outbox: Outbox) -> Self {
        let feed = VoiceFeed::new();
        let selector = VoiceSelector::new(config.preferred_voices.clone());
        let voices = selector.attach(&feed);

        let speech = SpeechDispatcher::new(
            EventHost::new(outbox.clone(), feed.clone()),
            EventSignals::new(outbox.clone()),
            selector.clone(),
            config.speech_delay,
        );

        let dataset = Err(LoadError::NotFound {
            location: config.dataset_source.clone(),
            reason: "not loaded yet".to_string(),
        });

        Self {
            config,
            dataset,
            outbox,
            feed,
            selector,
            speech,
            _voices: voices,
        }
    }

    /// Startup load; the outcome is pushed as `dataset.ready` or `dataset.error`.
    pub fn start(&mut self) {
        let source = self.config.dataset_source.clone();
        match self.reload(&source) {
            Ok(info) => self.outbox.event("dataset.ready", info),
            Err(f) => {
                tracing::warn!(source = %source, error = %f.message, "dataset unavailable");
                self.outbox
                    .event("dataset.error", json!({ "message": f.message, "hint": f.hint }));
            }
        }
    }

    fn reload(&mut self, source: &str) -> Reply {
        self.dataset = repository::load(source, self.config.default_schema, self.config.http_timeout);

        let ds = self.dataset()?;
        let schema = ds.schema();
        let info = json!(ds.info());

        self.speech.set_strip_gloss(self.config.strips_gloss(schema));
        Ok(info)
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    fn dataset(&self) -> Result<&Dataset, Failure> {
        self.dataset.as_ref().map_err(|e| Failure::from(e.clone()))
    }

    pub fn handle(&mut self, input: &str) -> String {
        let req: Value = match serde_json::from_str(input) {
            Ok(v) => v,
            Err(_) => {
                return json!({
                    "status": "error",
                    "message": "invalid json"
                })
                .to_string();
            }
        };

        let id = get_id(&req);
        let cmd_str = get_cmd(&req);
        let payload = get_payload(&req);

        tracing::debug!(cmd = cmd_str, "request");

        let reply = match Command::from(cmd_str) {
            Command::Ping => Ok(json!({ "message": "verbo-core alive" })),

            Command::DatasetLoad => {
                let source = payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| self.config.dataset_source.clone());
                self.reload(&source)
            }

            Command::DatasetInfo => self.dataset().map(|ds| json!(ds.info())),

            Command::VerbsQuery => self.dataset().and_then(|ds| verbs::query(ds, payload)),

            Command::VerbGet => self.dataset().and_then(|ds| verbs::get(ds, payload)),

            Command::VerbForms => self.dataset().and_then(|ds| verbs::derived_forms(ds, payload)),

            Command::SpeechCapability => speech::capability(&mut self.speech, payload),

            Command::VoicesChanged => speech::voices_changed(&self.feed, &self.selector, payload),

            Command::VoiceCurrent => speech::current(&self.feed, &self.selector),

            Command::SpeechSpeak => speech::speak(&mut self.speech, payload),

            Command::SpeechEnded => speech::ended(&mut self.speech, payload),

            Command::Unknown => Err("unknown command".into()),
        };

        match reply {
            Ok(v) => ok(id, v),
            Err(f) => err(id, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::events::tests::Capture;
    use super::*;
    use crate::services::repository::tests::conjugated;
    use std::io::Write;
    use std::time::Duration;

    struct Harness {
        session: Session,
        cap: Capture,
        _file: tempfile::NamedTempFile,
    }

    impl Harness {
        fn new(items: Vec<Value>) -> Self {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(&serde_json::to_vec(&items).unwrap()).unwrap();

            let config = Config {
                dataset_source: file.path().to_string_lossy().to_string(),
                speech_delay: Duration::ZERO,
                ..Config::default()
            };

            let cap = Capture::default();
            let mut session = Session::new(config, Outbox::new(cap.clone()));
            session.start();

            Self {
                session,
                cap,
                _file: file,
            }
        }

        fn call(&mut self, cmd: &str, payload: Value) -> Value {
            let line = json!({ "id": 1, "cmd": cmd, "payload": payload }).to_string();
            let resp = self.session.handle(&line);
            self.session.outbox().line(&resp).unwrap();
            serde_json::from_str(&resp).unwrap()
        }
    }

    fn sample() -> Vec<Value> {
        vec![
            conjugated(1, "falar", "ar", false, "to speak"),
            conjugated(2, "estar", "ar", true, "to be"),
            conjugated(3, "partir", "ir", false, "to leave"),
        ]
    }

    #[test]
    fn startup_announces_dataset() {
        let h = Harness::new(sample());
        let events = h.cap.lines();
        assert_eq!(events[0]["event"], "dataset.ready");
        assert_eq!(events[0]["count"], 3);
        assert_eq!(events[0]["schema"], "conjugations");
    }

    #[test]
    fn missing_dataset_reports_hint() {
        let cap = Capture::default();
        let config = Config {
            dataset_source: "/nonexistent/conjugations.json".into(),
            ..Config::default()
        };
        let mut session = Session::new(config, Outbox::new(cap.clone()));
        session.start();

        assert_eq!(cap.lines()[0]["event"], "dataset.error");

        let resp: Value =
            serde_json::from_str(&session.handle(r#"{"id":9,"cmd":"verbs.query"}"#)).unwrap();
        assert_eq!(resp["status"], "error");
        assert_eq!(resp["id"], 9);
        assert_eq!(resp["hint"], "add /nonexistent/conjugations.json then reload");
    }

    #[test]
    fn query_filters_then_searches() {
        let mut h = Harness::new(sample());

        let resp = h.call("verbs.query", json!({ "filter": "ar", "search": "SPEA" }));
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["payload"]["count"], 1);
        assert_eq!(resp["payload"]["total"], 3);
        assert_eq!(resp["payload"]["verbs"][0]["verb"], "falar");

        let resp = h.call("verbs.query", json!({ "filter": "irregular" }));
        assert_eq!(resp["payload"]["verbs"][0]["verb"], "estar");

        let resp = h.call("verbs.query", Value::Null);
        assert_eq!(resp["payload"]["count"], 3);

        let resp = h.call("verbs.query", json!({ "filter": "xx" }));
        assert_eq!(resp["status"], "error");
    }

    #[test]
    fn forms_for_expanded_card() {
        let mut h = Harness::new(sample());
        let resp = h.call("verb.forms", json!({ "rank": 1 }));
        let forms = &resp["payload"]["forms"];

        assert_eq!(forms["indicativo"].as_array().unwrap().len(), 5);
        assert_eq!(forms["subjuntivo"][2]["label"], "SUBJ. FUTURO");
        assert_eq!(forms["personal_infinitive"][3], "falarmos");
        assert_eq!(forms["imperativo"]["afirmativo"][0], json!(["tu", "fala"]));

        let resp = h.call("verb.forms", json!({ "rank": 42 }));
        assert_eq!(resp["message"], "no verb with rank 42");
    }

    #[test]
    fn missing_tense_fails_the_request() {
        let mut broken = conjugated(1, "falar", "ar", false, "");
        broken["conjugations"]["subjuntivo"]
            .as_object_mut()
            .unwrap()
            .remove("imperfeito");
        let mut h = Harness::new(vec![broken]);

        let resp = h.call("verb.forms", json!({ "rank": 1 }));
        assert_eq!(resp["status"], "error");
        assert_eq!(resp["message"], "falar: subjuntivo has no tense 'imperfeito'");
    }

    #[test]
    fn speak_is_noop_until_capability_declared() {
        let mut h = Harness::new(sample());
        h.cap.take();

        let resp = h.call("speech.speak", json!({ "text": "falar" }));
        assert_eq!(resp["payload"]["utterance_id"], Value::Null);
        assert!(h.cap.take().iter().all(|v| v.get("event").is_none()));
    }

    #[test]
    fn speech_round_trip_through_events() {
        let mut h = Harness::new(sample());
        h.call("speech.capability", json!({ "available": true }));

        let resp = h.call(
            "voices.changed",
            json!({ "voices": [
                { "name": "Samantha", "lang": "en-US" },
                { "name": "Google português de Portugal", "lang": "pt-PT" }
            ]}),
        );
        assert_eq!(resp["payload"]["voice"]["name"], "Google português de Portugal");
        h.cap.take();

        let first = h.call("speech.speak", json!({ "text": "falar", "control_id": "a" }));
        let second = h.call("speech.speak", json!({ "text": "comer", "control_id": "b" }));
        assert_eq!(first["payload"]["utterance_id"], 1);
        assert_eq!(second["payload"]["utterance_id"], 2);

        let stale = h.call("speech.ended", json!({ "utterance_id": 1 }));
        assert_eq!(stale["payload"]["accepted"], false);
        let done = h.call("speech.ended", json!({ "utterance_id": 2 }));
        assert_eq!(done["payload"]["accepted"], true);

        let events: Vec<String> = h
            .cap
            .take()
            .into_iter()
            .map(|v| match v.get("event").and_then(|e| e.as_str()) {
                Some("speech.signal") => format!("{} {}", v["state"].as_str().unwrap(), v["control_id"].as_str().unwrap()),
                Some(e) => e.to_string(),
                None => "response".to_string(),
            })
            .collect();

        assert_eq!(
            events,
            [
                "speech.cancel",
                "started a",
                "speech.speak",
                "response",
                "interrupted a",
                "speech.cancel",
                "started b",
                "speech.speak",
                "response",
                "response",
                "ended b",
                "response",
            ]
        );
    }

    #[test]
    fn empty_speak_stops_speech() {
        let mut h = Harness::new(sample());
        h.call("speech.capability", json!({ "available": true }));
        h.call("speech.speak", json!({ "text": "falar", "control_id": "a" }));
        h.cap.take();

        let resp = h.call("speech.speak", json!({ "text": "" }));
        assert_eq!(resp["payload"]["utterance_id"], Value::Null);

        let events = h.cap.take();
        assert_eq!(events[0]["event"], "speech.signal");
        assert_eq!(events[0]["state"], "interrupted");
        assert_eq!(events[0]["control_id"], "a");
        assert_eq!(events[1]["event"], "speech.cancel");
        assert_eq!(events.len(), 3);

        let late = h.call("speech.ended", json!({ "utterance_id": 1 }));
        assert_eq!(late["payload"]["accepted"], false);
    }

    #[test]
    fn unknown_command_and_bad_json() {
        let mut h = Harness::new(sample());
        let resp = h.call("verbs.explode", Value::Null);
        assert_eq!(resp["message"], "unknown command");

        let resp: Value = serde_json::from_str(&h.session.handle("{nope")).unwrap();
        assert_eq!(resp["message"], "invalid json");
    }
}
