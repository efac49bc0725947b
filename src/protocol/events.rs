use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use serde_json::{json, Value};

use crate::model::voice::{Utterance, Voice};
use crate::services::speech::host::{SignalSink, SpeechHost, SpeechSignal};
use crate::services::speech::voice::VoiceFeed;

/// Line-oriented writer shared by responses and pushed events.
#[derive(Clone)]
pub struct Outbox {
    out: Rc<RefCell<Box<dyn Write>>>,
}

impl Outbox {
    pub fn new(out: impl Write + 'static) -> Self {
        Self {
            out: Rc::new(RefCell::new(Box::new(out))),
        }
    }

    pub fn line(&self, line: &str) -> io::Result<()> {
        let mut out = self.out.borrow_mut();
        writeln!(out, "{line}")?;
        out.flush()
    }

    /// Written and flushed immediately, ahead of the pending response.
    pub fn event(&self, name: &str, body: Value) {
        let mut msg = json!({ "event": name });
        if let (Some(dst), Value::Object(src)) = (msg.as_object_mut(), body) {
            dst.extend(src);
        }

        if let Err(e) = self.line(&msg.to_string()) {
            tracing::warn!(event = name, error = %e, "failed to write event");
        }
    }
}

/// Forwards speech to the presentation layer, which owns the real engine.
pub struct EventHost {
    outbox: Outbox,
    feed: VoiceFeed,
    available: bool,
}

impl EventHost {
    pub fn new(outbox: Outbox, feed: VoiceFeed) -> Self {
        Self {
            outbox,
            feed,
            available: false,
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }
}

impl SpeechHost for EventHost {
    fn is_available(&self) -> bool {
        self.available
    }

    fn voices(&self) -> Vec<Voice> {
        self.feed.snapshot()
    }

    fn cancel(&mut self) {
        self.outbox.event("speech.cancel", json!({}));
    }

    fn speak(&mut self, utterance: &Utterance) {
        self.outbox
            .event("speech.speak", json!({ "utterance": utterance }));
    }
}

pub struct EventSignals {
    outbox: Outbox,
}

impl EventSignals {
    pub fn new(outbox: Outbox) -> Self {
        Self { outbox }
    }
}

impl SignalSink for EventSignals {
    fn signal(&mut self, signal: SpeechSignal) {
        let body = serde_json::to_value(&signal).unwrap_or(Value::Null);
        self.outbox.event("speech.signal", body);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory sink that can be read back as JSON lines.
    #[derive(Clone, Default)]
    pub(crate) struct Capture(Rc<RefCell<Vec<u8>>>);

    impl Capture {
        pub(crate) fn lines(&self) -> Vec<Value> {
            String::from_utf8(self.0.borrow().clone())
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }

        pub(crate) fn take(&self) -> Vec<Value> {
            let lines = self.lines();
            self.0.borrow_mut().clear();
            lines
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn event_merges_body_fields() {
        let cap = Capture::default();
        let outbox = Outbox::new(cap.clone());
        outbox.event("speech.signal", json!({ "control_id": "btn", "state": "started" }));

        assert_eq!(
            cap.lines(),
            vec![json!({ "event": "speech.signal", "control_id": "btn", "state": "started" })]
        );
    }

    #[test]
    fn host_emits_cancel_and_speak() {
        let cap = Capture::default();
        let mut host = EventHost::new(Outbox::new(cap.clone()), VoiceFeed::new());
        assert!(!host.is_available());

        host.cancel();
        host.speak(&Utterance::new(crate::model::voice::UtteranceId(7), "falar".into(), None));

        let lines = cap.lines();
        assert_eq!(lines[0]["event"], "speech.cancel");
        assert_eq!(lines[1]["event"], "speech.speak");
        assert_eq!(lines[1]["utterance"]["id"], 7);
        assert_eq!(lines[1]["utterance"]["lang"], "pt-PT");
        assert_eq!(lines[1]["utterance"]["voice"], Value::Null);
    }
}
