use std::thread;
use std::time::Duration;

use super::host::{SignalSink, SignalState, SpeechHost, SpeechSignal};
use super::voice::{self, VoiceSelector};
use crate::model::voice::{Utterance, UtteranceId};
use crate::services::text::strip_gloss;

struct InFlight {
    id: UtteranceId,
    control: Option<String>,
}

/// Keeps at most one utterance in flight; the latest `speak` wins.
pub struct SpeechDispatcher<H, S> {
    host: H,
    signals: S,
    selector: VoiceSelector,
    delay: Duration,
    strip_gloss: bool,
    next_id: u64,
    in_flight: Option<InFlight>,
}

impl<H: SpeechHost, S: SignalSink> SpeechDispatcher<H, S> {
    pub fn new(host: H, signals: S, selector: VoiceSelector, delay: Duration) -> Self {
        Self {
            host,
            signals,
            selector,
            delay,
            strip_gloss: false,
            next_id: 0,
            in_flight: None,
        }
    }

    pub fn set_strip_gloss(&mut self, on: bool) {
        self.strip_gloss = on;
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn in_flight(&self) -> Option<UtteranceId> {
        self.in_flight.as_ref().map(|f| f.id)
    }

    /// Returns None when nothing was spoken (no speech on the host, or nothing left to say).
    /// Empty text still cancels whatever is playing; that is how the UI stops speech.
    ///
    /// Blocks the caller for `delay` between cancel and speak, so the request loop
    /// stalls for that long on every utterance.
    pub fn speak(&mut self, text: &str, control: Option<&str>) -> Option<UtteranceId> {
        if !self.host.is_available() {
            tracing::debug!("speech unavailable, ignoring speak");
            return None;
        }

        self.supersede();

        let spoken = if self.strip_gloss {
            strip_gloss(text)
        } else {
            text.trim()
        };
        if spoken.is_empty() {
            tracing::debug!("nothing to say, speech stopped");
            return None;
        }

        self.next_id += 1;
        let id = UtteranceId(self.next_id);

        let voice = self
            .selector
            .current()
            .or_else(|| voice::locale_fallback(&self.host.voices()).cloned());
        let utterance = Utterance::new(id, spoken.to_string(), voice);

        if let Some(control_id) = control {
            self.signals.signal(SpeechSignal {
                control_id: control_id.to_string(),
                utterance_id: id,
                state: SignalState::Started,
            });
        }
        self.in_flight = Some(InFlight {
            id,
            control: control.map(str::to_string),
        });

        // Some engines drop the voice if speak follows cancel immediately.
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.host.speak(&utterance);

        Some(id)
    }

    /// Interrupts the in-flight control, if any, and cancels the host.
    fn supersede(&mut self) {
        if let Some(InFlight {
            id,
            control: Some(control_id),
        }) = self.in_flight.take()
        {
            self.signals.signal(SpeechSignal {
                control_id,
                utterance_id: id,
                state: SignalState::Interrupted,
            });
        }
        self.host.cancel();
    }

    /// Host completion callback. Completions of superseded utterances are ignored.
    pub fn on_utterance_end(&mut self, id: UtteranceId) -> bool {
        match &self.in_flight {
            Some(current) if current.id == id => {}
            _ => {
                tracing::debug!(%id, current = ?self.in_flight(), "ignoring stale completion");
                return false;
            }
        }

        if let Some(InFlight {
            id,
            control: Some(control_id),
        }) = self.in_flight.take()
        {
            self.signals.signal(SpeechSignal {
                control_id,
                utterance_id: id,
                state: SignalState::Ended,
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::voice::Voice;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct RecordingHost {
        available: bool,
        voices: Vec<Voice>,
        log: Log,
        spoken: Rc<RefCell<Vec<Utterance>>>,
    }

    impl SpeechHost for RecordingHost {
        fn is_available(&self) -> bool {
            self.available
        }

        fn voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn cancel(&mut self) {
            self.log.borrow_mut().push("cancel".into());
        }

        fn speak(&mut self, utterance: &Utterance) {
            self.log.borrow_mut().push(format!("speak {} {}", utterance.id, utterance.text));
            self.spoken.borrow_mut().push(utterance.clone());
        }
    }

    struct RecordingSink(Log);

    impl SignalSink for RecordingSink {
        fn signal(&mut self, s: SpeechSignal) {
            let state = match s.state {
                SignalState::Started => "started",
                SignalState::Ended => "ended",
                SignalState::Interrupted => "interrupted",
            };
            self.0
                .borrow_mut()
                .push(format!("{state} {} {}", s.control_id, s.utterance_id));
        }
    }

    struct Fixture {
        dispatcher: SpeechDispatcher<RecordingHost, RecordingSink>,
        log: Log,
        spoken: Rc<RefCell<Vec<Utterance>>>,
        selector: VoiceSelector,
    }

    fn fixture(available: bool, voices: Vec<Voice>) -> Fixture {
        let log: Log = Rc::default();
        let spoken: Rc<RefCell<Vec<Utterance>>> = Rc::default();
        let selector = VoiceSelector::new(vec!["Google português de Portugal".into()]);
        let host = RecordingHost {
            available,
            voices,
            log: Rc::clone(&log),
            spoken: Rc::clone(&spoken),
        };
        let dispatcher = SpeechDispatcher::new(
            host,
            RecordingSink(Rc::clone(&log)),
            selector.clone(),
            Duration::ZERO,
        );
        Fixture {
            dispatcher,
            log,
            spoken,
            selector,
        }
    }

    #[test]
    fn unavailable_host_is_a_silent_noop() {
        let mut f = fixture(false, vec![]);
        assert_eq!(f.dispatcher.speak("falar", Some("btn")), None);
        assert!(f.log.borrow().is_empty());
    }

    #[test]
    fn cancel_then_start_then_speak() {
        let mut f = fixture(true, vec![]);
        let id = f.dispatcher.speak("falar", Some("btn-1")).unwrap();

        assert_eq!(*f.log.borrow(), ["cancel", "started btn-1 u1", "speak u1 falar"]);
        assert_eq!(f.dispatcher.in_flight(), Some(id));

        let spoken = f.spoken.borrow();
        let u = &spoken[0];
        assert_eq!(u.lang, "pt-PT");
        assert_eq!(u.rate, 0.98);
        assert_eq!(u.pitch, 1.0);
        assert_eq!(u.volume, 1.0);
    }

    #[test]
    fn second_speak_supersedes_first() {
        let mut f = fixture(true, vec![]);
        let first = f.dispatcher.speak("falar", Some("a")).unwrap();
        let second = f.dispatcher.speak("comer", Some("b")).unwrap();
        f.log.borrow_mut().clear();

        // the host may still report the first one finishing
        assert!(!f.dispatcher.on_utterance_end(first));
        assert!(f.dispatcher.on_utterance_end(second));
        assert!(!f.dispatcher.on_utterance_end(second));

        assert_eq!(*f.log.borrow(), ["ended b u2"]);
        assert_eq!(f.dispatcher.in_flight(), None);
    }

    #[test]
    fn superseded_control_is_interrupted_before_new_start() {
        let mut f = fixture(true, vec![]);
        f.dispatcher.speak("falar", Some("a"));
        f.dispatcher.speak("comer", Some("b"));

        assert_eq!(
            *f.log.borrow(),
            [
                "cancel",
                "started a u1",
                "speak u1 falar",
                "interrupted a u1",
                "cancel",
                "started b u2",
                "speak u2 comer",
            ]
        );
    }

    #[test]
    fn empty_text_stops_current_utterance() {
        let mut f = fixture(true, vec![]);
        let first = f.dispatcher.speak("falar", Some("a")).unwrap();
        f.log.borrow_mut().clear();

        assert_eq!(f.dispatcher.speak("  ", None), None);
        assert_eq!(*f.log.borrow(), ["interrupted a u1", "cancel"]);
        assert_eq!(f.dispatcher.in_flight(), None);

        // the cancelled utterance may still report completion
        assert!(!f.dispatcher.on_utterance_end(first));
        assert_eq!(f.spoken.borrow().len(), 1);
    }

    #[test]
    fn no_signals_without_control() {
        let mut f = fixture(true, vec![]);
        let id = f.dispatcher.speak("falar", None).unwrap();
        assert!(f.dispatcher.on_utterance_end(id));
        assert_eq!(*f.log.borrow(), ["cancel", "speak u1 falar"]);
    }

    #[test]
    fn uses_resolved_voice_else_locale_fallback() {
        let mut f = fixture(
            true,
            vec![Voice::new("Luciana", "pt-BR"), Voice::new("Joana", "pt-PT")],
        );

        f.dispatcher.speak("falar", None);
        assert_eq!(f.spoken.borrow()[0].voice.as_ref().map(|v| v.name.as_str()), Some("Joana"));

        f.selector.resolve(&[Voice::new("Google português de Portugal", "pt-PT")]);
        f.dispatcher.speak("comer", None);
        assert_eq!(
            f.spoken.borrow()[1].voice.as_ref().map(|v| v.name.as_str()),
            Some("Google português de Portugal")
        );
    }

    #[test]
    fn no_voice_means_platform_default() {
        let mut f = fixture(true, vec![Voice::new("Samantha", "en-US")]);
        f.dispatcher.speak("falar", None);
        assert!(f.spoken.borrow()[0].voice.is_none());
    }

    #[test]
    fn gloss_stripping_is_optional() {
        let mut f = fixture(true, vec![]);
        f.dispatcher.speak("Eu falo – I speak", None);
        f.dispatcher.set_strip_gloss(true);
        f.dispatcher.speak("Eu falo – I speak", None);
        assert_eq!(f.dispatcher.speak("– only gloss", None), None);

        let texts: Vec<String> = f.spoken.borrow().iter().map(|u| u.text.clone()).collect();
        assert_eq!(texts, ["Eu falo – I speak", "Eu falo"]);
    }
}
