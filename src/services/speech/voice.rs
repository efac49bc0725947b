use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::model::voice::Voice;

pub const DEFAULT_PREFERRED_VOICES: [&str; 3] = [
    "Google português de Portugal",
    "Microsoft Duarte Online (Natural) - Portuguese (Portugal)",
    "Microsoft Maria Online (Natural) - Portuguese (Portugal)",
];

fn lang_starts_with(voice: &Voice, prefix: &str) -> bool {
    voice.lang.to_lowercase().starts_with(prefix)
}

/// Locale-only fallback: first pt-PT voice, else first pt voice.
pub fn locale_fallback(voices: &[Voice]) -> Option<&Voice> {
    voices
        .iter()
        .find(|v| lang_starts_with(v, "pt-pt"))
        .or_else(|| voices.iter().find(|v| lang_starts_with(v, "pt")))
}

/// Preferred names win, then the locale fallback.
///
/// Between several preferred voices the order of `preferred` decides, not the
/// host's voice order: with both Maria and Duarte installed, Duarte is picked
/// whichever the host lists first.
pub fn select<'a>(voices: &'a [Voice], preferred: &[String]) -> Option<&'a Voice> {
    preferred
        .iter()
        .find_map(|name| voices.iter().find(|v| &v.name == name))
        .or_else(|| locale_fallback(voices))
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Unresolved,
    Resolved(Voice),
}

/// Shared handle; clones see the same resolution.
#[derive(Debug, Clone)]
pub struct VoiceSelector {
    preferred: Rc<[String]>,
    state: Rc<RefCell<Selection>>,
}

impl VoiceSelector {
    pub fn new(preferred: Vec<String>) -> Self {
        Self {
            preferred: preferred.into(),
            state: Rc::new(RefCell::new(Selection::Unresolved)),
        }
    }

    /// Recomputes from scratch and overwrites whatever was resolved before.
    pub fn resolve(&self, voices: &[Voice]) -> Option<Voice> {
        let picked = select(voices, &self.preferred).cloned();

        match &picked {
            Some(v) => tracing::debug!(name = %v.name, lang = %v.lang, "voice resolved"),
            None => tracing::debug!(available = voices.len(), "no portuguese voice, using platform default"),
        }

        *self.state.borrow_mut() = match &picked {
            Some(v) => Selection::Resolved(v.clone()),
            None => Selection::Unresolved,
        };

        picked
    }

    pub fn selection(&self) -> Selection {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Voice> {
        match &*self.state.borrow() {
            Selection::Resolved(v) => Some(v.clone()),
            Selection::Unresolved => None,
        }
    }

    /// Re-resolves on every voice-list change until the subscription drops.
    pub fn attach(&self, feed: &VoiceFeed) -> Subscription {
        let selector = self.clone();
        feed.subscribe(move |voices| {
            selector.resolve(voices);
        })
    }
}

type Callback = Box<dyn FnMut(&[Voice])>;

struct Listener {
    active: Rc<Cell<bool>>,
    callback: Callback,
}

#[derive(Default)]
struct FeedInner {
    listeners: RefCell<Vec<Listener>>,
    snapshot: RefCell<Vec<Voice>>,
    dispatching: Cell<bool>,
    dirty: Cell<bool>,
}

/// Voice-list notifications from the host. Single-threaded.
#[derive(Clone, Default)]
pub struct VoiceFeed {
    inner: Rc<FeedInner>,
}

impl VoiceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Voice> {
        self.inner.snapshot.borrow().clone()
    }

    /// The callback runs once right away with the current snapshot.
    pub fn subscribe(&self, callback: impl FnMut(&[Voice]) + 'static) -> Subscription {
        let active = Rc::new(Cell::new(true));
        let mut listener = Listener {
            active: Rc::clone(&active),
            callback: Box::new(callback),
        };

        let snapshot = self.snapshot();
        (listener.callback)(&snapshot);

        self.inner.listeners.borrow_mut().push(listener);
        Subscription { active }
    }

    /// A publish from inside a listener is folded into another pass with the newest list.
    pub fn publish(&self, voices: Vec<Voice>) {
        *self.inner.snapshot.borrow_mut() = voices;

        if self.inner.dispatching.get() {
            self.inner.dirty.set(true);
            return;
        }

        self.inner.dispatching.set(true);
        loop {
            self.inner.dirty.set(false);
            let snapshot = self.snapshot();

            let mut running = std::mem::take(&mut *self.inner.listeners.borrow_mut());
            for listener in running.iter_mut() {
                if listener.active.get() {
                    (listener.callback)(&snapshot);
                }
            }

            // keep listeners added during this pass
            let mut slot = self.inner.listeners.borrow_mut();
            running.append(&mut slot);
            running.retain(|l| l.active.get());
            *slot = running;
            drop(slot);

            if !self.inner.dirty.get() {
                break;
            }
        }
        self.inner.dispatching.set(false);
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.active.get())
            .count()
    }
}

/// Unregisters its listener when dropped.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct Subscription {
    active: Rc<Cell<bool>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.set(false);
    }
}
