use serde::Serialize;

use crate::model::voice::{Utterance, UtteranceId, Voice};

/// The platform speech engine, driven as a black box.
pub trait SpeechHost {
    /// Feature detection; speaking on an unavailable host does nothing.
    fn is_available(&self) -> bool;

    /// Synchronous snapshot of what the platform currently offers.
    fn voices(&self) -> Vec<Voice>;

    fn cancel(&mut self);

    /// Completion comes back later through `SpeechDispatcher::on_utterance_end`.
    fn speak(&mut self, utterance: &Utterance);
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalState {
    Started,
    Ended,
    /// Superseded by a newer utterance before it completed.
    Interrupted,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SpeechSignal {
    pub control_id: String,
    pub utterance_id: UtteranceId,
    pub state: SignalState,
}

/// Receives per-control feedback, e.g. to highlight the button being spoken.
pub trait SignalSink {
    fn signal(&mut self, signal: SpeechSignal);
}
