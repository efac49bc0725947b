#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    DatasetLoad,
    DatasetInfo,
    VerbsQuery,
    VerbGet,
    VerbForms,
    SpeechCapability,
    VoicesChanged,
    VoiceCurrent,
    SpeechSpeak,
    SpeechEnded,
    Unknown,
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "ping" => Command::Ping,
            "dataset.load" => Command::DatasetLoad,
            "dataset.info" => Command::DatasetInfo,
            "verbs.query" => Command::VerbsQuery,
            "verb.get" => Command::VerbGet,
            "verb.forms" => Command::VerbForms,
            "speech.capability" => Command::SpeechCapability,
            "voices.changed" => Command::VoicesChanged,
            "voice.current" => Command::VoiceCurrent,
            "speech.speak" => Command::SpeechSpeak,
            "speech.ended" => Command::SpeechEnded,
            _ => Command::Unknown,
        }
    }
}
