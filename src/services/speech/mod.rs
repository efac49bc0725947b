pub mod dispatcher;
pub mod host;
pub mod voice;
