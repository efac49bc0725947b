pub mod verb;
pub mod voice;
