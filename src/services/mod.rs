pub mod digest;
pub mod forms;
pub mod query;
pub mod repository;
pub mod speech;
pub mod text;
