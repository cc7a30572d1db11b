pub mod context_source;
pub mod exchange_client;
pub mod language_model;
