pub mod context_sources;
pub mod exchange_client_factory;
pub mod exchange_rest_client;
pub mod openai_client;
