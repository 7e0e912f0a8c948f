pub mod cache;
pub mod config;
pub mod errors;
pub mod gmail;
pub mod inbox;
pub mod llm_client;
pub mod matching;
pub mod models;
pub mod postings;
pub mod routes;
pub mod state;
