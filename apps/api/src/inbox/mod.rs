//! Inbox scanning: email extraction, scan endpoints and the running-scan registry.

pub mod extractor;
pub mod handlers;
pub mod links;
pub mod prompts;
pub mod registry;
