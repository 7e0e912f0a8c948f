//! Job postings imported by link: page fetching, board-specific scraping and
//! the link scan endpoint.

pub mod extractor;
pub mod handlers;
pub mod page;
pub mod prompts;
