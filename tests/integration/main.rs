//! Integration tests: payloads → fusion → finance, through the public API.

mod mock_source;
mod scenarios;
