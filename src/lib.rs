//! Sales Dashboard Service Library
//!
//! This library provides the non-visual core of the sales-performance
//! dashboard: periodic polling of the spreadsheet-backed data endpoint with
//! an embedded fallback, AI coaching advice via Gemini structured output,
//! and a render-ready JSON view served over HTTP.
//!
//! # Modules
//!
//! - `api`: HTTP route tables.
//! - `core`: Domain models, formatting and prompt construction.
//! - `integrations`: External service clients (data endpoint, Gemini).
//! - `advice_service`: Gemini advice client and response validation.
//! - `config`: Configuration management.
//! - `dashboard_state`: Latest-wins holders for snapshot and advice state.
//! - `data_service`: Dashboard data refresh with fallback.
//! - `errors`: Error handling types.
//! - `fallback`: Embedded fallback dataset.
//! - `fingerprint`: Advice input fingerprints.
//! - `formatting`: Number and unit formatting.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `poller`: Background refresh loop.
//! - `prompt`: Advice prompt construction.
//! - `view`: Presentation-neutral view model.

pub mod api;
pub mod core;
pub mod integrations;

pub mod advice_service;
pub mod config;
pub mod dashboard_state;
pub mod data_service;
pub mod errors;
pub mod fallback;
pub mod fingerprint;
pub mod formatting;
pub mod handlers;
pub mod models;
pub mod poller;
pub mod prompt;
pub mod view;
