//! Meta Conversions API Purchase Bridge Library
//!
//! This library turns loosely-typed purchase leads (Google Sheets scripts,
//! Make scenarios, Keitaro redirects) into hashed, deduplicated `Purchase`
//! events for the Meta Conversions API, and provides the HTTP handlers that
//! expose it.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `attribution`: Attribution mode and dedup key selection.
//! - `capi_client`: Conversions API client.
//! - `capi_models`: Conversions API payload models.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `event_time`: Event timestamp resolution and clocks.
//! - `handlers`: HTTP request handlers and router.
//! - `identity`: Identity normalization and hashing.
//! - `lead_models`: Inbound lead payload model.
//! - `phone`: Argentine phone canonicalization.
//! - `pipeline`: End-to-end purchase pipeline.
//! - `redirect_handler`: WhatsApp ad-click redirect.
//! - `sanitize`: Optional field sanitizer.

pub mod api;
pub mod core;
pub mod integrations;

pub mod attribution;
pub mod capi_client;
pub mod capi_models;
pub mod config;
pub mod errors;
pub mod event_time;
pub mod handlers;
pub mod identity;
pub mod lead_models;
pub mod phone;
pub mod pipeline;
pub mod redirect_handler;
pub mod sanitize;
