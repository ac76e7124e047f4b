//! PDF summarizer server
//!
//! Accepts PDF uploads, generates summaries and grounded chat answers
//! through an OpenAI-compatible backend, and enforces per-plan usage quotas
//! backed by an append-only usage log in SQLite.

pub mod ai;
pub mod auth;
pub mod billing;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod error;
pub mod pdf;
pub mod quota;
pub mod routes;
pub mod state;
pub mod storage;
