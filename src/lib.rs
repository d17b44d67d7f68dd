//! mediawatch - media monitoring run ledger and signal aggregation.
//!
//! Tracks the lifecycle of each batch collection run and turns the stored
//! per-article signals (sentiment, named entities, framing phrases) into
//! sentiment trends, ranked framing phrases and entity co-occurrence graphs.

#![allow(clippy::should_implement_trait)]

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod models;
pub mod query;
pub mod repository;
pub mod schema;
pub mod server;
