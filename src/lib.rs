//! paywatch — inbox payment-notification watcher.
//!
//! Polls a message source for peer-payment notifications, parses them
//! into canonical payment records, deduplicates against a durable store
//! plus an in-process cache, and forwards each new payment exactly once
//! to a notification sink.

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod parsers;
pub mod pipeline;
pub mod record;
pub mod schedule;
pub mod sink;
pub mod source;
pub mod store;
