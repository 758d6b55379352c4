//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `AccrualEngine`, the single owner of the accrual
//! state machine. It persists through a boxed settings-store port and
//! publishes snapshots over a `tokio::sync::watch` channel.

pub mod engine;
