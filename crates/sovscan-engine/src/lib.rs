//! Batch-scan orchestration engine.
//!
//! Turns a question set and a provider/iteration configuration into many
//! independent provider calls, tracks their completion, survives partial
//! failure, pauses and resumes without losing or duplicating work, enforces
//! the scan's prepaid credit budget, and folds raw responses into exposure,
//! sentiment and competitor statistics.
//!
//! The engine is generic over [`sovscan_core::ScanStore`] (durable state) and
//! [`sovscan_providers::CompletionApi`] (the provider capability), so the
//! whole lifecycle is exercised in tests against an in-memory store and
//! scripted providers.

pub mod aggregate;
mod dispatch;
mod error;
mod executor;
mod ledger;
mod orchestrator;
mod retry;

#[cfg(test)]
mod testutil;

pub use error::EngineError;
pub use ledger::{CreditLedger, Reservation};
pub use orchestrator::{EngineConfig, ScanOrchestrator, ScanOutcome};
