//! # Stronghold Builds
//!
//! A transactional build scheduling and resource ledger engine for
//! server-authoritative timed tasks.
//!
//! This library implements the start path, resource accounting, and
//! timer-driven completion engine behind "builds": tasks a user pays
//! resources to start and which finish at a server-computed time. Completion
//! time is computed and enforced entirely by the server; clients never supply
//! timestamps.
//!
//! ## Core Problem Solved
//!
//! Many concurrent users spending from shared balances creates real hazards:
//!
//! - **Double-spend**: two requests racing on one balance must never both
//!   succeed when only one can be covered
//! - **Orphaned state**: a deduction without a build record (or the reverse)
//!   corrupts the economy permanently
//! - **Duplicate completion**: the recurring scheduler and the startup
//!   recovery sweep can observe the same overdue build at the same time
//! - **Downtime**: builds that came due while the process was down must
//!   still complete after restart
//!
//! ## Key Features
//!
//! - **Atomic Start Transaction**: ledger deduction and record creation
//!   commit together or not at all, serialized per user
//! - **Per-Key Locking**: users are fully independent; no global lock
//! - **Idempotent Completion**: one entry point transitions a build to its
//!   terminal state exactly once, first caller wins
//! - **Non-Reentrant Scheduler**: a CAS Idle/Ticking token skips timer fires
//!   that would overlap a still-running batch
//! - **Crash Recovery**: a startup sweep completes everything left due,
//!   through the same engine as the scheduler
//! - **Pluggable Stores**: repository-style ledger/registry traits with
//!   in-memory backends and Postgres schema adapters
//!
//! ## Example
//!
//! ```rust,ignore
//! use stronghold_builds::builders::build_default_engine;
//! use stronghold_builds::config::EngineConfig;
//! use stronghold_builds::runtime::TokioTicker;
//!
//! let engine = build_default_engine(&EngineConfig::default(), None)?;
//!
//! // Complete whatever an outage left due, then start steady-state ticking.
//! let recovered = engine.reconciler.reconcile().await;
//! let ticker = TokioTicker::current();
//! engine.scheduler.run(&ticker);
//!
//! // Serve requests through the facade.
//! let record = engine
//!     .service
//!     .start_build(&"player-1".into(), "barracks", 60_000, &costs)
//!     .await?;
//! ```
//!
//! For complete examples, see `tests/build_lifecycle_test.rs`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Core engine: data model, stores, start transaction, completion machinery.
pub mod core;
/// Configuration models for the engine and its backends.
pub mod config;
/// Builders to construct engine components from configuration.
pub mod builders;
/// Infrastructure adapters for ledger and registry backends.
pub mod infra;
/// Runtime adapters (timer facility) and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
