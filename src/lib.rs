//! Core of the apiary workflow orchestration system.
//!
//! An apiary runs analysis pipelines by spawning ephemeral worker processes
//! across heterogeneous compute backends ("meadows"). The relational database
//! is the single source of truth: workers poll it for jobs, and the central
//! coordinator (the "queen") regulates worker creation, specialization,
//! accounting and death entirely through it. Multiple coordinator processes
//! may run in parallel; they never share memory, only rows.
//!
//! The pieces:
//! - [`queen::Queen`] — worker lifecycle, statistics synchronization and the
//!   worker-submission scheduler.
//! - [`meadow`] — the per-backend driver contract and the [`meadow::Valley`]
//!   federation a coordinator sees.
//! - [`data`] — narrow repositories over the hive tables.
//! - [`profiler`] — reconstruction of historical worker activity from
//!   birth/death timestamps.

#![warn(missing_docs)]

pub mod data;
pub mod error;
pub mod meadow;
pub mod profiler;
pub mod queen;
pub mod util;

pub use error::Error;
pub use queen::Queen;
