//! Codeforge practice backend.
//!
//! Grades learner code through a remote execution service, asks a language model
//! for a short analysis plus weakness tags, keeps a per-learner weakness ledger,
//! and generates new practice questions steered by those weaknesses.

pub mod analysis;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod extractors;
pub mod generator;
pub mod grader;
pub mod ledger;
pub mod logic;
pub mod oracle;
pub mod protocol;
pub mod recorder;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod util;
