//! limsdb - query and access-control engine for sample-metadata tracking
//!
//! The entity layers of the tracking service (projects, participants,
//! samples, assays, sequencing groups, analyses, cohorts) all route their
//! data access through this crate:
//!
//! - [`filter`] compiles typed filter models to parameterized SQL
//! - [`access`] authorizes project-scoped operations with cached membership
//! - [`seqgroup`] runs the sequencing-group archive/recreate lifecycle
//! - [`upsert`] linearizes nested upsert trees into a safe insertion order
//! - [`storage`] defines the executor boundary all queries cross

pub mod access;
pub mod config;
pub mod filter;
pub mod observability;
pub mod seqgroup;
pub mod storage;
pub mod upsert;
