//! relops - physical relational operators over paged tables
//!
//! Hash aggregation with a spill table, external sort-merge equi-join, and
//! regular / index-range selection, on top of a small page store and a
//! prefix-form expression evaluator.
//!
//! # Layout
//!
//! - `record`: attribute types, values, schemas and records with binary images
//! - `expr`: expression parsing and compiled evaluators
//! - `storage`: pages, pinned buffer pages, spill pools and checksummed tables
//! - `index`: ordered single-attribute index for range scans
//! - `executor`: the operators
//! - `observability`: structured JSON logging
//! - `config`: executor configuration

pub mod config;
pub mod executor;
pub mod expr;
pub mod index;
pub mod observability;
pub mod record;
pub mod storage;
