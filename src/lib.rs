//! Atlas: whois registry dump parsing and SQLite import pipeline
//!
//! This crate turns the bulk database dumps published by the five regional
//! internet registries (AFRINIC, APNIC, ARIN, LACNIC, RIPE) into one
//! relational table of address allocations:
//!
//! 1. **Classification** -- Map each dump filename to its registry of
//!    origin; unknown files are still imported, just without a source tag
//! 2. **Segmentation** -- Stream the (possibly gzip-compressed, Latin-1
//!    encoded) dump line by line, strip comments, and cut it into blocks,
//!    one per allocation object; LACNIC's pipe-delimited delegated feed is
//!    first rewritten into the same key:value block shape
//! 3. **Extraction** -- Recover the attributes of each block with a fixed
//!    table of per-field rules, and resolve its allocation identifier into
//!    canonical CIDR prefixes (an IPv4 range decomposes into the minimal
//!    exact set of blocks covering it)
//! 4. **Import** -- Fan blocks out over a bounded queue to one writer
//!    thread per core, each committing fixed-size batches on a private
//!    SQLite session
//!
//! # Architecture
//!
//! The pipeline is designed for multi-million-block dumps on a single
//! host:
//!
//! - **Streaming segmentation** -- Never holds a whole dump in memory; the
//!   producer reads and the queue bounds what is in flight
//! - **Parallel writers** -- One thread per core, no shared transactions,
//!   no locks beyond the work queue
//! - **Bounded batches** -- Sessions commit and rotate every N blocks,
//!   capping transaction size and the blast radius of a failure
//! - **Tolerant parsing** -- Malformed lines and unparseable blocks are
//!   logged and skipped; a single bad record never stops a run
//!
//! # Key Modules
//!
//! - [`registry`] -- Dump filename to registry classification
//! - [`reader`] -- Gzip-transparent ISO-8859-1 line reader
//! - [`segment`] -- Comment stripping and block segmentation
//! - [`lacnic`] -- Delegated-extended feed normalization
//! - [`extract`] -- Declarative per-field attribute extraction
//! - [`prefix`] -- Identifier parsing and range-to-CIDR decomposition
//! - [`pipeline`] -- Producer, bounded queue, and batch-writing workers
//! - [`store`] -- The `Store` contract and its SQLite implementation
//! - [`models`] -- Core data types (ExtractedFields, AllocationRecord)
//! - [`stats`] -- Thread-safe atomic counters for run metrics
//! - [`config`] -- Constants for batching and queueing

pub mod config;
pub mod extract;
pub mod lacnic;
pub mod models;
pub mod pipeline;
pub mod prefix;
pub mod reader;
pub mod registry;
pub mod segment;
pub mod stats;
pub mod store;
