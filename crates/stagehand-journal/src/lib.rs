//! # stagehand-journal
//!
//! Append-only, SHA-256 hash-chained journal of run transitions.
//!
//! ## Overview
//!
//! Every event the controller publishes is wrapped in a `JournalEntry`
//! together with its post-transition snapshot, and linked to the previous
//! entry by hash. Editing any recorded entry breaks the chain, which
//! `verify_chain` detects. The journal is the record the run auditor reads.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stagehand_journal::InMemoryJournal;
//!
//! let journal = Arc::new(InMemoryJournal::new());
//! controller.add_observer(Box::new(Arc::clone(&journal)));
//! // ... run ...
//! assert!(journal.verify_integrity());
//! let export = journal.export();
//! ```

pub mod chain;
pub mod entry;
pub mod memory;

pub use chain::{hash_entry, transcript_digest, verify_chain};
pub use entry::{JournalEntry, JournalExport};
pub use memory::InMemoryJournal;

// ── Tests ─────────────────────────────────────────────────────────────────────
