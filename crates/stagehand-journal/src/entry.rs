//! Journal entry and export types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagehand_contracts::{event::RunEvent, ids::RunId, state::RunState};

/// One transition in the hash chain: the event and the snapshot it produced.
///
/// Changing any hashed field (`sequence`, `run_id`, `event`, `snapshot`,
/// `prev_hash`) invalidates `this_hash` and every later `prev_hash`.
/// `recorded_at` is informational and not hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the chain, starting at 0. Spans runs and resets.
    pub sequence: u64,

    /// The run this transition belongs to; `None` for resets to idle.
    pub run_id: Option<RunId>,

    pub event: RunEvent,

    /// The post-transition snapshot.
    pub snapshot: RunState,

    pub recorded_at: DateTime<Utc>,

    /// SHA-256 hash (hex) of the previous entry, or `GENESIS_HASH`.
    pub prev_hash: String,

    /// SHA-256 hash (hex) of this entry's hashed fields.
    pub this_hash: String,
}

impl JournalEntry {
    /// The `prev_hash` of the first entry: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A sealed copy of a journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalExport {
    pub entries: Vec<JournalEntry>,

    pub exported_at: DateTime<Utc>,

    /// The `this_hash` of the last entry. Empty string if the journal is empty.
    pub terminal_hash: String,
}
