//! Hash-chain primitives.
//!
//! Hash input layout (bytes, in order):
//!   1. run id as UTF-8 bytes (`-` for entries without a run)
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the event
//!   5. compact JSON of the snapshot

use sha2::{Digest, Sha256};

use stagehand_contracts::{
    error::{StageError, StageResult},
    event::RunEvent,
    ids::RunId,
    state::RunState,
};

use crate::entry::JournalEntry;

/// Compute the SHA-256 hash of one journal entry.
///
/// Returns a lowercase 64-character hex string, or `StageError::Journal` if
/// the event or snapshot cannot be serialized.
pub fn hash_entry(
    run_id: Option<RunId>,
    sequence: u64,
    event: &RunEvent,
    snapshot: &RunState,
    prev_hash: &str,
) -> StageResult<String> {
    let to_json = |what: &str, value: serde_json::Result<Vec<u8>>| {
        value.map_err(|e| StageError::Journal {
            reason: format!("failed to serialize {} for hashing: {}", what, e),
        })
    };
    let event_json = to_json("event", serde_json::to_vec(event))?;
    let snapshot_json = to_json("snapshot", serde_json::to_vec(snapshot))?;
    let run = run_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());

    let mut hasher = Sha256::new();
    hasher.update(run.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&event_json);
    hasher.update(&snapshot_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify prev-hash linkage and hash correctness of every entry.
///
/// An empty chain is valid.
pub fn verify_chain(entries: &[JournalEntry]) -> bool {
    let mut expected_prev = JournalEntry::GENESIS_HASH.to_string();

    for entry in entries {
        if entry.prev_hash != expected_prev {
            return false;
        }
        let recomputed = hash_entry(
            entry.run_id,
            entry.sequence,
            &entry.event,
            &entry.snapshot,
            &entry.prev_hash,
        );
        match recomputed {
            Ok(hash) if hash == entry.this_hash => {}
            _ => return false,
        }
        expected_prev = entry.this_hash.clone();
    }

    true
}

/// SHA-256 over a log transcript, one `\n`-terminated line at a time.
///
/// Two runs with the same digest produced byte-identical logs.
pub fn transcript_digest<S: AsRef<str>>(lines: &[S]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_ref().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
