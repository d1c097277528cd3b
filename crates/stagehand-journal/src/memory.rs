//! In-memory journal.
//!
//! `InMemoryJournal` is a `RunObserver`: register it with a controller
//! (usually behind an `Arc`, so the caller keeps a handle) and every
//! transition is appended to a SHA-256 hash chain.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, warn};

use stagehand_contracts::{event::RunEvent, state::RunState};
use stagehand_core::traits::RunObserver;

use crate::{
    chain::{hash_entry, verify_chain},
    entry::{JournalEntry, JournalExport},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct JournalState {
    pub(crate) entries: Vec<JournalEntry>,
    pub(crate) sequence: u64,
    /// `this_hash` of the last entry, or `GENESIS_HASH`.
    pub(crate) last_hash: String,
}

impl JournalState {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            sequence: 0,
            last_hash: JournalEntry::GENESIS_HASH.to_string(),
        }
    }
}

// ── Public journal ────────────────────────────────────────────────────────────

/// An append-only, hash-chained record of run transitions.
///
/// Nothing is persisted; the journal lives as long as its owner.
pub struct InMemoryJournal {
    pub(crate) state: Arc<Mutex<JournalState>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(JournalState::empty())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// A copy of every entry, in append order.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.lock().entries.clone()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.lock().entries.iter().map(|e| e.event.clone()).collect()
    }

    /// Every recorded snapshot, in mutation order.
    pub fn snapshots(&self) -> Vec<Arc<RunState>> {
        self.lock()
            .entries
            .iter()
            .map(|e| Arc::new(e.snapshot.clone()))
            .collect()
    }

    /// Check that the in-memory chain has not been tampered with.
    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.lock().entries)
    }

    /// Seal a copy of the journal.
    pub fn export(&self) -> JournalExport {
        let state = self.lock();
        JournalExport {
            entries: state.entries.clone(),
            exported_at: Utc::now(),
            terminal_hash: state
                .entries
                .last()
                .map(|e| e.this_hash.clone())
                .unwrap_or_default(),
        }
    }

    /// Drop every entry and restart the chain at genesis.
    pub fn clear(&self) {
        *self.lock() = JournalState::empty();
    }
}

impl Default for InMemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

// ── RunObserver impl ──────────────────────────────────────────────────────────

impl RunObserver for InMemoryJournal {
    /// Append one transition to the chain.
    ///
    /// An entry that cannot be hashed is skipped with a warning; the chain
    /// stays valid because `last_hash` is only advanced on success.
    fn on_transition(&self, event: &RunEvent, snapshot: &RunState) {
        let mut state = self.lock();
        let sequence = state.sequence;
        let prev_hash = state.last_hash.clone();

        let this_hash = match hash_entry(snapshot.run_id, sequence, event, snapshot, &prev_hash) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(sequence, kind = event.kind(), error = %e, "journal entry skipped");
                return;
            }
        };

        debug!(sequence, kind = event.kind(), "journal entry appended");
        state.entries.push(JournalEntry {
            sequence,
            run_id: snapshot.run_id,
            event: event.clone(),
            snapshot: snapshot.clone(),
            recorded_at: Utc::now(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash;
    }
}
