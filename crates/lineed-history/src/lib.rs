//! History: the past/future stacks of mutating command records, plus the
//! lazy undo/redo coalescing state.
//!
//! Undo/Redo commands never touch the document directly; they only update
//! `pending_travel` and the two logical counters. The actual stack walk
//! (popping `past`, reverting, pushing `future`, or the mirror for redo)
//! happens once, in [`History::settle`], right before the next Change,
//! Delete, or Print is dispatched. A run of `5u 3r 2u` therefore costs one
//! settlement of net 4 steps, not ten.

use lineed_text::{Document, Snapshot};
use tracing::trace;

/// The two command kinds ever retained on a history stack. Print, Undo,
/// Redo, and Quit are dispatched and forgotten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutatingKind {
    Change,
    Delete,
}

/// A retained Change or Delete, holding enough state to revert itself
/// against a [`Document`] and, later, re-apply itself.
#[derive(Debug)]
pub struct MutationRecord {
    kind: MutatingKind,
    start: i64,
    end: i64,
    /// New content written by a Change; empty for Delete.
    payload: Snapshot,
    /// Content displaced by the original execution.
    prev: Snapshot,
}

impl MutationRecord {
    pub fn new_change(start: i64, end: i64, payload: Snapshot, prev: Snapshot) -> Self {
        MutationRecord {
            kind: MutatingKind::Change,
            start,
            end,
            payload,
            prev,
        }
    }

    pub fn new_delete(start: i64, end: i64, prev: Snapshot) -> Self {
        MutationRecord {
            kind: MutatingKind::Delete,
            start,
            end,
            payload: Snapshot::empty(),
            prev,
        }
    }

    pub fn kind(&self) -> MutatingKind {
        self.kind
    }

    /// Moves this record one step toward `future`: undoes its effect on
    /// `document`. For Change this is the same toggle used by [`Self::reapply`];
    /// see the module doc on why the two are one function.
    pub fn revert(&mut self, document: &mut Document) {
        match self.kind {
            MutatingKind::Change => self.toggle_change(document),
            MutatingKind::Delete => {
                if !self.prev.is_empty() {
                    document.insert(self.start, self.prev.clone());
                }
            }
        }
    }

    /// Moves this record one step toward `past`: re-executes its effect on
    /// `document`.
    pub fn reapply(&mut self, document: &mut Document) {
        match self.kind {
            MutatingKind::Change => self.toggle_change(document),
            MutatingKind::Delete => {
                let displaced = document.delete_range(self.start, self.end);
                debug_assert_eq!(
                    displaced, self.prev,
                    "redo delete displaced lines do not match the original capture"
                );
            }
        }
    }

    /// Change's revert and re-apply are the same operation: restore the
    /// window from `prev`, then swap `prev` and `payload` so the record
    /// flips which direction it would restore next time. A degenerate
    /// Change (nothing displaced, inserted at line 1) resets the whole
    /// document instead of overwriting an empty window, per spec §4.6/§9.
    fn toggle_change(&mut self, document: &mut Document) {
        if self.prev.is_empty() && self.start == 1 {
            document.replace_whole(Snapshot::empty());
        } else {
            document.overwrite(self.start, self.end, self.prev.clone());
        }
        std::mem::swap(&mut self.payload, &mut self.prev);
    }
}

/// The history of mutating commands, with lazy undo/redo settlement.
///
/// `past` and `future` are plain stacks; `past_count`/`future_count` are
/// the logical lengths the engine reasons about between ticks. While a run
/// of Undo/Redo is in progress, `pending_travel` can leave those counters
/// ahead of (or behind) what the stacks physically hold — [`Self::settle`]
/// reconciles them before the next mutation is allowed to observe the
/// document.
pub struct History {
    past: Vec<MutationRecord>,
    future: Vec<MutationRecord>,
    pending_travel: i64,
    travel_mode: bool,
    /// Count of travel runs settled in a single batched walk (SPEC_FULL.md
    /// §10.2); exists for tests and trace logs only.
    coalesced_runs: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        History {
            past: Vec::new(),
            future: Vec::new(),
            pending_travel: 0,
            travel_mode: false,
            coalesced_runs: 0,
        }
    }

    /// `pending_travel < 0` means that many commands counted here as
    /// already-undone are still sitting on the physical `past` stack (and
    /// vice versa for `future_count`); this keeps the counters accurate
    /// without settling on every query.
    pub fn past_count(&self) -> usize {
        (self.past.len() as i64 + self.pending_travel) as usize
    }

    pub fn future_count(&self) -> usize {
        (self.future.len() as i64 - self.pending_travel) as usize
    }

    pub fn travel_mode(&self) -> bool {
        self.travel_mode
    }

    pub fn pending_travel(&self) -> i64 {
        self.pending_travel
    }

    pub fn coalesced_runs(&self) -> u64 {
        self.coalesced_runs
    }

    /// Dispatches an Undo for up to `k` past commands. Only updates the
    /// counters and `pending_travel`; the stacks are untouched until
    /// [`Self::settle`] runs.
    pub fn request_undo(&mut self, k: i64) {
        let k = k.clamp(0, self.past_count() as i64);
        self.pending_travel -= k;
        self.travel_mode = true;
        trace!(
            target: "history",
            past_depth = self.past.len(),
            future_depth = self.future.len(),
            pending_travel = self.pending_travel,
            "undo_requested"
        );
    }

    /// Dispatches a Redo for up to `k` future commands. Meaningful only in
    /// travel mode; outside it there is no pending future to redo (any
    /// that existed was discarded by the branching Change/Delete), so this
    /// is a no-op rather than relying on callers to check first.
    pub fn request_redo(&mut self, k: i64) {
        if !self.travel_mode {
            return;
        }
        let k = k.clamp(0, self.future_count() as i64);
        self.pending_travel += k;
        trace!(
            target: "history",
            past_depth = self.past.len(),
            future_depth = self.future.len(),
            pending_travel = self.pending_travel,
            "redo_requested"
        );
    }

    /// Walks `pending_travel` to zero against `document`, physically
    /// popping/pushing between `past` and `future`. A no-op if nothing is
    /// pending. Called by the engine before dispatching any command other
    /// than Undo/Redo/Quit.
    pub fn settle(&mut self, document: &mut Document) {
        if self.pending_travel == 0 {
            return;
        }
        let mut steps = 0u64;
        while self.pending_travel < 0 {
            let mut record = self.past.pop().expect("pending_travel exceeds past depth");
            record.revert(document);
            self.future.push(record);
            self.pending_travel += 1;
            steps += 1;
        }
        while self.pending_travel > 0 {
            let mut record = self
                .future
                .pop()
                .expect("pending_travel exceeds future depth");
            record.reapply(document);
            self.past.push(record);
            self.pending_travel -= 1;
            steps += 1;
        }
        if steps > 1 {
            self.coalesced_runs += 1;
        }
        trace!(
            target: "history",
            past_depth = self.past.len(),
            future_depth = self.future.len(),
            steps,
            "travel_settled"
        );
    }

    /// Records an executed Change/Delete. Discards `future` first if the
    /// engine is still in travel mode (branching off an undone point
    /// forgets the abandoned future), per spec §4.5.
    pub fn record_mutation(&mut self, record: MutationRecord) {
        if self.travel_mode {
            let discarded = self.future.len();
            self.future.clear();
            self.travel_mode = false;
            self.pending_travel = 0;
            trace!(target: "history", discarded, "future_discarded_on_branch");
        }
        self.past.push(record);
        trace!(
            target: "history",
            past_depth = self.past.len(),
            "mutation_recorded"
        );
    }
}
