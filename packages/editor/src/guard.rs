//! # Protected Execution
//!
//! Every command runs inside [`protect`]. The journal length is saved
//! before the command starts; when the command reports a [`Violation`], or
//! when a node it inserted no longer sits under the unbreakable ancestor it
//! was cached with, everything journaled since is reverted and the
//! selection restored. The caller gets a [`CommandOutcome`], never the
//! violation itself.

use crate::errors::{CommandOutcome, CommandResult, Violation};
use crate::mutations::{CursorSnapshot, MutationRecord};
use crate::selection::Selection;
use crate::tree::Tree;

/// Run `command`, rolling it back entirely on a violation
pub fn protect<F>(tree: &mut Tree, selection: &mut Selection, command: F) -> CommandOutcome
where
    F: FnOnce(&mut Tree, &mut Selection) -> CommandResult,
{
    let saved = tree.journal_len();
    let snapshot = selection.snapshot(tree);
    tree.refresh_ouids();

    let result = command(tree, selection).and_then(|_| check_ownership(tree, saved));
    match result {
        Ok(()) => CommandOutcome::Applied,
        Err(violation) => {
            tracing::warn!(%violation, records = tree.journal_len() - saved, "command rolled back");
            rollback(tree, selection, saved, &snapshot);
            CommandOutcome::RolledBack(violation)
        }
    }
}

/// Fail when a node added since `since` (or anything below it) changed
/// unbreakable owner
pub(crate) fn check_ownership(tree: &Tree, since: usize) -> CommandResult {
    for record in tree.journal_since(since) {
        let MutationRecord::Add { id, .. } = record else {
            continue;
        };
        let Some(node) = tree.live_by_oid(*id) else {
            continue;
        };
        let mut nodes = tree.descendants(node);
        nodes.push(node);
        for n in nodes {
            if let Some(cached) = tree.cached_ouid(n) {
                if tree.compute_ouid(n) != Some(cached) {
                    return Err(Violation::Unbreakable);
                }
            }
        }
    }
    Ok(())
}

/// Revert and drop every record journaled after `since`
pub(crate) fn revert_since(tree: &mut Tree, since: usize) {
    let records = tree.split_journal(since);
    let recording = tree.set_recording(false);
    for record in records.iter().rev() {
        tree.revert_record(record);
    }
    tree.set_recording(recording);
}

/// [`revert_since`], then put the selection back where `snapshot` says
pub(crate) fn rollback(tree: &mut Tree, selection: &mut Selection, since: usize, snapshot: &CursorSnapshot) {
    revert_since(tree, since);
    if let Some(restored) = Selection::from_snapshot(tree, snapshot) {
        *selection = restored;
    }
}
