//! Locating the active note in the collections after it changes.

use crate::note::Note;

/// One of the two note collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// `dbnotes`
    Active,
    /// `binNotes`
    Bin,
}

/// What to do with an edited active note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Stored copy already has the same title and content.
    Unchanged(Collection),
    /// Overwrite the stored copy at this index.
    Replace(Collection, usize),
    /// The note is in neither collection.
    Orphan,
}

/// Decide how `active` flows back into the collections.
///
/// The bin is checked first, so an id present in both resolves to the bin
/// entry.
pub fn plan(active: &Note, notes: &[Note], bin: &[Note]) -> SyncAction {
    let found = bin
        .iter()
        .position(|n| n.id == active.id)
        .map(|i| (Collection::Bin, i, &bin[i]))
        .or_else(|| {
            notes
                .iter()
                .position(|n| n.id == active.id)
                .map(|i| (Collection::Active, i, &notes[i]))
        });
    match found {
        Some((collection, _, stored))
            if stored.content == active.content && stored.title == active.title =>
        {
            SyncAction::Unchanged(collection)
        }
        Some((collection, index, _)) => SyncAction::Replace(collection, index),
        None => SyncAction::Orphan,
    }
}
