//! The notes store.
//!
//! Holds both note collections, the active note, pins, quick links and
//! preferences. Mutations are synchronous and update memory at once;
//! collection writes are debounced per persisted key and performed by
//! [`NoteStore::flush_due`] / [`NoteStore::flush_all`]. Subscribers hear
//! about every change.
//!
//! Every note mutation goes through [`NoteStore::edit_collection`].

use std::collections::BTreeMap;
use std::sync::Arc;

use placenoter_editor_core::{Editor, is_valid_url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use web_time::Instant;

use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::error::{NotesError, QuickLinkError, StorageError};
use crate::note::{Note, QuickLink};
use crate::preferences::{Preferences, Theme};
use crate::storage::{KeyValueStore, keys};
use crate::sync::{self, Collection, SyncAction};
use crate::transfer::{ExportData, parse_import};

/// Source of "now" for debounce deadlines.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

/// A persisted key written through the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Notes,
    BinNotes,
    QuickLinks,
    QuickLinksOrder,
    PinnedNoteIds,
    LastActiveNoteId,
}

impl Slot {
    pub fn key(self) -> &'static str {
        match self {
            Self::Notes => keys::NOTES,
            Self::BinNotes => keys::BIN_NOTES,
            Self::QuickLinks => keys::QUICK_LINKS,
            Self::QuickLinksOrder => keys::QUICK_LINKS_ORDER,
            Self::PinnedNoteIds => keys::PINNED_NOTE_IDS,
            Self::LastActiveNoteId => keys::LAST_ACTIVE_NOTE_ID,
        }
    }

    fn of(collection: Collection) -> Self {
        match collection {
            Collection::Active => Self::Notes,
            Collection::Bin => Self::BinNotes,
        }
    }
}

/// The single edit primitive over a note collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEdit {
    /// Overwrite the entry with the same id.
    Replace(Note),
    Remove(String),
    Prepend(Note),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    NotesChanged(Collection),
    ActiveNoteChanged(Option<String>),
    PinsChanged,
    QuickLinksChanged,
    PreferencesChanged,
    Imported,
    Persisted(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn Fn(&StoreEvent) + Send + Sync>;

pub struct NoteStore<S> {
    storage: S,
    config: SyncConfig,
    clock: Clock,
    notes: Arc<Vec<Note>>,
    bin: Arc<Vec<Note>>,
    active: Option<Note>,
    pinned: Vec<String>,
    quick_links: BTreeMap<String, QuickLink>,
    quick_links_order: Vec<String>,
    preferences: Preferences,
    writes: Debouncer<Slot, ()>,
    title_drafts: Debouncer<String, String>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl<S: KeyValueStore> NoteStore<S> {
    /// An empty store. Nothing is read from `storage`.
    pub fn new(storage: S, config: SyncConfig) -> Self {
        Self {
            storage,
            writes: Debouncer::new(config.debounce),
            title_drafts: Debouncer::new(config.debounce),
            config,
            clock: Arc::new(Instant::now),
            notes: Arc::default(),
            bin: Arc::default(),
            active: None,
            pinned: Vec::new(),
            quick_links: BTreeMap::new(),
            quick_links_order: Vec::new(),
            preferences: Preferences::default(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Read everything from `storage`. Missing collections are created
    /// empty; an empty quick-link order is seeded from the stored links.
    pub async fn load(storage: S, config: SyncConfig) -> Result<Self, NotesError> {
        let mut store = Self::new(storage, config);
        store.notes = Arc::new(store.read_or_init(keys::NOTES).await?);
        store.bin = Arc::new(store.read_or_init(keys::BIN_NOTES).await?);
        store.quick_links = store.read_or_init(keys::QUICK_LINKS).await?;
        store.quick_links_order = store.read_or_init(keys::QUICK_LINKS_ORDER).await?;
        store.pinned = store.read(keys::PINNED_NOTE_IDS).await?.unwrap_or_default();

        if store.quick_links_order.is_empty() && !store.quick_links.is_empty() {
            store.quick_links_order = store.quick_links.keys().cloned().collect();
            store
                .write_now(keys::QUICK_LINKS_ORDER, &store.quick_links_order)
                .await?;
        }

        let defaults = Preferences::default();
        store.preferences = Preferences {
            last_active_note_id: store
                .read::<Option<String>>(keys::LAST_ACTIVE_NOTE_ID)
                .await?
                .flatten(),
            theme: store.read(keys::THEME).await?.unwrap_or(defaults.theme),
            spellcheck: store
                .read(keys::SPELLCHECK)
                .await?
                .unwrap_or(defaults.spellcheck),
            sidebar_open: store
                .read(keys::SIDEBAR)
                .await?
                .unwrap_or(defaults.sidebar_open),
        };
        store.active = store
            .preferences
            .last_active_note_id
            .as_deref()
            .and_then(|id| store.find(id))
            .map(|(_, note)| note.clone());

        tracing::debug!(
            notes = store.notes.len(),
            bin = store.bin.len(),
            quick_links = store.quick_links.len(),
            "notes loaded"
        );
        Ok(store)
    }

    /// Replace the time source used for debounce deadlines.
    pub fn with_clock(mut self, clock: impl Fn() -> Instant + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    // === Accessors ===

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn bin_notes(&self) -> &[Note] {
        &self.bin
    }

    /// Shared snapshot of a collection. Later edits copy rather than touch it.
    pub fn snapshot(&self, collection: Collection) -> Arc<Vec<Note>> {
        match collection {
            Collection::Active => Arc::clone(&self.notes),
            Collection::Bin => Arc::clone(&self.bin),
        }
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.active.as_ref()
    }

    pub fn active_note_id(&self) -> Option<&str> {
        self.active.as_ref().map(|n| n.id.as_str())
    }

    pub fn pinned_note_ids(&self) -> &[String] {
        &self.pinned
    }

    /// Pinned notes in pin order. Ids without an active note are skipped.
    pub fn pinned_notes(&self) -> Vec<&Note> {
        self.pinned
            .iter()
            .filter_map(|id| self.notes.iter().find(|n| &n.id == id))
            .collect()
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.pinned.iter().any(|p| p == id)
    }

    /// Active notes whose title or text contains `term`.
    pub fn search_notes(&self, term: &str) -> Vec<&Note> {
        self.notes.iter().filter(|n| n.matches(term)).collect()
    }

    /// Quick links in display order.
    pub fn quick_links(&self) -> Vec<&QuickLink> {
        self.quick_links_order
            .iter()
            .filter_map(|id| self.quick_links.get(id))
            .collect()
    }

    pub fn quick_link(&self, id: &str) -> Option<&QuickLink> {
        self.quick_links.get(id)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.writes.is_empty() || !self.title_drafts.is_empty()
    }

    /// When the next debounced write or title draft falls due.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.writes.next_deadline(), self.title_drafts.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn find(&self, id: &str) -> Option<(Collection, &Note)> {
        self.bin
            .iter()
            .find(|n| n.id == id)
            .map(|n| (Collection::Bin, n))
            .or_else(|| {
                self.notes
                    .iter()
                    .find(|n| n.id == id)
                    .map(|n| (Collection::Active, n))
            })
    }

    // === Subscribers ===

    pub fn subscribe(
        &mut self,
        subscriber: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn emit(&self, event: StoreEvent) {
        for (_, subscriber) in &self.subscribers {
            subscriber(&event);
        }
    }

    fn schedule(&mut self, slot: Slot) {
        let now = (self.clock)();
        self.writes.schedule(slot, (), now);
    }

    // === Collections ===

    /// Apply one edit to one collection and schedule its write.
    ///
    /// Returns false, with nothing scheduled, when a `Replace` or `Remove`
    /// finds no entry with that id.
    pub fn edit_collection(&mut self, collection: Collection, edit: CollectionEdit) -> bool {
        let list = match collection {
            Collection::Active => &mut self.notes,
            Collection::Bin => &mut self.bin,
        };
        let changed = match edit {
            CollectionEdit::Replace(note) => match list.iter().position(|n| n.id == note.id) {
                Some(i) => {
                    Arc::make_mut(list)[i] = note;
                    true
                }
                None => false,
            },
            CollectionEdit::Remove(id) => match list.iter().position(|n| n.id == id) {
                Some(i) => {
                    Arc::make_mut(list).remove(i);
                    true
                }
                None => false,
            },
            CollectionEdit::Prepend(note) => {
                Arc::make_mut(list).insert(0, note);
                true
            }
        };
        if changed {
            self.schedule(Slot::of(collection));
            self.emit(StoreEvent::NotesChanged(collection));
        }
        changed
    }

    /// Push the in-memory active note into whichever collection holds it.
    fn sync_active(&mut self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        match sync::plan(active, &self.notes, &self.bin) {
            SyncAction::Unchanged(_) => false,
            SyncAction::Replace(collection, _) => {
                let note = active.clone();
                self.edit_collection(collection, CollectionEdit::Replace(note))
            }
            SyncAction::Orphan => {
                tracing::error!(
                    id = %active.id,
                    title = %active.title,
                    "active note is in neither notes nor binNotes"
                );
                false
            }
        }
    }

    fn set_active(&mut self, next: Option<Note>) {
        let next_id = next.as_ref().map(|n| n.id.clone());
        if let Some(prev) = &self.active {
            if Some(&prev.id) != next_id.as_ref()
                && self.title_drafts.cancel(&prev.id).is_some()
            {
                tracing::debug!(id = %prev.id, "title draft dropped on note switch");
            }
        }
        self.active = next;
        self.preferences.last_active_note_id = next_id.clone();
        self.schedule(Slot::LastActiveNoteId);
        self.emit(StoreEvent::ActiveNoteChanged(next_id));
    }

    /// Open a blank note. An existing note with no title and no text is
    /// reused instead of adding another. Returns the note id.
    pub fn create_note(&mut self) -> String {
        if let Some(empty) = self.notes.iter().find(|n| n.is_empty()).cloned() {
            tracing::debug!(id = %empty.id, "reusing empty note");
            let id = empty.id.clone();
            self.set_active(Some(empty));
            return id;
        }
        let note = Note::new_empty();
        let id = note.id.clone();
        self.edit_collection(Collection::Active, CollectionEdit::Prepend(note.clone()));
        self.set_active(Some(note));
        id
    }

    /// Make the note with `id` active. Looks in the bin first.
    pub fn set_active_note(&mut self, id: &str) -> Result<(), NotesError> {
        let note = self
            .find(id)
            .map(|(_, note)| note.clone())
            .ok_or_else(|| NotesError::NoteNotFound { id: id.to_string() })?;
        self.set_active(Some(note));
        Ok(())
    }

    pub fn clear_active_note(&mut self) {
        if self.active.is_some() {
            self.set_active(None);
        }
    }

    /// New editor HTML for the active note. Returns whether a collection
    /// changed.
    pub fn update_active_content(&mut self, html: &str) -> bool {
        let Some(active) = &mut self.active else {
            return false;
        };
        if active.content == html.trim() {
            return false;
        }
        active.set_content(html);
        self.sync_active()
    }

    pub fn update_active_title(&mut self, title: &str) -> bool {
        let Some(active) = &mut self.active else {
            return false;
        };
        if active.title == title {
            return false;
        }
        active.title = title.to_string();
        self.sync_active()
    }

    /// Debounced title input for the active note. Committed by
    /// `flush_due` once the window passes; dropped if another note becomes
    /// active first.
    pub fn set_title_draft(&mut self, title: &str) -> bool {
        let Some(id) = self.active_note_id().map(str::to_string) else {
            return false;
        };
        let now = (self.clock)();
        self.title_drafts.schedule(id, title.to_string(), now);
        true
    }

    pub fn rename_note(&mut self, id: &str, title: &str) -> Result<(), NotesError> {
        if self.active_note_id() == Some(id) {
            self.update_active_title(title);
            return Ok(());
        }
        let (collection, note) = self
            .find(id)
            .map(|(c, n)| (c, n.clone()))
            .ok_or_else(|| NotesError::NoteNotFound { id: id.to_string() })?;
        if note.title != title {
            let renamed = Note {
                title: title.to_string(),
                ..note
            };
            self.edit_collection(collection, CollectionEdit::Replace(renamed));
        }
        Ok(())
    }

    fn commit_title_draft(&mut self, id: String, title: String) {
        if let Err(err) = self.rename_note(&id, &title) {
            tracing::warn!(%id, error = %err, "title draft for a missing note");
        }
    }

    /// Pin or unpin. Pinning puts the note first. Returns the new state.
    pub fn toggle_pin(&mut self, id: &str) -> bool {
        let pinned = match self.pinned.iter().position(|p| p == id) {
            Some(i) => {
                self.pinned.remove(i);
                false
            }
            None => {
                self.pinned.insert(0, id.to_string());
                true
            }
        };
        self.schedule(Slot::PinnedNoteIds);
        self.emit(StoreEvent::PinsChanged);
        pinned
    }

    /// Move an active note to the front of the bin. Clears the active note
    /// if it was this one.
    pub fn move_to_bin(&mut self, id: &str) -> Result<(), NotesError> {
        let note = self
            .notes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| NotesError::NoteNotFound { id: id.to_string() })?;
        self.edit_collection(Collection::Active, CollectionEdit::Remove(id.to_string()));
        self.edit_collection(Collection::Bin, CollectionEdit::Prepend(note));
        if self.active_note_id() == Some(id) {
            self.set_active(None);
        }
        Ok(())
    }

    /// Restore a binned note to the front of the active notes.
    pub fn recycle(&mut self, id: &str) -> Result<(), NotesError> {
        let note = self
            .bin
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| NotesError::NoteNotFound { id: id.to_string() })?;
        self.edit_collection(Collection::Bin, CollectionEdit::Remove(id.to_string()));
        self.edit_collection(Collection::Active, CollectionEdit::Prepend(note));
        Ok(())
    }

    /// Remove a note from the bin for good. Active notes must be binned
    /// first.
    pub fn delete_permanently(&mut self, id: &str) -> Result<(), NotesError> {
        if !self.edit_collection(Collection::Bin, CollectionEdit::Remove(id.to_string())) {
            return Err(NotesError::NoteNotFound { id: id.to_string() });
        }
        if self.is_pinned(id) {
            self.toggle_pin(id);
        }
        if self.active_note_id() == Some(id) {
            self.set_active(None);
        }
        Ok(())
    }

    // === Editor ===

    /// An editor over the active note's content.
    pub fn open_editor(&self) -> Option<Editor> {
        let active = self.active.as_ref()?;
        Some(Editor::from_html(&active.content).with_history_depth(self.config.history_depth))
    }

    /// Store the editor's document as the active note's content.
    pub fn commit_editor(&mut self, editor: &Editor) -> bool {
        self.update_active_content(&editor.to_html())
    }

    // === Quick links ===

    fn check_url(&self, url: &str, except: Option<&str>) -> Result<(), QuickLinkError> {
        if !is_valid_url(url) {
            return Err(QuickLinkError::InvalidUrl {
                url: url.to_string(),
            });
        }
        if self
            .quick_links
            .values()
            .any(|l| l.url == url && Some(l.id.as_str()) != except)
        {
            return Err(QuickLinkError::Duplicate {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    fn quick_links_changed(&mut self) {
        self.schedule(Slot::QuickLinks);
        self.schedule(Slot::QuickLinksOrder);
        self.emit(StoreEvent::QuickLinksChanged);
    }

    /// Add a link at the end of the order. Returns its id.
    pub fn add_quick_link(&mut self, name: &str, url: &str) -> Result<String, QuickLinkError> {
        let url = url.trim();
        self.check_url(url, None)?;
        let link = QuickLink::new(name.trim(), url);
        let id = link.id.clone();
        self.quick_links.insert(id.clone(), link);
        self.quick_links_order.push(id.clone());
        self.quick_links_changed();
        Ok(id)
    }

    pub fn edit_quick_link(
        &mut self,
        id: &str,
        name: &str,
        url: &str,
    ) -> Result<(), QuickLinkError> {
        let url = url.trim();
        if !self.quick_links.contains_key(id) {
            return Err(QuickLinkError::NotFound { id: id.to_string() });
        }
        self.check_url(url, Some(id))?;
        if let Some(link) = self.quick_links.get_mut(id) {
            *link = QuickLink {
                id: link.id.clone(),
                name: name.trim().to_string(),
                url: url.to_string(),
                icon_url: crate::note::icon_url_for(url),
            };
        }
        self.quick_links_changed();
        Ok(())
    }

    pub fn remove_quick_link(&mut self, id: &str) -> Result<(), QuickLinkError> {
        if self.quick_links.remove(id).is_none() {
            return Err(QuickLinkError::NotFound { id: id.to_string() });
        }
        self.quick_links_order.retain(|o| o != id);
        self.quick_links_changed();
        Ok(())
    }

    /// Move the link at display index `from` to index `to`.
    pub fn move_quick_link(&mut self, from: usize, to: usize) -> bool {
        let len = self.quick_links_order.len();
        if from == to || from >= len || to >= len {
            return false;
        }
        let id = self.quick_links_order.remove(from);
        self.quick_links_order.insert(to, id);
        self.schedule(Slot::QuickLinksOrder);
        self.emit(StoreEvent::QuickLinksChanged);
        true
    }

    // === Preferences ===

    pub async fn set_theme(&mut self, theme: Theme) -> Result<(), NotesError> {
        self.write_now(keys::THEME, &theme).await?;
        self.preferences.theme = theme;
        self.emit(StoreEvent::PreferencesChanged);
        Ok(())
    }

    pub async fn set_spellcheck(&mut self, enabled: bool) -> Result<(), NotesError> {
        self.write_now(keys::SPELLCHECK, &enabled).await?;
        self.preferences.spellcheck = enabled;
        self.emit(StoreEvent::PreferencesChanged);
        Ok(())
    }

    pub async fn set_sidebar_open(&mut self, open: bool) -> Result<(), NotesError> {
        self.write_now(keys::SIDEBAR, &open).await?;
        self.preferences.sidebar_open = open;
        self.emit(StoreEvent::PreferencesChanged);
        Ok(())
    }

    // === Persistence ===

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.storage.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StorageError::Decode {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn read_or_init<T>(&self, key: &str) -> Result<T, StorageError>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        match self.read(key).await? {
            Some(value) => Ok(value),
            None => {
                let value = T::default();
                self.write_now(key, &value).await?;
                Ok(value)
            }
        }
    }

    async fn write_now<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = encode(key, value)?;
        self.storage.set(key, value).await?;
        tracing::debug!(key, "persisted");
        Ok(())
    }

    fn slot_value(&self, slot: Slot) -> Result<Value, StorageError> {
        let key = slot.key();
        match slot {
            Slot::Notes => encode(key, &*self.notes),
            Slot::BinNotes => encode(key, &*self.bin),
            Slot::QuickLinks => encode(key, &self.quick_links),
            Slot::QuickLinksOrder => encode(key, &self.quick_links_order),
            Slot::PinnedNoteIds => encode(key, &self.pinned),
            Slot::LastActiveNoteId => encode(key, &self.preferences.last_active_note_id),
        }
    }

    /// Commit due title drafts and perform due writes. Returns the number
    /// of keys written.
    pub async fn flush_due(&mut self, now: Instant) -> Result<usize, NotesError> {
        for (id, title) in self.title_drafts.take_due(now) {
            self.commit_title_draft(id, title);
        }
        let due = self.writes.take_due(now);
        self.write_slots(due).await
    }

    /// Commit every draft and perform every pending write now.
    pub async fn flush_all(&mut self) -> Result<usize, NotesError> {
        for (id, title) in self.title_drafts.take_all() {
            self.commit_title_draft(id, title);
        }
        let pending = self.writes.take_all();
        self.write_slots(pending).await
    }

    /// Write each slot's current value. Failures are not retried; the
    /// first one is returned after every slot has been attempted.
    async fn write_slots(&mut self, slots: Vec<(Slot, ())>) -> Result<usize, NotesError> {
        let mut written = 0;
        let mut first_error = None;
        for (slot, ()) in slots {
            let result = match self.slot_value(slot) {
                Ok(value) => self.storage.set(slot.key(), value).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(()) => {
                    written += 1;
                    tracing::debug!(key = slot.key(), "persisted");
                    self.emit(StoreEvent::Persisted(slot.key()));
                }
                Err(err) => {
                    tracing::warn!(key = slot.key(), error = %err, "write failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(written),
        }
    }

    // === Import / export ===

    pub fn export(&self) -> ExportData {
        ExportData {
            dbnotes: self.notes.to_vec(),
            bin_notes: self.bin.to_vec(),
            quicklinks: self.quick_links.clone(),
            quicklinksorder: self.quick_links_order.clone(),
            pinned_note_ids: self.pinned.clone(),
        }
    }

    /// Validate and apply an export file. On any error nothing is written
    /// and memory is untouched; on success all five keys are written at
    /// once and replace the in-memory state.
    pub async fn import(&mut self, text: &str) -> Result<(), NotesError> {
        let data = parse_import(text)?;
        let entries = vec![
            (keys::NOTES, encode(keys::NOTES, &data.dbnotes)?),
            (keys::BIN_NOTES, encode(keys::BIN_NOTES, &data.bin_notes)?),
            (keys::QUICK_LINKS, encode(keys::QUICK_LINKS, &data.quicklinks)?),
            (
                keys::QUICK_LINKS_ORDER,
                encode(keys::QUICK_LINKS_ORDER, &data.quicklinksorder)?,
            ),
            (
                keys::PINNED_NOTE_IDS,
                encode(keys::PINNED_NOTE_IDS, &data.pinned_note_ids)?,
            ),
        ];
        self.storage.set_many(entries).await?;

        for slot in [
            Slot::Notes,
            Slot::BinNotes,
            Slot::QuickLinks,
            Slot::QuickLinksOrder,
            Slot::PinnedNoteIds,
        ] {
            self.writes.cancel(&slot);
        }
        self.title_drafts.take_all();
        self.notes = Arc::new(data.dbnotes);
        self.bin = Arc::new(data.bin_notes);
        self.quick_links = data.quicklinks;
        self.quick_links_order = data.quicklinksorder;
        self.pinned = data.pinned_note_ids;
        tracing::debug!(
            notes = self.notes.len(),
            bin = self.bin.len(),
            "import applied"
        );
        self.clear_active_note();
        self.emit(StoreEvent::Imported);
        Ok(())
    }
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Mutex;

    fn store() -> NoteStore<MemoryStore> {
        NoteStore::new(MemoryStore::new(), SyncConfig::default())
    }

    #[test]
    fn test_edit_collection_is_copy_on_write() {
        let mut store = store();
        store.create_note();
        let before = store.snapshot(Collection::Active);
        store.update_active_title("changed");
        assert_eq!(before[0].title, "");
        assert_eq!(store.notes()[0].title, "changed");
    }

    #[test]
    fn test_replace_missing_id_is_rejected() {
        let mut store = store();
        let mut note = Note::new_empty();
        note.id = "ghost".into();
        assert!(!store.edit_collection(Collection::Bin, CollectionEdit::Replace(note)));
        assert!(!store.has_pending_writes());
    }

    #[test]
    fn test_orphan_active_note_is_not_reinserted() {
        let mut store = store();
        let id = store.create_note();
        // Drop the entry behind the store's back.
        store.edit_collection(Collection::Active, CollectionEdit::Remove(id.clone()));
        assert!(!store.update_active_title("lost"));
        assert!(store.notes().is_empty());
        assert!(store.bin_notes().is_empty());
        assert_eq!(store.active_note().map(|n| n.title.as_str()), Some("lost"));
    }

    #[test]
    fn test_subscribers_hear_changes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = store();
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        let id = store.create_note();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                StoreEvent::NotesChanged(Collection::Active),
                StoreEvent::ActiveNoteChanged(Some(id.clone())),
            ]
        );
        assert!(store.unsubscribe(sub));
        store.toggle_pin(&id);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_pins_and_pinned_notes() {
        let mut store = store();
        let a = store.create_note();
        store.update_active_title("a");
        let b = store.create_note();
        assert!(store.toggle_pin(&a));
        assert!(store.toggle_pin(&b));
        store.toggle_pin("missing");
        assert_eq!(
            store.pinned_note_ids(),
            &["missing".to_string(), b.clone(), a.clone()]
        );
        let ids: Vec<_> = store.pinned_notes().iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec![b.clone(), a.clone()]);
        assert!(!store.toggle_pin(&b));
        assert_eq!(store.pinned_notes().len(), 1);
    }

    #[test]
    fn test_recycle_and_delete_permanently() {
        let mut store = store();
        let id = store.create_note();
        store.update_active_title("keep");
        assert!(store.delete_permanently(&id).is_err());
        store.move_to_bin(&id).unwrap();
        store.recycle(&id).unwrap();
        assert_eq!(store.notes()[0].id, id);
        assert!(store.bin_notes().is_empty());
        store.move_to_bin(&id).unwrap();
        store.toggle_pin(&id);
        store.delete_permanently(&id).unwrap();
        assert!(store.bin_notes().is_empty());
        assert!(!store.is_pinned(&id));
    }

    #[test]
    fn test_editing_a_binned_note_updates_the_bin() {
        let mut store = store();
        let id = store.create_note();
        store.update_active_title("old");
        store.move_to_bin(&id).unwrap();
        store.set_active_note(&id).unwrap();
        assert!(store.update_active_content("<p>revised</p>"));
        assert_eq!(store.bin_notes()[0].text_content, "revised");
        assert!(store.notes().is_empty());
    }

    #[test]
    fn test_quick_links() {
        let mut store = store();
        let a = store.add_quick_link("Rust", "https://www.rust-lang.org/learn").unwrap();
        assert_eq!(
            store.quick_link(&a).unwrap().icon_url,
            "https://icon.horse/icon/www.rust-lang.org"
        );
        assert!(matches!(
            store.add_quick_link("bad", "not a url"),
            Err(QuickLinkError::InvalidUrl { .. })
        ));
        assert!(matches!(
            store.add_quick_link("dup", "https://www.rust-lang.org/learn"),
            Err(QuickLinkError::Duplicate { .. })
        ));
        let b = store.add_quick_link("Docs", "docs.rs").unwrap();
        assert_eq!(store.quick_links().len(), 2);

        // Editing may keep its own URL.
        store.edit_quick_link(&b, "Docs.rs", "docs.rs").unwrap();
        assert_eq!(store.quick_link(&b).unwrap().icon_url, crate::note::DEFAULT_ICON_URL);
        assert!(store.move_quick_link(1, 0));
        let order: Vec<_> = store.quick_links().iter().map(|l| l.id.clone()).collect();
        assert_eq!(order, vec![b.clone(), a.clone()]);
        assert!(!store.move_quick_link(0, 5));

        store.remove_quick_link(&b).unwrap();
        assert!(matches!(
            store.remove_quick_link(&b),
            Err(QuickLinkError::NotFound { .. })
        ));
        assert_eq!(store.quick_links().len(), 1);
    }

    #[test]
    fn test_editor_round_trip() {
        let mut store = store();
        assert!(store.open_editor().is_none());
        store.create_note();
        let mut editor = store.open_editor().unwrap();
        editor.type_text("typed");
        assert!(store.commit_editor(&editor));
        assert_eq!(store.notes()[0].text_content, "typed");
        assert!(!store.commit_editor(&editor));
    }
}
