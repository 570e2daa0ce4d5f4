// shoplist/src/session.rs

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::{
    autosave::{AutoSaver, SaveEvent, SaveOptions},
    error::{ListError, StorageError},
    id::{IdGenerator, UuidIds},
    item::{default_items, Item},
    persistence::ListPersistence,
    state::{Action, Effect, ListState},
    store::{ListStore, Snapshot},
};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load saved data";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// Start from the built-in sample list when nothing is saved.
    pub seed_defaults: bool,
    pub save: SaveOptions,
}

impl Default for SessionOptions {
    fn default() -> Self { Self { seed_defaults: true, save: SaveOptions::default() } }
}

/// Wires a `ListStore` to its persistence: restores on open, schedules a save
/// after every change to the items, and turns save failures into the store's
/// `error` field. This is what a UI layer holds on to.
pub struct ShoppingSession {
    store: ListStore,
    persistence: Arc<ListPersistence>,
    saver: AutoSaver,
    events: mpsc::UnboundedReceiver<SaveEvent>,
    // message of the last failed save, shown until a later save lands
    save_error: Option<String>,
}

impl ShoppingSession {
    pub async fn open(persistence: Arc<ListPersistence>, opts: SessionOptions) -> Self {
        Self::open_with_ids(persistence, opts, Box::new(UuidIds)).await
    }

    pub async fn open_with_ids(persistence: Arc<ListPersistence>, opts: SessionOptions, ids: Box<dyn IdGenerator>) -> Self {
        let seed = if opts.seed_defaults { default_items() } else { Vec::new() };
        let mut store = ListStore::with_ids(seed, ids);
        store.set_loading(true);
        match persistence.load().await {
            Ok(Some(items)) => {
                info!(count = items.len(), "restored shopping list");
                store.set_items(items);
            }
            Ok(None) => store.set_loading(false),
            Err(e) => {
                warn!(error = %e, "could not read saved list");
                store.set_error(LOAD_FAILED_MESSAGE);
            }
        }
        let (saver, events) = AutoSaver::spawn(persistence.clone(), opts.save);
        Self { store, persistence, saver, events, save_error: None }
    }

    pub fn state(&self) -> &ListState { self.store.state() }
    pub fn snapshot(&self) -> Snapshot { self.store.snapshot() }
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> { self.store.subscribe() }

    /// Applies `action`; a change to the items schedules a save. Save
    /// outcomes that arrived in the meantime are folded in afterwards, so a
    /// write failure is not hidden by the action's own success.
    pub fn dispatch(&mut self, action: Action) -> Result<Effect, ListError> {
        let fx = self.store.dispatch(action)?;
        if fx.items_changed { self.saver.schedule(self.store.state().items.clone()); }
        self.drain_save_events();
        Ok(fx)
    }

    pub fn add_item(&mut self, name: &str) -> Result<String, ListError> {
        let fx = self.dispatch(Action::add(name))?;
        Ok(fx.added.unwrap_or_default())
    }
    pub fn edit_item(&mut self, id: &str, new_name: &str) -> Result<(), ListError> {
        self.dispatch(Action::edit(id, new_name)).map(|_| ())
    }
    pub fn toggle_item(&mut self, id: &str) -> bool {
        self.dispatch(Action::toggle(id)).is_ok_and(|fx| fx.items_changed)
    }
    pub fn delete_item(&mut self, id: &str) -> bool {
        self.dispatch(Action::delete(id)).is_ok_and(|fx| fx.items_changed)
    }
    pub fn clear_list(&mut self) { let _ = self.dispatch(Action::ClearList); }

    /// Replaces the list wholesale, e.g. from an import, and persists it.
    pub fn replace_items(&mut self, items: Vec<Item>) {
        let _ = self.dispatch(Action::SetItems { items });
    }

    /// Folds finished background saves into the store without waiting.
    pub fn drain_save_events(&mut self) -> Vec<SaveEvent> {
        let mut seen = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            self.absorb(&ev);
            seen.push(ev);
        }
        seen
    }

    /// Waits for the next background save to finish and publishes its outcome:
    /// a failure becomes `error` in the snapshot observers see. Meant for a UI
    /// loop to `select!` on next to its input. `None` once the saver is gone.
    pub async fn next_save_event(&mut self) -> Option<SaveEvent> {
        let ev = self.events.recv().await?;
        self.absorb(&ev);
        Some(ev)
    }

    fn absorb(&mut self, ev: &SaveEvent) {
        match ev {
            SaveEvent::Failed { error, .. } => {
                let message = error.to_string();
                self.store.set_error(message.clone());
                self.save_error = Some(message);
            }
            SaveEvent::Saved { .. } => {
                if let Some(message) = self.save_error.take() {
                    if self.store.state().error.as_deref() == Some(message.as_str()) {
                        self.store.clear_error();
                    }
                }
            }
        }
    }

    /// Waits for pending writes and reports their outcome.
    pub async fn flush(&mut self) -> Result<(), StorageError> {
        let res = self.saver.flush().await;
        self.drain_save_events();
        res
    }

    /// Deletes the saved copy. The in-memory list is left as it is.
    pub async fn forget_saved(&mut self) -> Result<(), StorageError> {
        self.flush().await.ok();
        let res = self.persistence.clear().await;
        if let Err(e) = &res { self.store.set_error(e.to_string()); }
        res
    }

    /// Flushes, stops the autosave task and returns the final list.
    pub async fn close(mut self) -> (ListState, Result<(), StorageError>) {
        self.drain_save_events();
        let Self { mut store, saver, .. } = self;
        let res = saver.shutdown().await;
        if let Err(e) = &res { store.set_error(e.to_string()); }
        (store.state().clone(), res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{id::SequentialIds, persistence::DEFAULT_STORAGE_KEY, storage::MemoryStore};
    use std::time::Duration;

    fn quick() -> SessionOptions {
        SessionOptions {
            seed_defaults: true,
            save: SaveOptions { debounce: Duration::from_millis(5), retry_once: true, retry_delay: Duration::from_millis(5) },
        }
    }

    async fn open(store: &Arc<MemoryStore>, opts: SessionOptions) -> ShoppingSession {
        let p = Arc::new(ListPersistence::new(store.clone(), DEFAULT_STORAGE_KEY));
        ShoppingSession::open_with_ids(p, opts, Box::new(SequentialIds::starting_at(1))).await
    }

    #[tokio::test]
    async fn fresh_install_starts_from_seed() {
        let store = Arc::new(MemoryStore::new());
        let s = open(&store, quick()).await;
        assert_eq!(s.state().items, default_items());
        assert!(!s.state().is_loading);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn seed_can_be_disabled() {
        let store = Arc::new(MemoryStore::new());
        let s = open(&store, SessionOptions { seed_defaults: false, ..quick() }).await;
        assert!(s.state().is_empty());
    }

    #[tokio::test]
    async fn saved_list_replaces_seed() {
        let store = Arc::new(MemoryStore::with_value(DEFAULT_STORAGE_KEY, r#"[{"id":"x","name":"Tea","purchased":true}]"#));
        let s = open(&store, quick()).await;
        assert_eq!(s.state().items, vec![Item::new("x", "Tea").purchased(true)]);
    }

    #[tokio::test]
    async fn unreadable_storage_keeps_seed_and_sets_error() {
        let store = Arc::new(MemoryStore::new());
        store.fail_reads(true);
        let s = open(&store, quick()).await;
        assert_eq!(s.state().items, default_items());
        assert_eq!(s.state().error.as_deref(), Some(LOAD_FAILED_MESSAGE));
        assert!(!s.state().is_loading);
    }

    #[tokio::test]
    async fn rejected_actions_do_not_save() {
        let store = Arc::new(MemoryStore::new());
        let mut s = open(&store, quick()).await;
        assert!(s.add_item("").is_err());
        assert!(!s.toggle_item("missing"));
        s.flush().await.unwrap();
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn save_failure_lands_in_error_but_keeps_items() {
        let store = Arc::new(MemoryStore::new());
        let mut s = open(&store, quick()).await;
        store.fail_next_writes(2);
        s.add_item("Butter").unwrap();
        assert!(s.flush().await.is_err());
        assert_eq!(s.state().len(), 4);
        assert!(s.state().error.as_deref().unwrap().contains("failed to write"));
    }

    #[tokio::test]
    async fn failed_save_reaches_observers() {
        let store = Arc::new(MemoryStore::new());
        let mut s = open(&store, quick()).await;
        store.fail_next_writes(2);
        s.add_item("Butter").unwrap();
        let mut rx = s.subscribe();
        let _ = rx.borrow_and_update();

        let ev = s.next_save_event().await.unwrap();
        assert!(matches!(ev, SaveEvent::Failed { generation: 1, .. }));
        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert!(snap.error.as_deref().unwrap().contains("failed to write"));
        assert_eq!(snap.len(), 4);
        assert_eq!(store.peek(DEFAULT_STORAGE_KEY), None);
    }

    #[tokio::test]
    async fn save_failure_outlives_the_next_action_until_a_save_lands() {
        let store = Arc::new(MemoryStore::new());
        let mut s = open(&store, quick()).await;
        store.fail_next_writes(2);
        s.add_item("Butter").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(s.toggle_item("1"));
        assert!(s.state().error.is_some());
        assert!(s.snapshot().error.is_some());

        s.flush().await.unwrap();
        assert_eq!(s.state().error, None);
        let saved: Vec<Item> = serde_json::from_str(&store.peek(DEFAULT_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(saved.len(), 4);
        assert!(saved[0].purchased);
    }

    #[tokio::test]
    async fn validation_error_is_not_cleared_by_a_later_save() {
        let store = Arc::new(MemoryStore::new());
        let mut s = open(&store, quick()).await;
        s.add_item("Jam").unwrap();
        assert!(s.add_item("").is_err());
        s.flush().await.unwrap();
        assert_eq!(s.state().error.as_deref(), Some("item name cannot be empty"));
    }

    #[tokio::test]
    async fn clear_is_persisted_as_empty_array() {
        let store = Arc::new(MemoryStore::new());
        let mut s = open(&store, quick()).await;
        s.clear_list();
        s.flush().await.unwrap();
        assert_eq!(store.peek(DEFAULT_STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn forget_removes_saved_copy_only() {
        let store = Arc::new(MemoryStore::new());
        let mut s = open(&store, quick()).await;
        assert!(s.toggle_item("1"));
        s.forget_saved().await.unwrap();
        assert_eq!(store.peek(DEFAULT_STORAGE_KEY), None);
        assert_eq!(s.state().len(), 3);
    }
}
