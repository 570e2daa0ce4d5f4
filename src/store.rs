// shoplist/src/store.rs

use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    error::ListError,
    id::{IdGenerator, UuidIds},
    item::Item,
    state::{Action, Effect, ListState},
};

/// Immutable view handed to observers after every operation.
pub type Snapshot = Arc<ListState>;

/// Single source of truth for the list. Owned by one control flow (the UI
/// event loop); observers follow along through `subscribe`.
pub struct ListStore {
    state: ListState,
    ids: Box<dyn IdGenerator>,
    tx: watch::Sender<Snapshot>,
}

impl ListStore {
    pub fn new(items: Vec<Item>) -> Self { Self::with_ids(items, Box::new(UuidIds)) }

    pub fn with_ids(items: Vec<Item>, ids: Box<dyn IdGenerator>) -> Self {
        let state = ListState::with_items(items);
        let (tx, _) = watch::channel(Arc::new(state.clone()));
        Self { state, ids, tx }
    }

    pub fn state(&self) -> &ListState { &self.state }
    pub fn snapshot(&self) -> Snapshot { self.tx.borrow().clone() }
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> { self.tx.subscribe() }

    /// Applies `action` and publishes the resulting snapshot, accepted or not.
    pub fn dispatch(&mut self, action: Action) -> Result<Effect, ListError> {
        let res = self.state.apply(action, self.ids.as_ref());
        self.tx.send_replace(Arc::new(self.state.clone()));
        res
    }

    /// Returns the new item's id.
    pub fn add_item(&mut self, name: &str) -> Result<String, ListError> {
        let fx = self.dispatch(Action::add(name))?;
        Ok(fx.added.unwrap_or_default())
    }
    pub fn edit_item(&mut self, id: &str, new_name: &str) -> Result<(), ListError> {
        self.dispatch(Action::edit(id, new_name)).map(|_| ())
    }
    /// Returns whether an item was flipped; unknown ids are ignored.
    pub fn toggle_item(&mut self, id: &str) -> bool {
        self.dispatch(Action::toggle(id)).is_ok_and(|fx| fx.items_changed)
    }
    /// Returns whether an item was removed.
    pub fn delete_item(&mut self, id: &str) -> bool {
        self.dispatch(Action::delete(id)).is_ok_and(|fx| fx.items_changed)
    }
    pub fn clear_list(&mut self) { let _ = self.dispatch(Action::ClearList); }
    pub fn set_items(&mut self, items: Vec<Item>) { let _ = self.dispatch(Action::SetItems { items }); }
    pub fn set_loading(&mut self, loading: bool) { let _ = self.dispatch(Action::SetLoading { loading }); }
    pub fn set_error(&mut self, message: impl Into<String>) {
        let _ = self.dispatch(Action::SetError { message: Some(message.into()) });
    }
    pub fn clear_error(&mut self) { let _ = self.dispatch(Action::SetError { message: None }); }
}

impl Default for ListStore {
    fn default() -> Self { Self::new(Vec::new()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;

    fn store() -> ListStore {
        ListStore::with_ids(vec![Item::new("1", "Milk")], Box::new(SequentialIds::starting_at(100)))
    }

    #[test]
    fn every_operation_publishes_a_snapshot() {
        let mut s = store();
        let mut rx = s.subscribe();
        assert!(!rx.has_changed().unwrap());
        s.add_item("Eggs").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);

        let _ = s.add_item("");
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().error.is_some());
    }

    #[test]
    fn old_snapshots_are_not_mutated() {
        let mut s = store();
        let before = s.snapshot();
        assert!(s.toggle_item("1"));
        assert!(!before.items[0].purchased);
        assert!(s.snapshot().items[0].purchased);
    }

    #[test]
    fn double_toggle_restores_flag() {
        let mut s = store();
        assert!(s.toggle_item("1"));
        assert!(s.toggle_item("1"));
        assert!(!s.state().items[0].purchased);
        assert_eq!(s.state().error, None);
    }

    #[test]
    fn toggle_of_unknown_id_leaves_items_alone() {
        let mut s = store();
        assert!(!s.toggle_item("nope"));
        assert_eq!(s.state().items, vec![Item::new("1", "Milk")]);
        assert_eq!(s.state().error, None);
    }

    #[test]
    fn second_delete_is_a_no_op() {
        let mut s = store();
        s.add_item("Eggs").unwrap();
        assert!(s.delete_item("1"));
        let after_first = s.state().items.clone();
        assert!(!s.delete_item("1"));
        assert_eq!(s.state().items, after_first);
    }

    #[test]
    fn whitespace_edit_is_rejected() {
        let mut s = store();
        assert!(s.edit_item("1", "  ").is_err());
        assert_eq!(s.state().items, vec![Item::new("1", "Milk")]);
        assert!(s.state().error.is_some());
    }

    #[test]
    fn successful_mutation_clears_previous_error() {
        let mut s = store();
        s.set_error("disk full");
        s.clear_list();
        assert!(s.state().is_empty());
        assert_eq!(s.state().error, None);
    }
}
