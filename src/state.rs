// shoplist/src/state.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::{
    error::ListError,
    id::IdGenerator,
    item::{validate_name, Item},
};

/// The whole list at one point in time.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListState {
    pub items: Vec<Item>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Everything the presentation layer may ask of the list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    AddItem { name: String },
    EditItem { id: String, new_name: String },
    ToggleItem { id: String },
    DeleteItem { id: String },
    /// Irreversible. Callers confirm with the user before sending it.
    ClearList,
    /// Seed from persisted data; skips name validation, still dedupes ids.
    SetItems { items: Vec<Item> },
    SetLoading { loading: bool },
    SetError { message: Option<String> },
}

impl Action {
    pub fn add(name: impl Into<String>) -> Self { Self::AddItem { name: name.into() } }
    pub fn edit(id: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::EditItem { id: id.into(), new_name: new_name.into() }
    }
    pub fn toggle(id: impl Into<String>) -> Self { Self::ToggleItem { id: id.into() } }
    pub fn delete(id: impl Into<String>) -> Self { Self::DeleteItem { id: id.into() } }
}

/// What an accepted action did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Effect {
    /// `items` differs from before; the caller should schedule a save.
    pub items_changed: bool,
    /// Id assigned by `AddItem`.
    pub added: Option<String>,
}

impl Effect {
    fn changed() -> Self { Self { items_changed: true, added: None } }
    fn unchanged() -> Self { Self::default() }
}

impl ListState {
    pub fn with_items(items: Vec<Item>) -> Self {
        Self { items: dedupe_ids(items), ..Default::default() }
    }

    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn purchased_count(&self) -> usize { self.items.iter().filter(|i| i.purchased).count() }
    pub fn get(&self, id: &str) -> Option<&Item> { self.items.iter().find(|i| i.id == id) }

    /// Applies one action. A rejected action leaves `items` untouched, records
    /// the message in `error` and returns the error.
    pub fn apply(&mut self, action: Action, ids: &dyn IdGenerator) -> Result<Effect, ListError> {
        let res = self.apply_inner(action, ids);
        if let Err(e) = &res { self.error = Some(e.to_string()); }
        res
    }

    fn apply_inner(&mut self, action: Action, ids: &dyn IdGenerator) -> Result<Effect, ListError> {
        match action {
            Action::AddItem { name } => {
                let name = validate_name(&name)?.to_string();
                let id = self.fresh_id(ids);
                self.items.push(Item::new(id.clone(), name));
                self.error = None;
                Ok(Effect { items_changed: true, added: Some(id) })
            }
            Action::EditItem { id, new_name } => {
                let new_name = validate_name(&new_name)?;
                let item = self.items.iter_mut().find(|x| x.id == id)
                    .ok_or_else(|| ListError::NotFound { id: id.clone() })?;
                let changed = item.name != new_name;
                item.name = new_name.to_string();
                self.error = None;
                Ok(if changed { Effect::changed() } else { Effect::unchanged() })
            }
            Action::ToggleItem { id } => {
                // unknown id: nothing changes, error included
                let Some(item) = self.items.iter_mut().find(|x| x.id == id) else {
                    return Ok(Effect::unchanged());
                };
                item.purchased = !item.purchased;
                self.error = None;
                Ok(Effect::changed())
            }
            Action::DeleteItem { id } => {
                // deleting an unknown id is an idempotent no-op
                let before = self.items.len();
                self.items.retain(|x| x.id != id);
                self.error = None;
                Ok(if self.items.len() == before { Effect::unchanged() } else { Effect::changed() })
            }
            Action::ClearList => {
                let had_items = !self.items.is_empty();
                self.items.clear();
                self.error = None;
                Ok(if had_items { Effect::changed() } else { Effect::unchanged() })
            }
            Action::SetItems { items } => {
                self.items = dedupe_ids(items);
                self.is_loading = false;
                self.error = None;
                Ok(Effect::changed())
            }
            Action::SetLoading { loading } => {
                self.is_loading = loading;
                Ok(Effect::unchanged())
            }
            Action::SetError { message } => {
                self.error = message;
                self.is_loading = false;
                Ok(Effect::unchanged())
            }
        }
    }

    fn fresh_id(&self, ids: &dyn IdGenerator) -> String {
        loop {
            let id = ids.next_id();
            if self.get(&id).is_none() { return id; }
        }
    }
}

/// Keeps the first item for every id and drops later repeats.
fn dedupe_ids(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::with_capacity(items.len());
    let before = items.len();
    let out: Vec<Item> = items.into_iter().filter(|i| seen.insert(i.id.clone())).collect();
    if out.len() != before {
        warn!(dropped = before - out.len(), "duplicate item ids dropped while seeding list");
    }
    out
}
