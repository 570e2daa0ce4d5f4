// shoplist/src/item.rs

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest accepted item name, counted in characters after trimming.
pub const MAX_NAME_LEN: usize = 50;

/// One shopping-list entry. This is also the on-disk shape:
/// `{"id": "...", "name": "...", "purchased": false}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub purchased: bool,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), purchased: false }
    }

    pub fn purchased(mut self, purchased: bool) -> Self {
        self.purchased = purchased;
        self
    }
}

/// Trims `raw` and checks it against the name rules, returning the trimmed name.
pub fn validate_name(raw: &str) -> Result<&str, ValidationError> {
    let name = raw.trim();
    if name.is_empty() { return Err(ValidationError::EmptyName); }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong { len, max: MAX_NAME_LEN });
    }
    Ok(name)
}

/// The list a fresh install starts with.
pub fn default_items() -> Vec<Item> {
    vec![
        Item::new("1", "Milk"),
        Item::new("2", "Bread"),
        Item::new("3", "Eggs").purchased(true),
    ]
}
