//! Client-side identifiers for items and events.

use rand::{Rng, distr::Alphanumeric};

/// Length of generated item ids; the server caps ids at 32 characters.
pub const ITEM_ID_LEN: usize = 32;

/// Random alphanumeric string of `len` characters.
pub fn random_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A fresh id for a client-created conversation item.
pub fn item_id() -> String {
    random_id(ITEM_ID_LEN)
}
