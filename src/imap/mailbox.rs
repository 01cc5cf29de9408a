use derive_builder::Builder;
use derive_getters::Getters;

use crate::repository::{Uid, UidValidity};

/// Mailbox state reported by `SELECT`/`EXAMINE`.
#[derive(Debug, Clone, Builder, Getters)]
pub struct Mailbox {
    name: String,
    #[getter(skip)]
    #[builder(default)]
    readonly: bool,
    #[getter(skip)]
    exists: u32,
    #[getter(skip)]
    uid_validity: UidValidity,
    #[getter(skip)]
    #[builder(setter(strip_option), default)]
    uid_next: Option<Uid>,
}

impl Mailbox {
    pub fn readonly(&self) -> bool {
        self.readonly
    }

    pub fn exists(&self) -> u32 {
        self.exists
    }

    pub fn uid_validity(&self) -> UidValidity {
        self.uid_validity
    }

    pub fn uid_next(&self) -> Option<Uid> {
        self.uid_next
    }
}

/// Outcome of making sure a destination mailbox exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    Created,
    AlreadyExisted,
}
