use std::{fmt::Display, num::NonZeroU32};

/// Incarnation of a source mailbox, as reported by `UIDVALIDITY`. Only ever
/// compared for equality: a different value means every recorded
/// [`Uid`](super::Uid) is meaningless.
#[derive(Clone, Debug, PartialEq, Eq, Copy)]
pub struct UidValidity(NonZeroU32);

impl UidValidity {
    /// Reads the value back from an `integer` column of the progress store.
    pub fn from_stored(stored: i64) -> Result<Self, &'static str> {
        u32::try_from(stored)
            .map_err(|_| "uid_validity out of range")
            .and_then(Self::try_from)
    }

    pub fn to_stored(self) -> i64 {
        i64::from(self.0.get())
    }
}

impl Display for UidValidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<u32> for UidValidity {
    type Error = &'static str;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(value)
            .map(UidValidity)
            .ok_or("uid_validity is zero")
    }
}
