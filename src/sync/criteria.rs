use std::fmt::{Display, Formatter};

use jiff::civil;

use crate::repository::Uid;

/// `UID SEARCH` criteria. All set criteria have to match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Uids up to and including this one are excluded.
    after: Option<Uid>,
    since: Option<civil::Date>,
}

impl SearchCriteria {
    pub fn new(after: Option<Uid>, since: Option<civil::Date>) -> Self {
        Self { after, since }
    }
}

impl Display for SearchCriteria {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.after, self.since) {
            (None, None) => write!(f, "ALL"),
            (Some(after), None) => write!(f, "UID {}:*", after + 1),
            (None, Some(since)) => write!(f, "SINCE {}", since.strftime("%d-%b-%Y")),
            (Some(after), Some(since)) => write!(
                f,
                "UID {}:* SINCE {}",
                after + 1,
                since.strftime("%d-%b-%Y")
            ),
        }
    }
}
