use std::fmt::{Display, Write as _};

use enumflags2::{BitFlags, bitflags};

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Flag {
    Draft,
    Flagged,
    Answered,
    Seen,
    Deleted,
}

impl Flag {
    /// Parenthesised flag list as used by `APPEND`, `()` for no flags.
    pub fn format_list(flags: BitFlags<Self>) -> String {
        let mut list = String::from("(");
        for (index, flag) in flags.iter().enumerate() {
            if index > 0 {
                list.push(' ');
            }
            write!(list, "{flag}").expect("writing flag to formatting buffer should succeed");
        }
        list.push(')');
        list
    }
}

impl Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flag::Seen => write!(f, r"\Seen"),
            Flag::Answered => write!(f, r"\Answered"),
            Flag::Flagged => write!(f, r"\Flagged"),
            Flag::Deleted => write!(f, r"\Deleted"),
            Flag::Draft => write!(f, r"\Draft"),
        }
    }
}
