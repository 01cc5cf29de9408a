use std::fmt::{Display, Formatter, Result};

use thiserror::Error;

use crate::repository::Uid;

#[derive(Debug, PartialEq, Clone, Copy)]
struct SequenceRange {
    start: Uid,
    end: Uid,
}

impl SequenceRange {
    fn single(uid: Uid) -> Self {
        Self {
            start: uid,
            end: uid,
        }
    }
}

impl Display for SequenceRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Error, Default, PartialEq)]
#[error("No numbers in sequence set")]
pub struct EmptySetError {}

/// Uid set in IMAP syntax, consecutive uids collapsed into ranges.
#[derive(Debug, PartialEq, Clone)]
pub struct SequenceSet {
    ranges: Vec<SequenceRange>,
}

impl SequenceSet {
    pub fn contains(&self, uid: Uid) -> bool {
        self.ranges
            .iter()
            .any(|range| range.start <= uid && uid <= range.end)
    }
}

#[cfg(test)]
impl SequenceSet {
    pub fn single(uid: Uid) -> Self {
        Self {
            ranges: vec![SequenceRange::single(uid)],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Uid> + '_ {
        self.ranges.iter().flat_map(|range| {
            (u32::from(range.start)..=u32::from(range.end))
                .filter_map(|num| Uid::try_from(num).ok())
        })
    }
}

impl Display for SequenceSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mut ranges = self.ranges.iter();
        if let Some(first) = ranges.next() {
            write!(f, "{first}")?;
        }
        for range in ranges {
            write!(f, ",{range}")?;
        }
        Ok(())
    }
}

impl TryFrom<&[Uid]> for SequenceSet {
    type Error = EmptySetError;

    fn try_from(value: &[Uid]) -> std::result::Result<Self, Self::Error> {
        let mut sorted_nums = value.to_vec();
        sorted_nums.sort_unstable();
        sorted_nums.dedup();
        let mut sorted_nums = sorted_nums.into_iter();

        let first_num = sorted_nums.next().ok_or(EmptySetError {})?;
        let mut ranges = Vec::new();
        let mut current_range = SequenceRange::single(first_num);

        for num in sorted_nums {
            if current_range.end < Uid::MAX && num == current_range.end + 1 {
                current_range.end = num;
            } else {
                ranges.push(current_range);
                current_range = SequenceRange::single(num);
            }
        }
        ranges.push(current_range);

        Ok(Self { ranges })
    }
}
