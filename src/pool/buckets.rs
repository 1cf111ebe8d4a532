//! The three nation buckets and the moves between them
use std::collections::HashSet;

use serde::Serialize;

use crate::record::NationRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Available,
    Rented,
    Recruited,
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Available => write!(f, "available"),
            Bucket::Rented => write!(f, "rented"),
            Bucket::Recruited => write!(f, "recruited"),
        }
    }
}

/// `available` is a stack: the most recently pushed nation is served first.
///
/// A name lives in at most one bucket. `available` may hold duplicates of
/// itself until [`Buckets::dedup_available`] runs; moving a name into
/// `rented` or `recruited` drops any copies still sitting in `available`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Buckets {
    pub available: Vec<NationRecord>,
    pub rented: Vec<NationRecord>,
    pub recruited: Vec<NationRecord>,
}

impl Buckets {
    pub fn new(
        available: Vec<NationRecord>,
        rented: Vec<NationRecord>,
        recruited: Vec<NationRecord>,
    ) -> Self {
        Self {
            available,
            rented,
            recruited,
        }
    }

    pub fn pop_available(&mut self) -> Option<NationRecord> {
        self.available.pop()
    }

    pub fn push_available(&mut self, record: NationRecord) {
        self.available.push(record);
    }

    pub fn rent(&mut self, record: NationRecord) {
        self.drop_from_available(record.name());
        self.rented.push(record);
    }

    pub fn recruit(&mut self, record: NationRecord) {
        self.drop_from_available(record.name());
        self.recruited.push(record);
    }

    /// Remove a nation from `rented`, handing back the stored copy
    pub fn take_rented(&mut self, name: &str) -> Option<NationRecord> {
        let index = self.rented.iter().position(|r| r.name() == name)?;
        Some(self.rented.remove(index))
    }

    pub fn is_rented(&self, name: &str) -> bool {
        self.rented.iter().any(|r| r.name() == name)
    }

    pub fn is_recruited(&self, name: &str) -> bool {
        self.recruited.iter().any(|r| r.name() == name)
    }

    /// Which bucket a name is in, checking `rented` and `recruited` first
    pub fn bucket_of(&self, name: &str) -> Option<Bucket> {
        if self.is_rented(name) {
            Some(Bucket::Rented)
        } else if self.is_recruited(name) {
            Some(Bucket::Recruited)
        } else if self.available.iter().any(|r| r.name() == name) {
            Some(Bucket::Available)
        } else {
            None
        }
    }

    /// Collapse duplicate names in `available`, keeping the newest copy.
    /// Returns how many records were dropped.
    pub fn dedup_available(&mut self) -> usize {
        let before = self.available.len();
        let mut seen: HashSet<String> = HashSet::with_capacity(before);
        self.available.reverse();
        self.available.retain(|r| seen.insert(r.name().to_string()));
        self.available.reverse();
        before - self.available.len()
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.available.len(), self.rented.len(), self.recruited.len())
    }

    fn drop_from_available(&mut self, name: &str) {
        self.available.retain(|r| r.name() != name);
    }
}
