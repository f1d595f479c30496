//! Insertion-ordered, de-duplicated list of quote notes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Notes collected while pricing a quote.
///
/// Keeps the order in which notes were first added and silently drops
/// repeats. Serializes as a plain JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct NoteSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl NoteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a note; returns `false` when it was already present.
    pub fn insert(&mut self, note: impl Into<String>) -> bool {
        let note = note.into();
        if self.seen.contains(&note) {
            return false;
        }
        self.seen.insert(note.clone());
        self.ordered.push(note);
        true
    }

    pub fn contains(&self, note: &str) -> bool {
        self.seen.contains(note)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}

impl<S: Into<String>> Extend<S> for NoteSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for note in iter {
            self.insert(note);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for NoteSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut notes = NoteSet::new();
        notes.extend(iter);
        notes
    }
}

impl From<Vec<String>> for NoteSet {
    fn from(notes: Vec<String>) -> Self {
        notes.into_iter().collect()
    }
}

impl From<NoteSet> for Vec<String> {
    fn from(notes: NoteSet) -> Self {
        notes.ordered
    }
}
