use std::collections::HashSet;

use serde::Deserialize;

/// How names are compared against an allow-list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Matching {
    /// Names must match an entry exactly.
    CaseSensitive,

    /// Entries are stored upper-cased, and names are upper-cased before comparison.
    CaseInsensitive,
}

/// A set of names allowed to pass through.
///
/// An empty allow-list allows everything.
#[derive(Clone, Debug)]
pub struct AllowList {
    entries: HashSet<String>,
    matching: Matching,
}

impl AllowList {
    /// Creates an allow-list that allows everything.
    pub fn allow_all(matching: Matching) -> Self {
        Self {
            entries: HashSet::new(),
            matching,
        }
    }

    /// Parses a comma-separated list of names.
    ///
    /// Each element is trimmed of surrounding whitespace, and elements which are empty after trimming are discarded.
    pub fn parse(raw: &str, matching: Matching) -> Self {
        Self::from_entries(raw.split(','), matching)
    }

    /// Creates an allow-list from individual names, applying the same trimming rules as [`parse`][Self::parse].
    pub fn from_entries<I, S>(entries: I, matching: Matching) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| entry.as_ref().trim().to_string())
            .filter(|entry| !entry.is_empty())
            .map(|entry| match matching {
                Matching::CaseSensitive => entry,
                Matching::CaseInsensitive => entry.to_uppercase(),
            })
            .collect();

        Self { entries, matching }
    }

    /// Returns `true` if no names are configured, meaning everything is allowed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of configured names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if `name` is allowed through.
    pub fn allows(&self, name: &str) -> bool {
        if self.entries.is_empty() {
            return true;
        }

        match self.matching {
            Matching::CaseSensitive => self.entries.contains(name),
            Matching::CaseInsensitive => self.entries.contains(&name.to_uppercase()),
        }
    }

    /// Returns an iterator over the configured names, in their normalized form.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Raw allow-list configuration value.
///
/// Either a single comma-separated string, or a sequence of names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawAllowList {
    Joined(String),
    Entries(Vec<String>),
}

impl RawAllowList {
    pub(crate) fn into_allow_list(self, matching: Matching) -> AllowList {
        match self {
            Self::Joined(raw) => AllowList::parse(&raw, matching),
            // Entries may themselves be comma-separated, which keeps both forms equivalent.
            Self::Entries(entries) => AllowList::from_entries(entries.iter().flat_map(|e| e.split(',')), matching),
        }
    }
}
