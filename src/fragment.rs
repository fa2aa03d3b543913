//! Prompt fragments and their fixed role order.

use std::collections::HashSet;
use std::fmt;

/// The named slots a caller can fill, in the order they are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FragmentRole {
    Character,
    Random,
    Artist,
    Spare1,
    Spare2,
}

impl FragmentRole {
    /// All roles in rendering order.
    pub const ORDER: [FragmentRole; 5] = [
        FragmentRole::Character,
        FragmentRole::Random,
        FragmentRole::Artist,
        FragmentRole::Spare1,
        FragmentRole::Spare2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentRole::Character => "character",
            FragmentRole::Random => "random",
            FragmentRole::Artist => "artist",
            FragmentRole::Spare1 => "spare1",
            FragmentRole::Spare2 => "spare2",
        }
    }
}

impl fmt::Display for FragmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named block of prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub role: FragmentRole,
    pub text: String,
}

impl Fragment {
    pub fn new(role: FragmentRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Fragments that survived trimming and per-call dedup, in role order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentSet {
    items: Vec<Fragment>,
}

impl FragmentSet {
    /// Collect fragments for one call.
    ///
    /// Input order does not matter: output follows [`FragmentRole::ORDER`],
    /// and fragments sharing a role keep their relative input order. Text is
    /// trimmed, blanks are dropped, and an exact `(role, text)` repeat is
    /// kept only once.
    pub fn collect<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = Fragment>,
    {
        let mut trimmed: Vec<Fragment> = fragments
            .into_iter()
            .filter_map(|f| {
                let text = f.text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(Fragment::new(f.role, text))
                }
            })
            .collect();

        // Stable sort keeps same-role fragments in input order.
        trimmed.sort_by_key(|f| f.role);

        let mut seen = HashSet::new();
        let items = trimmed
            .into_iter()
            .filter(|f| seen.insert((f.role, f.text.clone())))
            .collect();

        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Render as numbered, role-labelled lines joined by newlines.
    pub fn render(&self) -> String {
        self.items
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{}. [{}] {}", i + 1, f.role, f.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
