//! Ordered environment variable storage.

use serde::{Deserialize, Serialize};

/// Whether variable names compare case-insensitively on this host.
pub const HOST_IGNORES_CASE: bool = cfg!(windows);

/// Ordered name to value mapping.
///
/// Variables keep the position of their first insertion. Names compare
/// exactly, or ASCII case-insensitively when `ignore_case` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vars {
    entries: Vec<(String, String)>,
    ignore_case: bool,
}

impl Vars {
    /// Creates an empty set with the given name matching rule.
    #[must_use]
    pub const fn new(ignore_case: bool) -> Self {
        Self {
            entries: Vec::new(),
            ignore_case,
        }
    }

    /// Collects the variables of `environ` whose name passes `keep`.
    pub fn from_environ<I, K, V>(environ: I, ignore_case: bool, keep: impl Fn(&str) -> bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut vars = Self::new(ignore_case);
        for (name, value) in environ {
            let name = name.into();
            if keep(&name) {
                vars.set(name, value);
            }
        }
        vars
    }

    /// Returns the value of `name`, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    /// Sets `name` to `value`, keeping its position when already present.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Iterates variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no variable is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the set as `NAME=value` strings.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| names_match(k, name, self.ignore_case))
    }
}

impl Default for Vars {
    fn default() -> Self {
        Self::new(HOST_IGNORES_CASE)
    }
}

/// Compares variable names, ASCII case-insensitively if requested.
#[must_use]
pub fn names_match(a: &str, b: &str, ignore_case: bool) -> bool {
    if ignore_case {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}
