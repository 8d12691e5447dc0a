//! Per-variable operations encoded by environment file suffixes.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::vars::Vars;

/// Operation a layer environment file applies to its variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Replace the accumulated value.
    Override,
    /// Set only when the variable is unset or empty.
    Default,
    /// Place the value before the accumulated value.
    Prepend,
    /// Place the value after the accumulated value.
    Append,
}

impl Action {
    /// Applies this operation for `name` on `vars`.
    ///
    /// `delim` separates the new value from a non-empty accumulated value
    /// for [`Action::Prepend`] and [`Action::Append`]; it is ignored otherwise.
    pub fn apply(self, vars: &mut Vars, name: &str, value: &str, delim: &str) {
        let current = vars.get(name).filter(|v| !v.is_empty()).map(str::to_owned);
        match (self, current) {
            (Self::Override, _) | (Self::Default | Self::Prepend | Self::Append, None) => {
                vars.set(name, value);
            }
            (Self::Default, Some(_)) => {}
            (Self::Prepend, Some(cur)) => vars.set(name, format!("{value}{delim}{cur}")),
            (Self::Append, Some(cur)) => vars.set(name, format!("{cur}{delim}{value}")),
        }
    }

    /// Whether this operation concatenates and therefore uses a delimiter.
    #[must_use]
    pub const fn uses_delimiter(self) -> bool {
        matches!(self, Self::Prepend | Self::Append)
    }
}

/// Suffix that is not an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown environment operation '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "override" => Ok(Self::Override),
            "default" => Ok(Self::Default),
            "prepend" => Ok(Self::Prepend),
            "append" => Ok(Self::Append),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => write!(f, "override"),
            Self::Default => write!(f, "default"),
            Self::Prepend => write!(f, "prepend"),
            Self::Append => write!(f, "append"),
        }
    }
}
