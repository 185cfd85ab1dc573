//! Privilege tiers. Each tier connects with its own database credentials.

use std::fmt;
use std::str::FromStr;

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    Read,
    Write,
    Delete,
    Admin,
}

impl Privilege {
    pub const ALL: [Privilege; 4] = [Self::Read, Self::Write, Self::Delete, Self::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Admin => "admin",
        }
    }

    /// Position of the tier in [`Privilege::ALL`].
    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::Delete => 2,
            Self::Admin => 3,
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privilege {
    type Err = DbError;

    /// Accepts the lower-case tier name, optionally with a capitalised first
    /// letter (`read`, `Read`). Any other casing is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let normalized = match chars.next() {
            Some(first) => format!("{}{}", first.to_ascii_lowercase(), chars.as_str()),
            None => String::new(),
        };
        match normalized.as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "delete" => Ok(Self::Delete),
            "admin" => Ok(Self::Admin),
            _ => Err(DbError::InvalidPrivilege(s.to_owned())),
        }
    }
}
