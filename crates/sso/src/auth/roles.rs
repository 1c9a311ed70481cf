//! Role vocabulary.

use serde::{Deserialize, Serialize};

/// A role from the fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Manager,
}

impl Role {
    /// Every role a user may hold.
    pub const ALL: [Role; 3] = [Role::Admin, Role::User, Role::Manager];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Manager => "manager",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    /// Role names are matched exactly; `"Admin"` is not a role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "manager" => Ok(Role::Manager),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// Validate every requested role name against the vocabulary.
///
/// All-or-nothing: on failure returns every unrecognized name and nothing is
/// accepted. On success returns the canonical names, sorted and deduplicated.
pub fn validate_roles<S: AsRef<str>>(requested: &[S]) -> Result<Vec<String>, Vec<String>> {
    let mut accepted = Vec::with_capacity(requested.len());
    let mut rejected = Vec::new();

    for name in requested {
        match name.as_ref().parse::<Role>() {
            Ok(role) => accepted.push(role),
            Err(_) => rejected.push(name.as_ref().to_string()),
        }
    }

    if !rejected.is_empty() {
        return Err(rejected);
    }

    accepted.sort_by_key(|role| role.as_str());
    accepted.dedup();
    Ok(accepted.iter().map(Role::to_string).collect())
}
