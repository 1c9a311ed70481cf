//! Stored records.

use serde::Serialize;

/// User record as held by the credential store.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// Opaque password hash. Never serialized or logged.
    #[serde(skip_serializing)]
    pub pass_hash: Vec<u8>,
    pub roles: Vec<String>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("pass_hash", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

/// Registered relying party.
#[derive(Clone, PartialEq, Eq)]
pub struct App {
    pub id: i64,
    pub name: String,
    /// Shared signing secret.
    pub secret: String,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let user = User {
            id: 1,
            email: "a@x.com".to_string(),
            pass_hash: b"$2b$04$abcdef".to_vec(),
            roles: vec!["admin".to_string()],
        };
        let rendered = format!("{user:?}");
        assert!(rendered.contains("a@x.com"));
        assert!(!rendered.contains("$2b$"));

        let app = App {
            id: 1,
            name: "web".to_string(),
            secret: "super-secret".to_string(),
        };
        assert!(!format!("{app:?}").contains("super-secret"));
    }

    #[test]
    fn test_user_serialization_skips_hash() {
        let user = User {
            id: 7,
            email: "b@x.com".to_string(),
            pass_hash: b"hash".to_vec(),
            roles: vec![],
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 7);
        assert!(json.get("pass_hash").is_none());
    }
}
