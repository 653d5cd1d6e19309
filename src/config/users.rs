//! Bot account configuration.

use serde::Deserialize;

/// One `[auth.users.<name>]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct UserBlock {
    /// Password (plaintext or bcrypt hash).
    pub password: String,
    /// Account group; `admin` grants admin-level commands.
    #[serde(default = "default_group")]
    pub group: String,
}

fn default_group() -> String {
    "user".to_string()
}

impl UserBlock {
    /// Verify the provided password against the stored password (plaintext or bcrypt).
    pub fn verify_password(&self, password: &str) -> bool {
        if self.password.starts_with("$2") {
            bcrypt::verify(password, &self.password).unwrap_or(false)
        } else {
            self.password == password
        }
    }
}
