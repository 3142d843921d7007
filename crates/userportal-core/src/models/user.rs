use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Date the account was created, formatted for display
    pub fn joined_display(&self) -> String {
        self.created_at.format("%b %-d, %Y").to_string()
    }
}
