use serde::{Deserialize, Serialize};

/// One watchlist entry: a user follows a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreference {
    /// Synthetic row id; 0 until persisted.
    #[serde(default)]
    pub id: i64,
    pub user_id: String,
    pub symbol: String,
}
