use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub resource_id: String,
    pub actor_id: String,
    pub actor_name: Option<String>,
    pub actor_color: Option<String>,
    pub created_at: DateTime<Utc>,
}
