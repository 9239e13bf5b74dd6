use serde::{Deserialize, Serialize};

/// 認証済みのユーザー。いいねやコメントに表示名と色を添える
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    pub color: String,
}

impl Actor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            color: color.into(),
        }
    }
}
