use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: u32,
    pub cursor: Option<String>,
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self {
            limit,
            cursor: None,
        }
    }

    pub fn after(limit: u32, cursor: impl Into<String>) -> Self {
        Self {
            limit,
            cursor: Some(cursor.into()),
        }
    }

    pub fn is_first(&self) -> bool {
        self.cursor.is_none()
    }

    /// キャッシュキー用のページ識別子
    pub fn cache_segment(&self) -> String {
        match &self.cursor {
            Some(cursor) => format!("{}:{cursor}", self.limit),
            None => format!("{}:head", self.limit),
        }
    }
}
