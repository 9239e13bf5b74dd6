use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// いいね対象の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    WhisperLike,
    CommentLike,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::WhisperLike => "whisper_like",
            ResourceType::CommentLike => "comment_like",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whisper_like" => Ok(ResourceType::WhisperLike),
            "comment_like" => Ok(ResourceType::CommentLike),
            other => Err(format!("Unknown resource type: {other}")),
        }
    }
}
