//! User data models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteContentType {
    Song,
    Arrangement,
}

impl FavoriteContentType {
    pub fn to_int(&self) -> i32 {
        match self {
            FavoriteContentType::Song => 1,
            FavoriteContentType::Arrangement => 2,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(FavoriteContentType::Song),
            2 => Some(FavoriteContentType::Arrangement),
            _ => None,
        }
    }

    /// Parses the path segment form, accepting both singular and plural.
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "song" | "songs" => Some(FavoriteContentType::Song),
            "arrangement" | "arrangements" => Some(FavoriteContentType::Arrangement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserFavorite {
    pub content_type: FavoriteContentType,
    pub content_id: String,
    pub created: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: usize,
    pub handle: String,
    pub created: i64,
}
