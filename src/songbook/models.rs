use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;
pub const MAX_SETLIST_ENTRIES: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub source: Option<String>,
    pub themes: Vec<String>,
    pub lyrics: String,
    pub original_key: Option<String>,
    pub tempo: Option<u32>,
    pub ccli_number: Option<String>,
    pub release_year: Option<i32>,
    pub created_by: usize,
    pub created: i64,
    pub updated: i64,
    pub views: u64,
    pub rating_average: f64,
    pub rating_count: u32,
    pub setlist_usage_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSong {
    pub title: String,
    pub artist: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub lyrics: String,
    pub original_key: Option<String>,
    pub tempo: Option<u32>,
    pub ccli_number: Option<String>,
    pub release_year: Option<i32>,
}

/// Tells an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update: absent fields are left untouched, `null` clears.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub artist: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub source: Option<Option<String>>,
    pub themes: Option<Vec<String>>,
    pub lyrics: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub original_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub tempo: Option<Option<u32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub ccli_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub release_year: Option<Option<i32>>,
}

/// The subset of a song needed to compute categories and popularity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongSummary {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub source: Option<String>,
    pub themes: Vec<String>,
    pub views: u64,
    pub rating_average: f64,
    pub rating_count: u32,
    pub created: i64,
}

impl From<&Song> for SongSummary {
    fn from(song: &Song) -> Self {
        SongSummary {
            id: song.id.clone(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            source: song.source.clone(),
            themes: song.themes.clone(),
            views: song.views,
            rating_average: song.rating_average,
            rating_count: song.rating_count,
            created: song.created,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongSort {
    #[default]
    Title,
    Newest,
    Views,
    Rating,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongQuery {
    pub theme: Option<String>,
    pub artist: Option<String>,
    #[serde(default)]
    pub sort: SongSort,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// 1-based page request with a bounded limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(page: Option<usize>, limit: Option<usize>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Saturates, so an absurd page is simply past the end.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Offset for SQL `OFFSET`, which takes a signed 64-bit value.
    pub fn sql_offset(&self) -> i64 {
        i64::try_from(self.offset()).unwrap_or(i64::MAX)
    }

    /// Slices an already sorted list into this page.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.limit)
            .collect();
        Page {
            items,
            page: self.page,
            limit: self.limit,
            total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrangement {
    pub id: String,
    pub name: String,
    pub song_ids: Vec<String>,
    pub key: Option<String>,
    pub tempo: Option<u32>,
    pub time_signature: Option<String>,
    pub capo: Option<u8>,
    pub chord_data: String,
    pub description: Option<String>,
    pub created_by: usize,
    pub created: i64,
    pub updated: i64,
    pub views: u64,
    pub rating_average: f64,
    pub rating_count: u32,
    pub is_mashup: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewArrangement {
    pub name: String,
    pub song_ids: Vec<String>,
    pub key: Option<String>,
    pub tempo: Option<u32>,
    pub time_signature: Option<String>,
    pub capo: Option<u8>,
    #[serde(default)]
    pub chord_data: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArrangementUpdate {
    pub name: Option<String>,
    pub song_ids: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub key: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub tempo: Option<Option<u32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub time_signature: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub capo: Option<Option<u8>>,
    pub chord_data: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewTargetType {
    Song,
    Arrangement,
}

impl ReviewTargetType {
    pub fn to_int(self) -> i32 {
        match self {
            ReviewTargetType::Song => 1,
            ReviewTargetType::Arrangement => 2,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(ReviewTargetType::Song),
            2 => Some(ReviewTargetType::Arrangement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewTarget {
    pub target_type: ReviewTargetType,
    pub target_id: String,
}

impl ReviewTarget {
    pub fn song<S: Into<String>>(id: S) -> Self {
        ReviewTarget {
            target_type: ReviewTargetType::Song,
            target_id: id.into(),
        }
    }

    pub fn arrangement<S: Into<String>>(id: S) -> Self {
        ReviewTarget {
            target_type: ReviewTargetType::Arrangement,
            target_id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub user_id: usize,
    pub target_type: ReviewTargetType,
    pub target_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub created: i64,
    pub updated: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingAggregate {
    pub rating_average: f64,
    pub rating_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verse {
    pub id: String,
    pub song_id: String,
    pub user_id: usize,
    pub reference: String,
    pub text: String,
    pub created: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVerse {
    pub reference: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: String,
    pub song_id: String,
    pub user_id: usize,
    /// Filled in by the caller, the songbook db does not know user handles.
    pub user_handle: Option<String>,
    pub body: String,
    pub created: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetlistEntry {
    pub song_id: String,
    pub arrangement_id: Option<String>,
    pub key: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setlist {
    pub id: String,
    pub user_id: usize,
    pub name: String,
    pub description: Option<String>,
    pub service_date: Option<String>,
    pub is_public: bool,
    pub entries: Vec<SetlistEntry>,
    pub created: i64,
    pub updated: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSetlist {
    pub name: String,
    pub description: Option<String>,
    pub service_date: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub entries: Vec<SetlistEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetlistUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub service_date: Option<Option<String>>,
    pub is_public: Option<bool>,
    /// Replaces all entries when present.
    pub entries: Option<Vec<SetlistEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentCounts {
    pub songs: usize,
    pub arrangements: usize,
    pub setlists: usize,
    pub public_setlists: usize,
    pub reviews: usize,
    pub verses: usize,
    pub comments: usize,
}

/// Who is acting on the songbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: usize,
    pub can_moderate: bool,
}

impl UserContext {
    pub fn new(user_id: usize, can_moderate: bool) -> Self {
        UserContext {
            user_id,
            can_moderate,
        }
    }

    pub fn can_edit(&self, owner_id: usize) -> bool {
        self.can_moderate || self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_tells_null_from_absent() {
        let update: ArrangementUpdate =
            serde_json::from_str(r#"{"capo": null, "key": "A"}"#).unwrap();
        assert_eq!(update.capo, Some(None));
        assert_eq!(update.key, Some(Some("A".to_string())));
        assert_eq!(update.tempo, None);
    }

    #[test]
    fn page_request_bounds() {
        let p = PageRequest::new(None, None);
        assert_eq!(p, PageRequest { page: 1, limit: DEFAULT_PAGE_LIMIT });
        assert_eq!(PageRequest::new(Some(0), Some(1000)).limit, MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 20);
        let huge = PageRequest::new(Some(usize::MAX), Some(MAX_PAGE_LIMIT));
        assert_eq!(huge.offset(), usize::MAX);
        assert_eq!(huge.sql_offset(), i64::MAX);
        assert!(huge.apply(vec![1, 2, 3]).items.is_empty());
    }

    #[test]
    fn page_apply_slices_and_counts() {
        let page = PageRequest::new(Some(2), Some(2)).apply(vec![1, 2, 3, 4, 5]);
        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
        let page = PageRequest::new(Some(9), Some(2)).apply(vec![1, 2, 3]);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn owners_and_moderators_can_edit() {
        assert!(UserContext::new(1, false).can_edit(1));
        assert!(!UserContext::new(2, false).can_edit(1));
        assert!(UserContext::new(2, true).can_edit(1));
    }

    #[test]
    fn song_sort_parses_lowercase() {
        let q: SongQuery = serde_json::from_str(r#"{"sort":"rating"}"#).unwrap();
        assert_eq!(q.sort, SongSort::Rating);
        let q: SongQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.sort, SongSort::Title);
    }
}
