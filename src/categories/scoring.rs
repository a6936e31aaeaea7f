use super::rules::CategoryRule;
use crate::songbook::SongSummary;

/// Minimum score for a song to belong to a category.
pub const MATCH_THRESHOLD: u32 = 2;

const THEME_POINTS: u32 = 3;
const KEYWORD_POINTS: u32 = 2;

const RATING_WEIGHT: f64 = 0.5;
const VIEWS_WEIGHT: f64 = 0.3;
const RECENCY_WEIGHT: f64 = 0.2;
const RECENCY_DECAY_DAYS: f64 = 180.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// True when `keyword` occurs in `value` as whole words.
fn contains_word(value: &str, keyword: &str) -> bool {
    value.match_indices(keyword).any(|(start, _)| {
        let before = value[..start].chars().next_back();
        let after = value[start + keyword.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn contains_any(value: Option<&str>, keywords: &[&str]) -> bool {
    match value {
        Some(value) => {
            let value = value.to_lowercase();
            keywords.iter().any(|k| contains_word(&value, k))
        }
        None => false,
    }
}

/// Theme matches count per theme, the other fields count once each.
pub fn match_score(rule: &CategoryRule, song: &SongSummary) -> u32 {
    let theme_matches = song
        .themes
        .iter()
        .filter(|t| rule.themes.contains(&t.to_lowercase().as_str()))
        .count() as u32;

    let mut score = theme_matches * THEME_POINTS;
    if contains_any(song.source.as_deref(), rule.sources) {
        score += KEYWORD_POINTS;
    }
    if contains_any(song.artist.as_deref(), rule.artists) {
        score += KEYWORD_POINTS;
    }
    if contains_any(Some(&song.title), rule.title_keywords) {
        score += KEYWORD_POINTS;
    }
    score
}

pub fn is_match(score: u32) -> bool {
    score >= MATCH_THRESHOLD
}

/// Popularity in 0..=1 from rating, views relative to `max_views`, and age.
pub fn popularity(song: &SongSummary, max_views: u64, now: i64) -> f64 {
    let rating = (song.rating_average / 5.0).clamp(0.0, 1.0);
    let views = if max_views == 0 {
        0.0
    } else {
        (1.0 + song.views as f64).ln() / (1.0 + max_views as f64).ln()
    };
    let age_days = ((now - song.created).max(0) as f64) / SECONDS_PER_DAY;
    let recency = (-age_days / RECENCY_DECAY_DAYS).exp();

    RATING_WEIGHT * rating + VIEWS_WEIGHT * views + RECENCY_WEIGHT * recency
}
