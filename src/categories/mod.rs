//! Category browsing computed from song summaries.
//!
//! Categories are not stored. Every request scores the current song
//! summaries against the fixed rule list, so new or edited songs show up
//! immediately.

mod rules;
mod scoring;

pub use rules::{find_rule, CategoryRule, CATEGORY_RULES};
pub use scoring::{is_match, match_score, popularity, MATCH_THRESHOLD};

use crate::songbook::{Page, PageRequest, SongSummary, SongbookError, SongbookResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const TOP_SONGS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorySort {
    #[default]
    Popularity,
    Title,
    Newest,
    Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySong {
    #[serde(flatten)]
    pub song: SongSummary,
    pub match_score: u32,
    pub popularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub song_count: usize,
    /// Mean rating over the songs that have at least one review.
    pub average_rating: f64,
    pub total_views: u64,
    pub top_songs: Vec<CategorySong>,
}

/// Songs matching `rule`, with popularity relative to the matched set.
fn matching_songs(rule: &CategoryRule, songs: &[SongSummary], now: i64) -> Vec<CategorySong> {
    let matched: Vec<(&SongSummary, u32)> = songs
        .iter()
        .map(|s| (s, match_score(rule, s)))
        .filter(|(_, score)| is_match(*score))
        .collect();
    let max_views = matched.iter().map(|(s, _)| s.views).max().unwrap_or(0);
    matched
        .into_iter()
        .map(|(song, match_score)| CategorySong {
            popularity: popularity(song, max_views, now),
            song: song.clone(),
            match_score,
        })
        .collect()
}

fn sort_songs(songs: &mut [CategorySong], sort: CategorySort) {
    let by_title = |a: &CategorySong, b: &CategorySong| {
        a.song
            .title
            .to_lowercase()
            .cmp(&b.song.title.to_lowercase())
            .then_with(|| a.song.id.cmp(&b.song.id))
    };
    match sort {
        CategorySort::Popularity => songs.sort_by(|a, b| {
            b.popularity
                .partial_cmp(&a.popularity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| by_title(a, b))
        }),
        CategorySort::Title => songs.sort_by(by_title),
        CategorySort::Newest => songs.sort_by(|a, b| {
            b.song
                .created
                .cmp(&a.song.created)
                .then_with(|| by_title(a, b))
        }),
        CategorySort::Rating => songs.sort_by(|a, b| {
            b.song
                .rating_average
                .partial_cmp(&a.song.rating_average)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.song.rating_count.cmp(&a.song.rating_count))
                .then_with(|| by_title(a, b))
        }),
    }
}

/// One entry per rule, in rule order, empty categories included.
pub fn category_stats(songs: &[SongSummary], now: i64) -> Vec<CategoryStats> {
    CATEGORY_RULES
        .iter()
        .map(|rule| {
            let mut matched = matching_songs(rule, songs, now);
            let rated: Vec<f64> = matched
                .iter()
                .filter(|s| s.song.rating_count > 0)
                .map(|s| s.song.rating_average)
                .collect();
            let average_rating = if rated.is_empty() {
                0.0
            } else {
                let mean = rated.iter().sum::<f64>() / rated.len() as f64;
                (mean * 100.0).round() / 100.0
            };
            let total_views = matched.iter().map(|s| s.song.views).sum();
            let song_count = matched.len();

            sort_songs(&mut matched, CategorySort::Popularity);
            matched.truncate(TOP_SONGS);

            CategoryStats {
                slug: rule.slug,
                name: rule.name,
                description: rule.description,
                song_count,
                average_rating,
                total_views,
                top_songs: matched,
            }
        })
        .collect()
}

pub fn category_songs(
    slug: &str,
    songs: &[SongSummary],
    sort: CategorySort,
    page: PageRequest,
    now: i64,
) -> SongbookResult<Page<CategorySong>> {
    let rule = find_rule(slug).ok_or_else(|| SongbookError::not_found("category", slug))?;
    let mut matched = matching_songs(rule, songs, now);
    sort_songs(&mut matched, sort);
    Ok(page.apply(matched))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 20_000 * 86_400;

    fn summary(id: &str, title: &str, themes: &[&str]) -> SongSummary {
        SongSummary {
            id: id.to_string(),
            title: title.to_string(),
            artist: None,
            source: None,
            themes: themes.iter().map(|t| t.to_string()).collect(),
            views: 0,
            rating_average: 0.0,
            rating_count: 0,
            created: NOW,
        }
    }

    fn catalog() -> Vec<SongSummary> {
        let mut silent = summary("1", "Silent Night", &["christmas"]);
        silent.views = 500;
        silent.rating_average = 4.0;
        silent.rating_count = 3;
        let mut joy = summary("2", "Joy To The World", &["christmas", "praise"]);
        joy.views = 20;
        let mut grace = summary("3", "Amazing Grace", &["grace"]);
        grace.source = Some("Olney Hymns".to_string());
        grace.rating_average = 5.0;
        grace.rating_count = 1;
        let other = summary("4", "Untitled", &["misc"]);
        vec![silent, joy, grace, other]
    }

    #[test]
    fn stats_cover_every_rule_in_order() {
        let stats = category_stats(&catalog(), NOW);
        let slugs: Vec<&str> = stats.iter().map(|s| s.slug).collect();
        let expected: Vec<&str> = CATEGORY_RULES.iter().map(|r| r.slug).collect();
        assert_eq!(slugs, expected);

        let christmas = stats.iter().find(|s| s.slug == "christmas").unwrap();
        assert_eq!(christmas.song_count, 2);
        assert_eq!(christmas.total_views, 520);
        assert_eq!(christmas.average_rating, 4.0);
        assert_eq!(christmas.top_songs[0].song.id, "1");

        let kids = stats.iter().find(|s| s.slug == "kids").unwrap();
        assert_eq!(kids.song_count, 0);
        assert!(kids.top_songs.is_empty());
    }

    #[test]
    fn a_song_can_be_in_several_categories() {
        let stats = category_stats(&catalog(), NOW);
        let count_of = |slug: &str| stats.iter().find(|s| s.slug == slug).unwrap().song_count;
        // Amazing Grace: salvation by theme and title, hymns by source
        assert_eq!(count_of("salvation"), 1);
        assert_eq!(count_of("hymns"), 1);
        // Joy To The World carries the praise theme
        assert_eq!(count_of("worship"), 1);
    }

    #[test]
    fn category_songs_sort_and_page() {
        let page = category_songs(
            "christmas",
            &catalog(),
            CategorySort::Title,
            PageRequest::new(None, None),
            NOW,
        )
        .unwrap();
        let titles: Vec<&str> = page.items.iter().map(|s| s.song.title.as_str()).collect();
        assert_eq!(titles, vec!["Joy To The World", "Silent Night"]);
        assert!(page.items.iter().all(|s| s.match_score >= MATCH_THRESHOLD));

        let second = category_songs(
            "christmas",
            &catalog(),
            CategorySort::Popularity,
            PageRequest::new(Some(2), Some(1)),
            NOW,
        )
        .unwrap();
        assert_eq!(second.total, 2);
        assert_eq!(second.items[0].song.id, "2");
    }

    #[test]
    fn unknown_slug_is_not_found() {
        let err = category_songs(
            "polka",
            &catalog(),
            CategorySort::default(),
            PageRequest::new(None, None),
            NOW,
        )
        .unwrap_err();
        assert!(matches!(err, SongbookError::NotFound(_)));
    }
}
