//! SongbookStore trait definition.

use super::error::SongbookResult;
use super::models::*;

/// Storage for songs, arrangements and everything users attach to them.
///
/// Write operations that change a denormalized counter (rating aggregates,
/// setlist usage counts) recompute it within the same transaction.
pub trait SongbookStore: Send + Sync {
    // =========================================================================
    // Songs
    // =========================================================================

    fn create_song(&self, user_id: usize, song: NewSong) -> SongbookResult<Song>;

    fn get_song(&self, id: &str) -> SongbookResult<Song>;

    fn update_song(&self, id: &str, ctx: &UserContext, update: SongUpdate)
        -> SongbookResult<Song>;

    /// Deletes the song along with its themes, verses, comments, reviews and
    /// setlist entries. Arrangements lose the song, and arrangements left
    /// without songs are deleted.
    fn delete_song(&self, id: &str, ctx: &UserContext) -> SongbookResult<()>;

    fn list_songs(&self, query: &SongQuery) -> SongbookResult<Page<Song>>;

    /// Full text search over title, artist, lyrics and themes, best match first.
    fn search_songs(&self, query: &str, limit: usize) -> SongbookResult<Vec<Song>>;

    /// Returns the new view count.
    fn increment_song_views(&self, id: &str) -> SongbookResult<u64>;

    fn get_song_summaries(&self) -> SongbookResult<Vec<SongSummary>>;

    fn count_songs(&self) -> SongbookResult<usize>;

    // =========================================================================
    // Arrangements
    // =========================================================================

    fn create_arrangement(
        &self,
        user_id: usize,
        arrangement: NewArrangement,
    ) -> SongbookResult<Arrangement>;

    fn get_arrangement(&self, id: &str) -> SongbookResult<Arrangement>;

    /// Arrangements that include the song, mashups included.
    fn list_song_arrangements(&self, song_id: &str) -> SongbookResult<Vec<Arrangement>>;

    fn update_arrangement(
        &self,
        id: &str,
        ctx: &UserContext,
        update: ArrangementUpdate,
    ) -> SongbookResult<Arrangement>;

    fn delete_arrangement(&self, id: &str, ctx: &UserContext) -> SongbookResult<()>;

    fn increment_arrangement_views(&self, id: &str) -> SongbookResult<u64>;

    fn count_arrangements(&self) -> SongbookResult<usize>;

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Creates or replaces the user's review of the target.
    fn upsert_review(
        &self,
        user_id: usize,
        target: &ReviewTarget,
        review: NewReview,
    ) -> SongbookResult<Review>;

    fn delete_review(&self, user_id: usize, target: &ReviewTarget) -> SongbookResult<()>;

    fn list_reviews(&self, target: &ReviewTarget) -> SongbookResult<Vec<Review>>;

    fn get_user_review(
        &self,
        user_id: usize,
        target: &ReviewTarget,
    ) -> SongbookResult<Option<Review>>;

    // =========================================================================
    // Verses and comments
    // =========================================================================

    fn add_verse(&self, song_id: &str, user_id: usize, verse: NewVerse) -> SongbookResult<Verse>;

    /// Newest first.
    fn list_verses(&self, song_id: &str) -> SongbookResult<Vec<Verse>>;

    fn delete_verse(&self, song_id: &str, verse_id: &str, ctx: &UserContext)
        -> SongbookResult<()>;

    fn add_comment(
        &self,
        song_id: &str,
        user_id: usize,
        comment: NewComment,
    ) -> SongbookResult<Comment>;

    /// Oldest first.
    fn list_comments(&self, song_id: &str) -> SongbookResult<Vec<Comment>>;

    fn delete_comment(
        &self,
        song_id: &str,
        comment_id: &str,
        ctx: &UserContext,
    ) -> SongbookResult<()>;

    // =========================================================================
    // Setlists
    // =========================================================================

    fn create_setlist(&self, user_id: usize, setlist: NewSetlist) -> SongbookResult<Setlist>;

    /// A private setlist is only visible to its owner, others get NotFound.
    fn get_setlist(&self, id: &str, viewer: Option<usize>) -> SongbookResult<Setlist>;

    fn list_user_setlists(&self, user_id: usize) -> SongbookResult<Vec<Setlist>>;

    fn update_setlist(
        &self,
        id: &str,
        user_id: usize,
        update: SetlistUpdate,
    ) -> SongbookResult<Setlist>;

    fn add_setlist_entries(
        &self,
        id: &str,
        user_id: usize,
        entries: Vec<SetlistEntry>,
    ) -> SongbookResult<Setlist>;

    fn remove_setlist_entries(
        &self,
        id: &str,
        user_id: usize,
        positions: Vec<usize>,
    ) -> SongbookResult<Setlist>;

    fn move_setlist_entry(
        &self,
        id: &str,
        user_id: usize,
        from: usize,
        to: usize,
    ) -> SongbookResult<Setlist>;

    fn delete_setlist(&self, id: &str, user_id: usize) -> SongbookResult<()>;

    fn count_setlists(&self) -> SongbookResult<usize>;

    // =========================================================================
    // Per-user stats
    // =========================================================================

    fn count_user_content(&self, user_id: usize) -> SongbookResult<ContentCounts>;
}
