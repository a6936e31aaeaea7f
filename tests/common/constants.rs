//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, seeded songs), update only
//! this file and fixtures.rs.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user handle
pub const TEST_USER: &str = "testuser";

/// Regular test user password
pub const TEST_PASS: &str = "testpass123";

/// Admin test user handle
pub const ADMIN_USER: &str = "admin";

/// Admin test user password
pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Seeded Songbook
// ============================================================================

/// Hymn about grace, in G
pub const SONG_1_TITLE: &str = "Amazing Grace";

/// Christmas carol, in C
pub const SONG_2_TITLE: &str = "Silent Night";

/// Contemporary song about salvation
pub const SONG_3_TITLE: &str = "Cornerstone";

pub const SONG_1_ARTIST: &str = "John Newton";

/// Name of the single seeded arrangement of song 1
pub const ARRANGEMENT_1_NAME: &str = "Congregational";

/// Chord data of the seeded arrangement
pub const ARRANGEMENT_1_CHORDS: &str =
    "{title: Amazing Grace}\n{key: G}\n{start_of_verse}\nA[G]mazing [C]grace how [G]sweet the [D]sound\n{end_of_verse}\n";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
