mod error;
mod models;
mod schema;
mod store;
mod trait_def;
pub mod validation;

pub use error::{SongbookError, SongbookResult};
pub use models::*;
pub use schema::VERSIONED_SCHEMAS as SONGBOOK_VERSIONED_SCHEMAS;
pub use store::SqliteSongbookStore;
pub use trait_def::SongbookStore;
