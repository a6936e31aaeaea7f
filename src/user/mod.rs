pub mod auth;
pub mod permissions;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{AuthToken, AuthTokenValue, UserAuthCredentials, UsernamePasswordCredentials};
pub use permissions::{Permission, UserRole};
pub use sqlite_user_store::{SqliteUserStore, VERSIONED_SCHEMAS as USER_VERSIONED_SCHEMAS};
pub use user_manager::{UserManager, UserProfileUpdate};
pub use user_models::{FavoriteContentType, UserFavorite, UserProfile, UserSummary};
pub use user_store::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
