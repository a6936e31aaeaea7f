use super::auth::{AuthToken, AuthTokenValue, UserAuthCredentials};
use super::permissions::{Permission, UserRole};
use super::user_models::{FavoriteContentType, UserFavorite, UserProfile, UserSummary};
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the user's authentication credentials given the user handle.
    /// Returns Ok(None) if the user does not exist.
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>>;

    /// Replaces the user's authentication credentials.
    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()>;

    /// Records a login attempt, successful or not, on the password credentials.
    fn touch_password_credentials(&self, user_id: usize, success: bool) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns Ok(None) if the token does not exist.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token, returning it if it existed.
    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()>;

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()>;

    fn get_all_user_auth_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>>;

    /// Deletes tokens whose last use (or creation, if never used) is older
    /// than the given number of days. Returns the number of deleted tokens.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, user_handle: &str) -> Result<usize>;

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>>;

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>>;

    fn get_user_summary(&self, user_handle: &str) -> Result<Option<UserSummary>>;

    fn get_all_users(&self) -> Result<Vec<UserSummary>>;

    /// Adds or removes a favorite. Adding an existing favorite is a no-op.
    fn set_user_favorite(
        &self,
        user_id: usize,
        content_type: FavoriteContentType,
        content_id: &str,
        favorite: bool,
    ) -> Result<()>;

    fn is_user_favorite(&self, user_id: usize, content_id: &str) -> Result<bool>;

    /// Favorites of the given type, newest first.
    fn get_user_favorites(
        &self,
        user_id: usize,
        content_type: FavoriteContentType,
    ) -> Result<Vec<UserFavorite>>;

    fn get_user_profile(&self, user_id: usize) -> Result<UserProfile>;

    fn set_user_profile(&self, user_id: usize, profile: &UserProfile) -> Result<()>;

    fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>>;

    fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()>;

    fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()>;

    /// Resolves all permissions granted by the user's roles.
    fn resolve_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>>;
}
