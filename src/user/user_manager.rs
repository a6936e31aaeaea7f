use super::{
    auth::PasswordHasherKind,
    permissions::{Permission, UserRole},
    user_models::{FavoriteContentType, UserFavorite, UserProfile, UserSummary},
    AuthToken, AuthTokenValue, UserAuthCredentials, UserStore, UsernamePasswordCredentials,
};
use crate::songbook::{validation, SongbookError, SongbookResult};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{sync::Arc, time::SystemTime};
use tracing::{debug, info};

const MAX_PROFILE_SHORT_TEXT_LEN: usize = 100;

/// Partial profile update: absent fields are kept, blank fields are cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self { user_store }
    }

    pub fn add_user<T: AsRef<str>>(&self, user_handle: T) -> Result<usize> {
        let user_handle = validation::user_handle(user_handle.as_ref())?;
        if self.user_store.get_user_id(&user_handle)?.is_some() {
            bail!("User handle already exists.");
        }
        self.user_store.create_user(&user_handle)
    }

    /// Creates a Regular user with password credentials.
    pub fn register_user(&self, user_handle: &str, password: &str) -> SongbookResult<usize> {
        let user_handle = validation::user_handle(user_handle)?;
        validation::password(password)?;
        if self.user_store.get_user_id(&user_handle)?.is_some() {
            return Err(SongbookError::Conflict(format!(
                "user handle {} is taken",
                user_handle
            )));
        }

        let user_id = self.user_store.create_user(&user_handle)?;
        self.user_store.add_user_role(user_id, UserRole::Regular)?;
        self.user_store.update_user_auth_credentials(UserAuthCredentials {
            user_id,
            username_password: Some(Self::create_hashed_password(user_id, password)?),
        })?;
        info!("Registered user {} ({})", user_handle, user_id);
        Ok(user_id)
    }

    /// Checks the password and, when it matches, issues a fresh token.
    /// Returns Ok(None) on unknown users and wrong passwords alike.
    pub fn login(&self, user_handle: &str, password: &str) -> Result<Option<AuthToken>> {
        let credentials = match self.user_store.get_user_auth_credentials(user_handle)? {
            Some(UserAuthCredentials {
                username_password: Some(credentials),
                ..
            }) => credentials,
            _ => {
                debug!("No password credentials for {}", user_handle);
                return Ok(None);
            }
        };

        let matches = credentials
            .hasher
            .verify(password, credentials.hash.as_str())?;
        self.user_store
            .touch_password_credentials(credentials.user_id, matches)?;
        if !matches {
            debug!("Wrong password for {}", user_handle);
            return Ok(None);
        }
        self.generate_auth_token(credentials.user_id).map(Some)
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        self.user_store.get_user_auth_token(value)
    }

    pub fn update_auth_token_last_used(&self, value: &AuthTokenValue) -> Result<()> {
        self.user_store
            .update_user_auth_token_last_used_timestamp(value)
    }

    pub fn generate_auth_token(&self, user_id: usize) -> Result<AuthToken> {
        let token = AuthToken {
            user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store.add_user_auth_token(token.clone())?;
        Ok(token)
    }

    fn create_hashed_password(user_id: usize, password: &str) -> Result<UsernamePasswordCredentials> {
        let hasher = PasswordHasherKind::Argon2;
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(UsernamePasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        })
    }

    pub fn create_password_credentials(&self, user_handle: &str, password: &str) -> Result<()> {
        validation::password(password)?;
        let mut credentials = self
            .user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        if credentials.username_password.is_some() {
            bail!(
                "User with handle {} already has a password. Maybe you want to update it?",
                user_handle
            );
        }
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        self.user_store.update_user_auth_credentials(credentials)
    }

    pub fn update_password_credentials(&self, user_handle: &str, password: &str) -> Result<()> {
        validation::password(password)?;
        let mut credentials = self
            .user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        if credentials.username_password.is_none() {
            bail!(
                "Cannot update the password of {} since it never had one.",
                user_handle
            );
        }
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        self.user_store.update_user_auth_credentials(credentials)
    }

    pub fn get_user_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        self.user_store.get_user_auth_credentials(user_handle)
    }

    pub fn delete_password_credentials(&self, user_handle: &str) -> Result<()> {
        let mut credentials = self
            .user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        credentials.username_password = None;
        self.user_store.update_user_auth_credentials(credentials)
    }

    /// Deletes a token, but only on behalf of its owner.
    pub fn delete_auth_token(&self, user_id: usize, token_value: &AuthTokenValue) -> Result<()> {
        match self.user_store.get_user_auth_token(token_value)? {
            Some(token) if token.user_id == user_id => {
                self.user_store.delete_user_auth_token(token_value)?;
                Ok(())
            }
            Some(token) => bail!(
                "User {} tried to delete a token owned by {}",
                user_id,
                token.user_id
            ),
            None => bail!("Did not find auth token"),
        }
    }

    pub fn get_user_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>> {
        self.user_store.get_all_user_auth_tokens(user_handle)
    }

    pub fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        self.user_store.prune_unused_auth_tokens(unused_for_days)
    }

    pub fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        self.user_store.get_user_handle(user_id)
    }

    pub fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        self.user_store.get_user_id(user_handle)
    }

    pub fn get_user_summary(&self, user_handle: &str) -> Result<Option<UserSummary>> {
        self.user_store.get_user_summary(user_handle)
    }

    pub fn get_all_users(&self) -> Result<Vec<UserSummary>> {
        self.user_store.get_all_users()
    }

    pub fn set_user_favorite(
        &self,
        user_id: usize,
        content_type: FavoriteContentType,
        content_id: &str,
        favorite: bool,
    ) -> Result<()> {
        self.user_store
            .set_user_favorite(user_id, content_type, content_id, favorite)
    }

    pub fn is_user_favorite(&self, user_id: usize, content_id: &str) -> Result<bool> {
        self.user_store.is_user_favorite(user_id, content_id)
    }

    pub fn get_user_favorites(
        &self,
        user_id: usize,
        content_type: FavoriteContentType,
    ) -> Result<Vec<UserFavorite>> {
        self.user_store.get_user_favorites(user_id, content_type)
    }

    pub fn get_user_profile(&self, user_id: usize) -> Result<UserProfile> {
        self.user_store.get_user_profile(user_id)
    }

    pub fn update_user_profile(
        &self,
        user_id: usize,
        update: UserProfileUpdate,
    ) -> SongbookResult<UserProfile> {
        let current = self.user_store.get_user_profile(user_id)?;
        let profile = UserProfile {
            display_name: validation::optional_text(
                "display_name",
                update.display_name.or(current.display_name).as_deref(),
                MAX_PROFILE_SHORT_TEXT_LEN,
            )?,
            bio: validation::optional_text(
                "bio",
                update.bio.or(current.bio).as_deref(),
                validation::MAX_LONG_TEXT_LEN,
            )?,
            location: validation::optional_text(
                "location",
                update.location.or(current.location).as_deref(),
                MAX_PROFILE_SHORT_TEXT_LEN,
            )?,
        };
        self.user_store.set_user_profile(user_id, &profile)?;
        Ok(profile)
    }

    pub fn get_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>> {
        self.user_store.resolve_user_permissions(user_id)
    }

    pub fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>> {
        self.user_store.get_user_roles(user_id)
    }

    pub fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        self.user_store.add_user_role(user_id, role)
    }

    pub fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        self.user_store.remove_user_role(user_id, role)
    }
}
