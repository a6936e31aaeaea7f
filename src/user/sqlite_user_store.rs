use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use crate::user::*;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    collections::HashSet,
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};
use tracing::{debug, warn};

use super::auth::PasswordHasherKind;

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};
const FAVORITE_TABLE_V_0: Table = Table {
    name: "favorite",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("content_type", &SqlType::Integer, non_null = true),
        sqlite_column!("content_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "content_type", "content_id"]],
    indices: &[("idx_favorite_user_id", "user_id")],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};
const USER_PASSWORD_CREDENTIALS_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_tried", &SqlType::Integer),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[],
};
const USER_ROLE_TABLE_V_0: Table = Table {
    name: "user_role",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "role"]],
    indices: &[("idx_user_role_user_id", "user_id")],
};

/// V 1
const USER_PROFILE_TABLE_V_1: Table = Table {
    name: "user_profile",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("display_name", &SqlType::Text),
        sqlite_column!("bio", &SqlType::Text),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            USER_TABLE_V_0,
            FAVORITE_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_V_0,
            USER_ROLE_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE_V_0,
            FAVORITE_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_V_0,
            USER_ROLE_TABLE_V_0,
            USER_PROFILE_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| {
            USER_PROFILE_TABLE_V_1.create(conn)?;
            Ok(())
        }),
    },
];

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn system_time_from_column_result(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

fn auth_token_from_row(row: &rusqlite::Row) -> rusqlite::Result<AuthToken> {
    Ok(AuthToken {
        user_id: row.get(0)?,
        value: AuthTokenValue(row.get(1)?),
        created: system_time_from_column_result(row.get(2)?),
        last_used: row
            .get::<usize, Option<i64>>(3)?
            .map(system_time_from_column_result),
    })
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS).context("Failed to open user db")?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("INSERT INTO {} (handle) VALUES (?1)", USER_TABLE_V_0.name),
            params![user_handle],
        )
        .with_context(|| format!("Could not create user {}", user_handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT handle FROM {} WHERE id = ?1", USER_TABLE_V_0.name),
                params![user_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT id FROM {} WHERE handle = ?1", USER_TABLE_V_0.name),
                params![user_handle],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn get_user_summary(&self, user_handle: &str) -> Result<Option<UserSummary>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT id, handle, created FROM {} WHERE handle = ?1",
                    USER_TABLE_V_0.name
                ),
                params![user_handle],
                |row| {
                    Ok(UserSummary {
                        id: row.get(0)?,
                        handle: row.get(1)?,
                        created: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn get_all_users(&self) -> Result<Vec<UserSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, handle, created FROM {} ORDER BY id",
            USER_TABLE_V_0.name
        ))?;
        let users = stmt
            .query_map([], |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    handle: row.get(1)?,
                    created: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn set_user_favorite(
        &self,
        user_id: usize,
        content_type: FavoriteContentType,
        content_id: &str,
        favorite: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        if favorite {
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (user_id, content_type, content_id, created) VALUES (?1, ?2, ?3, ?4)",
                    FAVORITE_TABLE_V_0.name
                ),
                params![user_id, content_type.to_int(), content_id, now_secs()],
            )?;
        } else {
            conn.execute(
                &format!(
                    "DELETE FROM {} WHERE user_id = ?1 AND content_type = ?2 AND content_id = ?3",
                    FAVORITE_TABLE_V_0.name
                ),
                params![user_id, content_type.to_int(), content_id],
            )?;
        }
        Ok(())
    }

    fn is_user_favorite(&self, user_id: usize, content_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND content_id = ?2",
                FAVORITE_TABLE_V_0.name
            ),
            params![user_id, content_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn get_user_favorites(
        &self,
        user_id: usize,
        content_type: FavoriteContentType,
    ) -> Result<Vec<UserFavorite>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT content_id, created FROM {} WHERE user_id = ?1 AND content_type = ?2 ORDER BY created DESC, rowid DESC",
            FAVORITE_TABLE_V_0.name
        ))?;
        let favorites = stmt
            .query_map(params![user_id, content_type.to_int()], |row| {
                Ok(UserFavorite {
                    content_type,
                    content_id: row.get(0)?,
                    created: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    fn get_user_profile(&self, user_id: usize) -> Result<UserProfile> {
        let conn = self.conn.lock().unwrap();
        let profile = conn
            .query_row(
                &format!(
                    "SELECT display_name, bio, location FROM {} WHERE user_id = ?1",
                    USER_PROFILE_TABLE_V_1.name
                ),
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        display_name: row.get(0)?,
                        bio: row.get(1)?,
                        location: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(profile.unwrap_or_default())
    }

    fn set_user_profile(&self, user_id: usize, profile: &UserProfile) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, display_name, bio, location, updated) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET display_name = ?2, bio = ?3, location = ?4, updated = ?5",
                USER_PROFILE_TABLE_V_1.name
            ),
            params![
                user_id,
                profile.display_name,
                profile.bio,
                profile.location,
                now_secs()
            ],
        )?;
        Ok(())
    }

    fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT role FROM {} WHERE user_id = ?1",
            USER_ROLE_TABLE_V_0.name
        ))?;
        let roles = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .filter_map(|r| match r {
                Ok(s) => UserRole::from_str(&s),
                Err(err) => {
                    warn!("Failed to read role of user {}: {}", user_id, err);
                    None
                }
            })
            .collect();
        Ok(roles)
    }

    fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (user_id, role) VALUES (?1, ?2)",
                USER_ROLE_TABLE_V_0.name
            ),
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }

    fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND role = ?2",
                USER_ROLE_TABLE_V_0.name
            ),
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }

    fn resolve_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>> {
        let mut permissions = HashSet::new();
        for role in self.get_user_roles(user_id)? {
            permissions.extend(role.permissions().iter().copied());
        }
        let mut permissions: Vec<Permission> = permissions.into_iter().collect();
        permissions.sort_by_key(|p| p.as_int());
        Ok(permissions)
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT user_id, value, created, last_used FROM {} WHERE value = ?1",
                    AUTH_TOKEN_TABLE_V_0.name
                ),
                params![value.0],
                auth_token_from_row,
            )
            .optional()?)
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let existing = match self.get_user_auth_token(token)? {
            Some(t) => t,
            None => return Ok(None),
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("DELETE FROM {} WHERE value = ?1", AUTH_TOKEN_TABLE_V_0.name),
            params![token.0],
        )?;
        Ok(Some(existing))
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE {} SET last_used = ?1 WHERE value = ?2",
                AUTH_TOKEN_TABLE_V_0.name
            ),
            params![now_secs(), token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let created = token
            .created
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_else(|_| now_secs());
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (value, user_id, created) VALUES (?1, ?2, ?3)",
                AUTH_TOKEN_TABLE_V_0.name
            ),
            params![token.value.0, token.user_id, created],
        )?;
        Ok(())
    }

    fn get_all_user_auth_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT user_id, value, created, last_used FROM {} WHERE user_id = (SELECT id FROM {} WHERE handle = ?1)",
            AUTH_TOKEN_TABLE_V_0.name, USER_TABLE_V_0.name
        ))?;
        let tokens = stmt
            .query_map(params![user_handle], auth_token_from_row)?
            .collect::<Result<Vec<AuthToken>, _>>()?;
        Ok(tokens)
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let cutoff = now_secs() - (unused_for_days as i64) * 24 * 60 * 60;
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE COALESCE(last_used, created) < ?1",
                AUTH_TOKEN_TABLE_V_0.name
            ),
            params![cutoff],
        )?;
        debug!("Pruned {} auth tokens unused since {}", deleted, cutoff);
        Ok(deleted)
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        let user_id = match self.get_user_id(user_handle)? {
            Some(id) => id,
            None => return Ok(None),
        };
        let conn = self.conn.lock().unwrap();
        let password_credentials = conn
            .query_row(
                &format!(
                    "SELECT user_id, salt, hash, hasher, created, last_tried, last_used FROM {} WHERE user_id = ?1",
                    USER_PASSWORD_CREDENTIALS_V_0.name
                ),
                params![user_id],
                |row| {
                    let hasher = PasswordHasherKind::from_str(&row.get::<usize, String>(3)?)
                        .map_err(|_| {
                            rusqlite::Error::InvalidColumnType(
                                3,
                                "hasher".to_string(),
                                rusqlite::types::Type::Text,
                            )
                        })?;
                    Ok(UsernamePasswordCredentials {
                        user_id: row.get(0)?,
                        salt: row.get(1)?,
                        hash: row.get(2)?,
                        hasher,
                        created: system_time_from_column_result(row.get(4)?),
                        last_tried: row
                            .get::<usize, Option<i64>>(5)?
                            .map(system_time_from_column_result),
                        last_used: row
                            .get::<usize, Option<i64>>(6)?
                            .map(system_time_from_column_result),
                    })
                },
            )
            .optional()?;

        Ok(Some(UserAuthCredentials {
            user_id,
            username_password: password_credentials,
        }))
    }

    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let user_id = credentials.user_id;
        match credentials.username_password.as_ref() {
            Some(password_credentials) => {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(user_id) DO UPDATE SET salt = ?2, hash = ?3, hasher = ?4",
                        USER_PASSWORD_CREDENTIALS_V_0.name
                    ),
                    params![
                        user_id,
                        password_credentials.salt,
                        password_credentials.hash,
                        password_credentials.hasher.to_string(),
                    ],
                )?;
            }
            None => {
                conn.execute(
                    &format!(
                        "DELETE FROM {} WHERE user_id = ?1",
                        USER_PASSWORD_CREDENTIALS_V_0.name
                    ),
                    params![user_id],
                )?;
            }
        };
        Ok(())
    }

    fn touch_password_credentials(&self, user_id: usize, success: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let column = if success { "last_used" } else { "last_tried" };
        conn.execute(
            &format!(
                "UPDATE {} SET {} = ?1 WHERE user_id = ?2",
                USER_PASSWORD_CREDENTIALS_V_0.name, column
            ),
            params![now_secs(), user_id],
        )?;
        Ok(())
    }
}
