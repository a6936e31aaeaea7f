use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use songbook_server::user::{SqliteUserStore, UserManager, UserRole};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Manages songbook accounts directly in the user database.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to user.db.
    #[clap(value_parser = parse_path)]
    pub path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a user with a password and the given role.
    Add {
        user_handle: String,
        password: String,
        #[clap(long, default_value = "Regular")]
        role: String,
    },

    /// Sets or replaces the password of a user.
    SetPassword {
        user_handle: String,
        password: String,
    },

    /// Deletes the password of a user, disabling login.
    DeletePassword { user_handle: String },

    /// Adds a role to a user.
    Grant { user_handle: String, role: String },

    /// Removes a role from a user.
    Revoke { user_handle: String, role: String },

    /// Shows roles, permissions and tokens of a user.
    Show { user_handle: String },

    /// Lists all users.
    List,

    /// Shows all available roles and their permissions.
    ListRoles,
}

fn parse_role(role: &str) -> Result<UserRole> {
    match UserRole::from_str(role) {
        Some(r) => Ok(r),
        None => bail!("Invalid role '{}'. Valid roles are: Admin, Regular", role),
    }
}

fn require_user_id(user_manager: &UserManager, user_handle: &str) -> Result<usize> {
    user_manager
        .get_user_id(user_handle)?
        .with_context(|| format!("User '{}' not found", user_handle))
}

fn execute(command: Command, user_manager: &UserManager) -> Result<()> {
    match command {
        Command::Add {
            user_handle,
            password,
            role,
        } => {
            let role = parse_role(&role)?;
            let user_id = user_manager.add_user(&user_handle)?;
            user_manager.create_password_credentials(&user_handle, &password)?;
            user_manager.add_user_role(user_id, role)?;
            println!(
                "Created user '{}' ({}) with role {}",
                user_handle,
                user_id,
                role.as_str()
            );
        }
        Command::SetPassword {
            user_handle,
            password,
        } => {
            let has_password = user_manager
                .get_user_credentials(&user_handle)?
                .with_context(|| format!("User '{}' not found", user_handle))?
                .username_password
                .is_some();
            if has_password {
                user_manager.update_password_credentials(&user_handle, &password)?;
            } else {
                user_manager.create_password_credentials(&user_handle, &password)?;
            }
            println!("Password of '{}' updated", user_handle);
        }
        Command::DeletePassword { user_handle } => {
            user_manager.delete_password_credentials(&user_handle)?;
            println!("Password of '{}' deleted", user_handle);
        }
        Command::Grant { user_handle, role } => {
            let role = parse_role(&role)?;
            let user_id = require_user_id(user_manager, &user_handle)?;
            user_manager.add_user_role(user_id, role)?;
            println!("Role '{}' added to user '{}'", role.as_str(), user_handle);
        }
        Command::Revoke { user_handle, role } => {
            let role = parse_role(&role)?;
            let user_id = require_user_id(user_manager, &user_handle)?;
            user_manager.remove_user_role(user_id, role)?;
            println!(
                "Role '{}' removed from user '{}'",
                role.as_str(),
                user_handle
            );
        }
        Command::Show { user_handle } => {
            let user_id = require_user_id(user_manager, &user_handle)?;

            println!("User '{}' ({})", user_handle, user_id);
            println!("\nRoles:");
            let roles = user_manager.get_user_roles(user_id)?;
            if roles.is_empty() {
                println!("  (no roles assigned)");
            }
            for role in roles.iter() {
                println!("  - {}", role.as_str());
            }

            println!("\nResolved Permissions:");
            for permission in user_manager.get_user_permissions(user_id)?.iter() {
                println!("  - {:?}", permission);
            }

            println!("\nAuth Tokens:");
            for token in user_manager.get_user_tokens(&user_handle)?.iter() {
                println!(
                    "  - created {:?}, last used {:?}",
                    token.created, token.last_used
                );
            }
        }
        Command::List => {
            for user in user_manager.get_all_users()? {
                println!("{:>6}  {}", user.id, user.handle);
            }
        }
        Command::ListRoles => {
            println!("Available Roles:\n");
            for role in &[UserRole::Admin, UserRole::Regular] {
                println!("Role: {}", role.as_str());
                println!("Permissions:");
                for permission in role.permissions() {
                    println!("  - {:?}", permission);
                }
                println!();
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let user_store = SqliteUserStore::new(&cli_args.path)
        .with_context(|| format!("Could not open user database {:?}", cli_args.path))?;
    let user_manager = UserManager::new(Arc::new(user_store));
    execute(cli_args.command, &user_manager)
}
