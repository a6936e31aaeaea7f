mod arrangement_routes;
mod auth_routes;
mod category_routes;
pub mod config;
pub mod error;
mod http_layers;
pub mod metrics;
pub mod server;
pub(self) mod session;
mod setlist_routes;
mod song_routes;
pub mod state;
mod sync_routes;
mod user_routes;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use session::Session;
