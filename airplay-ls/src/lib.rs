//! airplay-ls library - Play ledger service
//!
//! Records which songs played on which channels and when, and answers
//! history and weekly chart queries over HTTP.

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod ledger;

pub use ledger::Ledger;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Storage service; each handler opens its own session through it
    pub ledger: Ledger,
    /// `get_top` limit when the request has none
    pub default_limit: u32,
}

impl AppState {
    /// Create new application state
    pub fn new(ledger: Ledger, default_limit: u32) -> Self {
        Self {
            ledger,
            default_limit,
        }
    }
}

/// Build application router
///
/// The operation table is closed: reads are GET, writes are POST, any other
/// path answers 404 and a wrong method answers 405.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let operations = Router::new()
        .route("/add_channel", post(api::add_channel))
        .route("/add_performer", post(api::add_performer))
        .route("/add_song", post(api::add_song))
        .route("/add_play", post(api::add_play))
        .route("/get_song_plays", get(api::get_song_plays))
        .route("/get_channel_plays", get(api::get_channel_plays))
        .route("/get_top", get(api::get_top));

    Router::new()
        .merge(operations)
        .merge(api::health_routes())
        .fallback(api::unknown_operation)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
