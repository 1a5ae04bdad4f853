//! HTTP API handlers for airplay-ls

pub mod handlers;
pub mod health;

pub use handlers::{
    add_channel, add_performer, add_play, add_song, get_channel_plays, get_song_plays, get_top,
    unknown_operation,
};
pub use health::health_routes;
