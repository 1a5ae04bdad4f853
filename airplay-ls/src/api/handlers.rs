//! Operation handlers
//!
//! Writes take form-encoded bodies, reads take query strings. Timestamps
//! are parsed here; the ledger only sees instants.

use axum::{
    extract::{rejection::FormRejection, rejection::QueryRejection, Query, State},
    http::Uri,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use airplay_common::db::{Channel, ChartEntry, NewPlay, Performer, Play, Song};
use airplay_common::time::{format_instant, parse_instant};

/// Success envelope
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub result: T,
    pub code: u16,
}

fn respond<T: Serialize>(result: T) -> Json<Envelope<T>> {
    Json(Envelope { result, code: 0 })
}

fn form<T>(payload: Result<Form<T>, FormRejection>) -> ApiResult<T> {
    payload
        .map(|Form(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn query<T>(payload: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    payload
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct NameForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SongForm {
    pub title: String,
    pub performer: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayForm {
    pub title: String,
    pub performer: String,
    pub channel: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct SongPlaysQuery {
    pub title: String,
    pub performer: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelPlaysQuery {
    pub channel: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    /// JSON array of channel names, e.g. `["C1","C2"]`
    pub channels: String,
    pub start: String,
    pub limit: Option<u32>,
}

/// One entry of `get_song_plays`
#[derive(Debug, Serialize)]
pub struct SongPlayView {
    pub channel: String,
    pub start: String,
    pub end: String,
}

impl From<Play> for SongPlayView {
    fn from(play: Play) -> Self {
        Self {
            channel: play.channel.name,
            start: format_instant(&play.start),
            end: format_instant(&play.end),
        }
    }
}

/// One entry of `get_channel_plays`
#[derive(Debug, Serialize)]
pub struct ChannelPlayView {
    pub performer: String,
    pub title: String,
    pub start: String,
    pub end: String,
}

impl From<Play> for ChannelPlayView {
    fn from(play: Play) -> Self {
        Self {
            performer: play.song.performer.name,
            title: play.song.name,
            start: format_instant(&play.start),
            end: format_instant(&play.end),
        }
    }
}

/// POST /add_channel (name)
pub async fn add_channel(
    State(state): State<AppState>,
    payload: Result<Form<NameForm>, FormRejection>,
) -> ApiResult<Json<Envelope<Channel>>> {
    let body = form(payload)?;
    debug!("Add channel: {}", body.name);

    let channel = state.ledger.add_channel(&body.name).await?;
    Ok(respond(channel))
}

/// POST /add_performer (name)
pub async fn add_performer(
    State(state): State<AppState>,
    payload: Result<Form<NameForm>, FormRejection>,
) -> ApiResult<Json<Envelope<Performer>>> {
    let body = form(payload)?;
    debug!("Add performer: {}", body.name);

    let performer = state.ledger.add_performer(&body.name).await?;
    Ok(respond(performer))
}

/// POST /add_song (title, performer)
pub async fn add_song(
    State(state): State<AppState>,
    payload: Result<Form<SongForm>, FormRejection>,
) -> ApiResult<Json<Envelope<Song>>> {
    let body = form(payload)?;
    debug!("Add song: {}, {}", body.title, body.performer);

    let song = state.ledger.add_song(&body.title, &body.performer).await?;
    Ok(respond(song))
}

/// POST /add_play (title, performer, channel, start, end)
///
/// `result` is null when the channel already has a play at `start`.
pub async fn add_play(
    State(state): State<AppState>,
    payload: Result<Form<PlayForm>, FormRejection>,
) -> ApiResult<Json<Envelope<Option<Play>>>> {
    let body = form(payload)?;
    let new_play = NewPlay {
        start: parse_instant(&body.start)?,
        end: parse_instant(&body.end)?,
        title: body.title,
        performer: body.performer,
        channel: body.channel,
    };
    debug!(
        "Add play: {}:{}, {}-{} on {}",
        new_play.title, new_play.performer, new_play.start, new_play.end, new_play.channel
    );

    let play = state.ledger.add_play(&new_play).await?;
    Ok(respond(play))
}

/// GET /get_song_plays?title&performer&start&end
pub async fn get_song_plays(
    State(state): State<AppState>,
    params: Result<Query<SongPlaysQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<SongPlayView>>>> {
    let params = query(params)?;
    let start = parse_instant(&params.start)?;
    let end = parse_instant(&params.end)?;
    debug!(
        "Get song plays: {}:{}, {} {}",
        params.title, params.performer, start, end
    );

    let plays = state
        .ledger
        .song_plays(&params.title, &params.performer, &start, &end)
        .await?;
    Ok(respond(plays.into_iter().map(SongPlayView::from).collect()))
}

/// GET /get_channel_plays?channel&start&end
pub async fn get_channel_plays(
    State(state): State<AppState>,
    params: Result<Query<ChannelPlaysQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<ChannelPlayView>>>> {
    let params = query(params)?;
    let start = parse_instant(&params.start)?;
    let end = parse_instant(&params.end)?;
    debug!("Get channel plays: {}, {} {}", params.channel, start, end);

    let plays = state
        .ledger
        .channel_plays(&params.channel, &start, &end)
        .await?;
    Ok(respond(plays.into_iter().map(ChannelPlayView::from).collect()))
}

/// GET /get_top?channels=["C1"]&start&limit
pub async fn get_top(
    State(state): State<AppState>,
    params: Result<Query<TopQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<ChartEntry>>>> {
    let params = query(params)?;
    let channels: Vec<String> = serde_json::from_str(&params.channels).map_err(|e| {
        ApiError::BadRequest(format!("channels must be a JSON array of names: {}", e))
    })?;
    let anchor = parse_instant(&params.start)?;
    let limit = params.limit.unwrap_or(state.default_limit);
    debug!("Get top: {:?}, {} {}", channels, anchor, limit);

    let chart = state.ledger.top(&channels, anchor, limit as usize).await?;
    Ok(respond(chart))
}

/// Any path outside the operation table
pub async fn unknown_operation(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().trim_start_matches('/').to_string())
}
