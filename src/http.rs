use std::io;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::body::StreamBody;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{stream, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::SiteSettings;
use crate::mods::archive::{prepare_archive, ArchiveSink, AssembleError};
use crate::mods::remote_repo::RemoteModsRepo;
use crate::mods::version::ModsVersion;
use crate::mods::version_set::list_versions;
use crate::mods::ModsSettings;

/// chunks in flight between the archive writer task and the response body
const ARCHIVE_CHANNEL_CAPACITY: usize = 4;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn RemoteModsRepo>,
    pub mods: Arc<ModsSettings>,
    pub site: Arc<SiteSettings>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/versions", get(versions))
        .route("/version", get(download_by_query))
        .route("/version/:version", get(download_by_path))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<String>,
}

fn error_response(status: StatusCode, error: impl Into<String>, message: Option<String>) -> Response {
    let body = ErrorBody {
        error: error.into(),
        message,
        example: None,
    };
    (status, Json(body)).into_response()
}

fn bad_version_response(site: &SiteSettings, error: &str) -> Response {
    let body = ErrorBody {
        error: error.to_string(),
        message: None,
        example: Some(format!("{}/version/1.21.8", site.public_base_url)),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

#[derive(Serialize)]
struct EndpointDescriptor {
    url: &'static str,
    method: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<&'static str>,
}

#[derive(Serialize)]
struct Endpoints {
    versions: EndpointDescriptor,
    download: EndpointDescriptor,
}

#[derive(Serialize)]
struct ServiceDescriptor {
    name: &'static str,
    version: &'static str,
    endpoints: Endpoints,
    github: String,
}

async fn root(State(state): State<AppState>) -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor {
        name: "Endxel Mods API",
        version: "1.0.0",
        endpoints: Endpoints {
            versions: EndpointDescriptor {
                url: "/versions",
                method: "GET",
                description: "List all available Minecraft versions",
                example: None,
            },
            download: EndpointDescriptor {
                url: "/version/{version}",
                method: "GET",
                description: "Download all mods for a specific Minecraft version as a zip file",
                example: Some("/version/1.21.8"),
            },
        },
        github: state.site.public_repository_url.clone(),
    })
}

#[derive(Serialize)]
struct VersionsResponse {
    success: bool,
    versions: Vec<String>,
    count: usize,
}

async fn versions(State(state): State<AppState>) -> Response {
    match list_versions(state.repo.as_ref(), &state.mods).await {
        Ok(versions) => {
            let versions = versions.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>();
            let body = VersionsResponse {
                success: true,
                count: versions.len(),
                versions,
            };
            ([(CACHE_CONTROL, "s-maxage=300, stale-while-revalidate")], Json(body)).into_response()
        }
        Err(e) => {
            error!("failed to list versions: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch versions", Some(e.to_string()))
        }
    }
}

#[derive(Deserialize)]
struct VersionQuery {
    version: Option<String>,
    v: Option<String>,
}

// A parameter that can not be extracted at all (e.g. not UTF-8 after percent-decoding, or
//  repeated) is an invalid version, not a framework-level plain text rejection.

async fn download_by_path(State(state): State<AppState>, version: Result<Path<String>, PathRejection>) -> Response {
    match version {
        Ok(Path(version)) => download(state, Some(version)).await,
        Err(e) => {
            warn!("rejecting download path: {}", e);
            bad_version_response(&state.site, "Invalid version format")
        }
    }
}

async fn download_by_query(State(state): State<AppState>, query: Result<Query<VersionQuery>, QueryRejection>) -> Response {
    match query {
        Ok(Query(query)) => {
            let version = query.version
                .filter(|v| !v.is_empty())
                .or(query.v);
            download(state, version).await
        }
        Err(e) => {
            warn!("rejecting download query: {}", e);
            bad_version_response(&state.site, "Invalid version format")
        }
    }
}

async fn download(state: AppState, version: Option<String>) -> Response {
    let Some(version) = version.filter(|v| !v.is_empty()) else {
        return bad_version_response(&state.site, "Please provide a version");
    };
    let Ok(version) = ModsVersion::parse(&version) else {
        return bad_version_response(&state.site, "Invalid version format");
    };

    let plan = match prepare_archive(state.repo.as_ref(), &state.mods, &version).await {
        Ok(plan) => plan,
        Err(e) => return assemble_error_response(&state.mods, e),
    };

    info!("streaming up to {} members for version {}", plan.members().len(), plan.version());

    let (tx, mut rx) = mpsc::channel(ARCHIVE_CHANNEL_CAPACITY);
    let repo = state.repo.clone();
    tokio::spawn(async move {
        let mut sink = ChannelSink(tx);
        match plan.write_to(repo.as_ref(), &mut sink).await {
            Ok(report) => {
                if !report.skipped().is_empty() {
                    warn!("archive was sent without {:?}", report.skipped());
                }
            }
            Err(e) => {
                error!("aborting archive stream: {}", e);
                sink.abort(e).await;
            }
        }
    });

    let first = match first_chunk(&mut rx).await {
        Ok(first) => first,
        Err(response) => return response,
    };
    let body = stream::once(async move { Ok::<_, io::Error>(first) })
        .chain(rx);

    let file_name = format!("{}-mods-{}.zip", state.site.archive_prefix, version);
    (
        [
            (CONTENT_TYPE, "application/zip".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        StreamBody::new(body),
    ).into_response()
}

/// Nothing is committed until the first chunk shows up, so a failure before that can still be
///  reported with a proper status. Later failures end the body with an error, which aborts the
///  connection.
async fn first_chunk(rx: &mut mpsc::Receiver<Result<Bytes, io::Error>>) -> Result<Bytes, Response> {
    match rx.next().await {
        Some(Ok(first)) => Ok(first),
        Some(Err(e)) => Err(archive_failure_response(e.to_string())),
        None => Err(archive_failure_response("archive stream ended unexpectedly".to_string())),
    }
}

fn archive_failure_response(message: String) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create zip archive", Some(message))
}

fn assemble_error_response(mods: &ModsSettings, e: AssembleError) -> Response {
    match e {
        AssembleError::VersionNotFound(version) => error_response(
            StatusCode::NOT_FOUND,
            format!("Version {} not found", version),
            Some(format!("No mods available for Minecraft {}", version)),
        ),
        AssembleError::NoMembers(version) => error_response(
            StatusCode::NOT_FOUND,
            "No mods found",
            Some(format!("No {} files found for version {}", mods.member_extension, version)),
        ),
        e @ AssembleError::UpstreamFailure(_) => {
            error!("failed to prepare archive: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e.to_string()))
        }
        e @ AssembleError::ArchiveFailure(_) => {
            error!("failed to prepare archive: {}", e);
            archive_failure_response(e.to_string())
        }
    }
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", None)
}

/// Feeds archive bytes into the response body. Sending fails once the client went away, which
///  stops the assembly.
struct ChannelSink(mpsc::Sender<Result<Bytes, io::Error>>);
impl ChannelSink {
    async fn abort(&mut self, e: AssembleError) {
        // if the receiver is gone there is nobody left to tell
        let _ = self.0.send(Err(io::Error::new(io::ErrorKind::Other, e.to_string()))).await;
    }
}

#[async_trait]
impl ArchiveSink for ChannelSink {
    async fn write_chunk(&mut self, chunk: Bytes) -> anyhow::Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.0.send(Ok(chunk))
            .await
            .context("response body was dropped")
    }
}
