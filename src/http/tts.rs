//! `GET /v1/tts/audio/{paper_id}` and `GET /v1/tts/file/{filename}` — TTS
//! artifact lookup and streaming.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::http::AppState;

#[derive(Debug, Serialize)]
pub struct AudioMetadata {
    pub audio_url: String,
    pub filename: String,
    pub file_size: i64,
}

/// `GET /v1/tts/audio/{paper_id}`. Returns the most recently generated TTS
/// artifact for the paper, regardless of voice model — a paper rarely has
/// more than one, and the feed only ever asks for the narration, not a
/// specific voice.
pub async fn audio_metadata(
    State(state): State<AppState>,
    AxumPath(paper_id): AxumPath<Uuid>,
) -> Result<Json<AudioMetadata>> {
    let row: Option<(String, i64)> = sqlx::query_as(
        "SELECT file_path, file_size FROM paper_tts WHERE paper_id = $1 ORDER BY generated_at DESC LIMIT 1",
    )
    .bind(paper_id)
    .fetch_optional(&state.pool)
    .await?;

    let (filename, file_size) =
        row.ok_or_else(|| AppError::Integrity(format!("no tts artifact for paper {paper_id}")))?;

    Ok(Json(AudioMetadata { audio_url: format!("/v1/tts/file/{filename}"), filename, file_size }))
}

const ALLOWED_EXTENSIONS: [(&str, &str); 3] =
    [("opus", "audio/opus"), ("mp3", "audio/mpeg"), ("wav", "audio/wav")];

/// `GET /v1/tts/file/{filename}`. `filename` is trusted only as a bare file
/// name (no path separators) inside `config.tts_directory`; anything else
/// is rejected before it ever reaches the filesystem.
pub async fn stream_file(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> Result<Response> {
    let (bytes, content_type) = read_tts_file(&state.settings.tts_directory, &filename).await?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], Body::from(bytes)).into_response())
}

/// Validate `filename` and read it from `base_dir`, split out of
/// `stream_file` so the validation/IO logic is testable without an axum
/// request.
async fn read_tts_file(base_dir: &str, filename: &str) -> Result<(Vec<u8>, &'static str)> {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(AppError::Validation("invalid filename".into()));
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| AppError::Validation("filename has no extension".into()))?;

    let content_type = ALLOWED_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| AppError::Validation(format!("unsupported audio extension '{extension}'")))?;

    let path = PathBuf::from(base_dir).join(filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::Integrity(format!("no tts file named {filename}")))?;

    Ok((bytes, content_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_extensions_cover_the_expected_set() {
        let exts: Vec<&str> = ALLOWED_EXTENSIONS.iter().map(|(e, _)| *e).collect();
        assert_eq!(exts, ["opus", "mp3", "wav"]);
    }

    #[tokio::test]
    async fn reads_an_allowed_file_from_the_base_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("narration.opus");
        tokio::fs::write(&path, b"fake opus bytes").await.expect("write fixture");

        let (bytes, content_type) =
            read_tts_file(dir.path().to_str().expect("utf8 path"), "narration.opus").await.expect("read");
        assert_eq!(bytes, b"fake opus bytes");
        assert_eq!(content_type, "audio/opus");
    }

    #[tokio::test]
    async fn rejects_traversal_before_touching_the_filesystem() {
        let dir = tempfile::tempdir().expect("tempdir");
        for bad in ["../escape.opus", "a/b.opus", "..\\x.opus"] {
            let err = read_tts_file(dir.path().to_str().expect("utf8 path"), bad).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "expected '{bad}' to be rejected");
        }
    }

    #[tokio::test]
    async fn rejects_unsupported_extensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_tts_file(dir.path().to_str().expect("utf8 path"), "clip.m4a").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_integrity_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_tts_file(dir.path().to_str().expect("utf8 path"), "ghost.wav").await.unwrap_err();
        assert!(matches!(err, AppError::Integrity(_)));
    }
}
