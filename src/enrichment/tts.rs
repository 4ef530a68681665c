//! TTS sub-pipeline: markdown cleanup, jittered synthesis calls, ffmpeg
//! transcode, content-hash dedup, atomic writes, and orphan cleanup, all
//! run through a bounded worker pool fed by a semaphore.

use std::path::{Path, PathBuf};
use std::time::Duration;

use md5::{Digest, Md5};
use rand::Rng;
use regex::Regex;
use sqlx::PgPool;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::PaperTts;
use crate::provider_pool::ProviderPool;

/// Strip Markdown syntax so the text reads naturally when narrated.
pub fn clean_markdown_for_tts(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let mut text = text.to_string();

    if let Some(unpacked) = unpack_bilingual_json(&text) {
        text = unpacked;
    }

    let replacements: [(&str, &str); 9] = [
        (r"```[^`]*```", ""),
        (r"`([^`]+)`", "$1"),
        (r"\*\*([^*]+)\*\*", "$1"),
        (r"\*([^*]+)\*", "$1"),
        (r"#{1,6}\s*", ""),
        (r"\[([^\]]+)\]\([^)]+\)", "$1"),
        (r"(?m)^\s*[-*+]\s+", ""),
        (r"(?m)^\s*\d+\.\s+", ""),
        (r"\n{3,}", "\n\n"),
    ];

    for (pattern, replacement) in replacements {
        if let Ok(re) = Regex::new(pattern) {
            text = re.replace_all(&text, replacement).to_string();
        }
    }

    text.trim().to_string()
}

/// If `text` is a fenced ```json array of `{"zh": "..."}` objects, unpack
/// it into the joined Chinese segments. Falls through unchanged on any
/// parse failure.
fn unpack_bilingual_json(text: &str) -> Option<String> {
    if !text.trim_start().starts_with("```json") {
        return None;
    }
    let re = Regex::new(r"(?s)```json\s*(\[.*?\])\s*```").ok()?;
    let captures = re.captures(text)?;
    let json_str = captures.get(1)?.as_str();
    let items: Vec<serde_json::Value> = serde_json::from_str(json_str).ok()?;
    let parts: Vec<String> = items
        .into_iter()
        .filter_map(|item| item.get("zh").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Build the narration string from a paper's English title, Chinese
/// translated title, and AI interpretation.
pub fn build_narration(title_en: &str, title_zh: &str, interpretation: &str) -> String {
    let clean_interpretation = clean_markdown_for_tts(interpretation);
    format!("论文标题：{title_zh}\n\n英文标题：{title_en}\n\nAI解读：{clean_interpretation}")
        .trim()
        .to_string()
}

pub fn content_hash(narration: &str) -> String {
    let digest = Md5::digest(narration.as_bytes());
    format!("{digest:x}")
}

/// Generate (or reuse) a TTS artifact for one `(paper_id, voice_model)`
/// pair. Returns the existing row if a matching content hash already has a
/// file on disk; otherwise synthesizes, transcodes, writes atomically, and
/// persists a new row.
pub async fn generate_or_reuse(
    pool: &PgPool,
    providers: &ProviderPool,
    settings: &Settings,
    paper_id: Uuid,
    voice_model: &str,
    narration: &str,
) -> Result<PaperTts> {
    let hash = content_hash(narration);

    if let Some(existing) = find_reusable(pool, paper_id, voice_model, &hash, &settings.tts_directory).await? {
        return Ok(existing);
    }

    let semaphore = providers.semaphore();
    let _permit = semaphore.acquire().await.map_err(|e| AppError::Fatal(e.to_string()))?;

    let jitter_ms = rand::thread_rng().gen_range(500..=1000);
    tokio::time::sleep(Duration::from_millis(jitter_ms)).await;

    let raw_audio = providers.tts().synthesize(narration, voice_model).await?;
    let (bytes, extension) = transcode_to_opus(&raw_audio).await;

    let filename = format!("{}.{extension}", Uuid::new_v4());
    let base_dir = PathBuf::from(&settings.tts_directory);
    tokio::fs::create_dir_all(&base_dir).await?;
    write_atomic(&base_dir.join(&filename), &bytes).await?;

    let row: PaperTts = sqlx::query_as(
        r#"INSERT INTO paper_tts (id, paper_id, voice_model, content_hash, file_path, file_size, generated_at)
           VALUES ($1, $2, $3, $4, $5, $6, now())
           ON CONFLICT (paper_id, voice_model, content_hash) DO UPDATE SET file_path = EXCLUDED.file_path
           RETURNING id, paper_id, voice_model, content_hash, file_path, file_size, generated_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(paper_id)
    .bind(voice_model)
    .bind(&hash)
    .bind(&filename)
    .bind(bytes.len() as i64)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

async fn find_reusable(
    pool: &PgPool,
    paper_id: Uuid,
    voice_model: &str,
    content_hash: &str,
    base_dir: &str,
) -> Result<Option<PaperTts>> {
    let existing: Option<PaperTts> = sqlx::query_as(
        r#"SELECT id, paper_id, voice_model, content_hash, file_path, file_size, generated_at
           FROM paper_tts WHERE paper_id = $1 AND voice_model = $2 AND content_hash = $3"#,
    )
    .bind(paper_id)
    .bind(voice_model)
    .bind(content_hash)
    .fetch_optional(pool)
    .await?;

    let Some(row) = existing else { return Ok(None) };

    let path = Path::new(base_dir).join(&row.file_path);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        Ok(Some(row))
    } else {
        sqlx::query("DELETE FROM paper_tts WHERE id = $1").bind(row.id).execute(pool).await?;
        Ok(None)
    }
}

/// Transcode to Opus via an out-of-process `ffmpeg` invocation. Falls back
/// to the raw bytes (as `.wav`) if `ffmpeg` is missing or fails
/// step 3's "keep raw bytes and log" contract.
async fn transcode_to_opus(raw_audio: &[u8]) -> (Vec<u8>, &'static str) {
    match try_transcode(raw_audio).await {
        Ok(opus) => (opus, "opus"),
        Err(e) => {
            tracing::warn!(error = %e, "ffmpeg transcode failed, keeping raw audio");
            (raw_audio.to_vec(), "wav")
        }
    }
}

async fn try_transcode(raw_audio: &[u8]) -> Result<Vec<u8>> {
    use tokio::process::Command;

    let mut child = Command::new("ffmpeg")
        .args([
            "-y", "-i", "pipe:0", "-c:a", "libopus", "-b:a", "32k", "-vbr", "on", "-ar", "24000",
            "-f", "opus", "pipe:1",
        ])
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()?;

    let mut stdin = child.stdin.take().ok_or_else(|| AppError::Fatal("ffmpeg stdin unavailable".into()))?;
    let input = raw_audio.to_vec();
    let write_task = tokio::spawn(async move {
        let _ = stdin.write_all(&input).await;
    });

    let output = child.wait_with_output().await?;
    let _ = write_task.await;

    if !output.status.success() {
        return Err(AppError::Transient("ffmpeg exited with failure status".into()));
    }
    Ok(output.stdout)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_syntax() {
        let input = "# Title\n\n**bold** and *italic* and `code` and [link](http://x)";
        let cleaned = clean_markdown_for_tts(input);
        assert!(!cleaned.contains('#'));
        assert!(!cleaned.contains('*'));
        assert!(!cleaned.contains('`'));
        assert!(cleaned.contains("bold"));
        assert!(cleaned.contains("link"));
    }

    #[test]
    fn unpacks_bilingual_json_blocks() {
        let input = "```json\n[{\"zh\": \"第一段\"}, {\"zh\": \"第二段\"}]\n```";
        let cleaned = clean_markdown_for_tts(input);
        assert_eq!(cleaned, "第一段\n\n第二段");
    }

    #[test]
    fn content_hash_is_stable_for_identical_text() {
        let a = content_hash("hello world");
        let b = content_hash("hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_for_different_text() {
        assert_ne!(content_hash("a"), content_hash("b"));
    }

    #[test]
    fn build_narration_includes_all_three_parts() {
        let n = build_narration("English Title", "中文标题", "**解读内容**");
        assert!(n.contains("English Title"));
        assert!(n.contains("中文标题"));
        assert!(n.contains("解读内容"));
        assert!(!n.contains('*'));
    }
}
