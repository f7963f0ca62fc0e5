//! Renames a downloaded file to encode its resolution bucket and
//! three-letter language code, per spec §4.5.

mod resolution;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub use resolution::round_up_resolution;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Deserialize, Default)]
struct Sidecar {
    width: Option<u32>,
    height: Option<u32>,
    language: Option<String>,
    description: Option<String>,
    title: Option<String>,
}

/// Renames `filepath` (and its sibling `.info.json`) to
/// `<stem>.WEB-DL.<W>x<H>.<lang3>-cfwai<ext>`. If the sidecar is missing
/// or undecodable, logs a warning and returns `filepath` unchanged — this
/// is the documented failure mode for spec §7's "Tagging failure" row,
/// not an error.
pub fn tag(filepath: &Path) -> Result<PathBuf, TagError> {
    let file_name = filepath.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if file_name.contains(".WEB-DL.") && file_name.contains("-cfwai") {
        // Already tagged: the sidecar was moved alongside it on the first
        // pass, so re-running against the tagged path is a no-op.
        return Ok(filepath.to_path_buf());
    }

    let sidecar_path = filepath.with_extension("info.json");

    let sidecar = match std::fs::read_to_string(&sidecar_path) {
        Ok(contents) => match serde_json::from_str::<Sidecar>(&contents) {
            Ok(sidecar) => sidecar,
            Err(err) => {
                tracing::warn!(?sidecar_path, %err, "failed to decode sidecar JSON; skipping retag");
                return Ok(filepath.to_path_buf());
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(?sidecar_path, "sidecar missing; skipping retag");
            return Ok(filepath.to_path_buf());
        }
        Err(err) => return Err(TagError::Io(err)),
    };

    let (width, height) = round_up_resolution(sidecar.width.unwrap_or(0), sidecar.height.unwrap_or(0));
    let lang3 = resolve_language(&sidecar);

    let suffix = format!(".WEB-DL.{width}x{height}.{lang3}-cfwai");
    let stem = filepath.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let ext = filepath.extension().and_then(|s| s.to_str()).unwrap_or_default();
    let new_name = if ext.is_empty() {
        format!("{stem}{suffix}")
    } else {
        format!("{stem}{suffix}.{ext}")
    };
    let new_path = filepath.with_file_name(new_name);
    let new_sidecar_path = new_path.with_extension("info.json");

    cfwai_store::safe_move(filepath, &new_path)?;
    cfwai_store::safe_move(&sidecar_path, &new_sidecar_path)?;

    tracing::info!(from = %filepath.display(), to = %new_path.display(), "file retagged");

    Ok(new_path)
}

fn resolve_language(sidecar: &Sidecar) -> String {
    if let Some(code) = sidecar.language.as_deref().filter(|c| !c.is_empty()) {
        return isolang::Language::from_639_1(code)
            .map(|lang| lang.to_639_3().to_string())
            .unwrap_or_else(|| "unk".to_string());
    }

    let classify_text = sidecar
        .description
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(sidecar.title.as_deref());

    classify_text
        .and_then(whatlang::detect)
        .map(|info| info.lang().code().to_string())
        .unwrap_or_else(|| "unk".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sidecar(path: &Path, json: &str) {
        std::fs::write(path, json).unwrap();
    }

    #[test]
    fn tags_file_with_resolution_bucket_and_language() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("episode.mkv");
        std::fs::write(&media, b"video").unwrap();
        write_sidecar(&media.with_extension("info.json"), r#"{"width":1280,"height":720,"language":"en"}"#);

        let tagged = tag(&media).unwrap();
        let name = tagged.file_name().unwrap().to_str().unwrap();
        assert!(name.contains(".WEB-DL.1280x720.eng-cfwai.mkv"), "got {name}");
        assert!(!media.exists());
        assert!(tagged.with_extension("info.json").exists());
    }

    #[test]
    fn missing_sidecar_returns_original_path_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("episode.mkv");
        std::fs::write(&media, b"video").unwrap();

        let result = tag(&media).unwrap();
        assert_eq!(result, media);
        assert!(media.exists());
    }

    #[test]
    fn tagging_twice_is_a_no_op_on_the_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("episode.mkv");
        std::fs::write(&media, b"video").unwrap();
        write_sidecar(&media.with_extension("info.json"), r#"{"width":1920,"height":1080,"language":"en"}"#);

        let first = tag(&media).unwrap();
        let second = tag(&first).unwrap();
        assert_eq!(first, second);
    }
}
