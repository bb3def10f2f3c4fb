use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

use crate::{logi, logw};

const REQUIRED_DIRS: &[&str] = &["audio", "out"];

pub fn audio_dir(work_dir: &Path) -> PathBuf {
    work_dir.join("audio")
}

pub fn out_dir(work_dir: &Path) -> PathBuf {
    work_dir.join("out")
}

pub async fn ensure_directories(work_dir: &Path) -> Result<()> {
    for dir in REQUIRED_DIRS {
        let path = work_dir.join(dir);
        if !path.exists() {
            fs::create_dir_all(&path).await?;
            logi(format!("Created directory: {}", path.display()));
        }
    }
    Ok(())
}

/// Removes everything under `dir` but keeps the directory itself, so stale
/// page clips from an earlier render cannot be picked up.
pub async fn clear_directory_contents(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(dir).min_depth(1).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        let removed = if entry.file_type().is_dir() {
            fs::remove_dir(path).await
        } else {
            fs::remove_file(path).await
        };
        if let Err(err) = removed {
            logw(format!("Could not remove {}: {}", path.display(), err));
        }
    }

    Ok(())
}

fn render_artifact_regex() -> Result<&'static Regex> {
    static ARTIFACT_RE: OnceCell<Regex> = OnceCell::new();
    ARTIFACT_RE.get_or_try_init(|| {
        Regex::new(r"^(page_\d{2,}(\.wav|_padded\.m4a)|narration_list\.txt)$")
            .context("failed to compile render artifact regex")
    })
}

/// Removes only the clips, padded clips and concat list a render writes into
/// `dir`. Anything else in the directory is left alone.
pub async fn remove_render_artifacts(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let re = render_artifact_regex()?;
    let mut removed = 0usize;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let is_artifact = entry.file_type().is_file()
            && entry.file_name().to_str().is_some_and(|name| re.is_match(name));
        if !is_artifact {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(err) => logw(format!("Could not remove {}: {}", entry.path().display(), err)),
        }
    }

    Ok(removed)
}

pub async fn check_ffmpeg() -> bool {
    tool_responds("ffmpeg").await && tool_responds("ffprobe").await
}

async fn tool_responds(program: &str) -> bool {
    match tokio::process::Command::new(program)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_and_clears_work_dirs() {
        let root = tempfile::tempdir().unwrap();
        ensure_directories(root.path()).await.unwrap();

        let audio = audio_dir(root.path());
        assert!(audio.is_dir());
        assert!(out_dir(root.path()).is_dir());

        std::fs::create_dir_all(audio.join("nested")).unwrap();
        std::fs::write(audio.join("page_01.wav"), b"x").unwrap();
        std::fs::write(audio.join("nested/old.wav"), b"x").unwrap();

        clear_directory_contents(&audio).await.unwrap();
        assert!(audio.is_dir());
        assert_eq!(std::fs::read_dir(&audio).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn artifact_cleanup_spares_other_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path();
        std::fs::create_dir_all(dir.join("album")).unwrap();
        for name in [
            "page_01.wav",
            "page_12_padded.m4a",
            "narration_list.txt",
            "page_1.wav",
            "song.flac",
            "album/page_02.wav",
        ] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }

        assert_eq!(remove_render_artifacts(dir).await.unwrap(), 3);

        assert!(!dir.join("page_01.wav").exists());
        assert!(!dir.join("page_12_padded.m4a").exists());
        assert!(!dir.join("narration_list.txt").exists());
        assert!(dir.join("page_1.wav").exists());
        assert!(dir.join("song.flac").exists());
        assert!(dir.join("album/page_02.wav").exists());
    }
}
