use anyhow::{Result, Context, anyhow};
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: Directory listing and artifact files

/// Extension of the per-image text artifacts
pub const ARTIFACT_EXTENSION: &str = "txt";

/// Suffix of an artifact that is still being written
const STAGING_SUFFIX: &str = ".part";

// @struct: File system helpers shared by both phases
pub struct FileManager;

impl FileManager {
    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(dir: P) -> bool {
        dir.as_ref().is_dir()
    }

    // @creates: Directory and its parents when missing
    pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }
        Ok(())
    }

    // @generates: `<artifact_dir>/<image stem>.txt`
    pub fn artifact_path<P1: AsRef<Path>, P2: AsRef<Path>>(image: P1, artifact_dir: P2) -> PathBuf {
        let stem = image.as_ref().file_stem().unwrap_or_default();
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(ARTIFACT_EXTENSION);
        artifact_dir.as_ref().join(name)
    }

    /// List the files directly inside `dir` whose extension is one of
    /// `extensions` (case-insensitive), sorted lexicographically by filename.
    ///
    /// Fails if the directory itself cannot be listed. Entries that cannot be
    /// read (dangling symlinks, permission errors) are skipped with a warning.
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(anyhow!("Not a directory: {:?}", dir));
        }

        let mut matches = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(e).with_context(|| format!("Failed to list directory {:?}", dir));
                }
                Err(e) => {
                    warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let allowed = entry.path().extension().is_some_and(|ext| {
                let ext = ext.to_string_lossy();
                extensions
                    .iter()
                    .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
            });
            if allowed {
                matches.push(entry.into_path());
            }
        }

        matches.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(matches)
    }

    /// Path an artifact is staged at before it is renamed into place
    pub fn staging_path<P: AsRef<Path>>(artifact: P) -> PathBuf {
        let artifact = artifact.as_ref();
        let mut name = artifact.file_name().unwrap_or_default().to_os_string();
        name.push(STAGING_SUFFIX);
        artifact.with_file_name(name)
    }

    /// Write `content` to `artifact` through a staging file, so a reader never
    /// sees a half-written artifact.
    pub async fn write_atomically<P: AsRef<Path>>(artifact: P, content: &[u8]) -> std::io::Result<()> {
        let artifact = artifact.as_ref();
        let staging = Self::staging_path(artifact);

        tokio::fs::write(&staging, content).await?;
        if let Err(e) = tokio::fs::rename(&staging, artifact).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }
        Ok(())
    }
}
