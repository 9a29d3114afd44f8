//! Filesystem helpers shared by the task executors and the status store.

use anyhow::{anyhow, Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::translation::ContentMap;

/// Writes through a sibling temp file and a rename, so readers see either
/// the old or the new contents.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let tmp = temp_sibling(path);
    fs::write(&tmp, contents).await?;

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

/// `<dir>/<language>/version-<n>.json`
pub fn version_path(content_dir: &Path, language: &str, version: u32) -> PathBuf {
    content_dir
        .join(language)
        .join(format!("version-{}.json", version))
}

pub async fn read_content_map(path: &Path) -> Result<ContentMap> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    match serde_json::from_str::<serde_json::Value>(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?
    {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(anyhow!("{} does not hold a JSON object", path.display())),
    }
}

pub async fn write_content_map(path: &Path, content: &ContentMap) -> Result<()> {
    let mut body = serde_json::to_vec_pretty(content)?;
    body.push(b'\n');
    write_atomic(path, &body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_atomic_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/file.txt");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(fs::read_to_string(&path).await.unwrap(), "second");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_content_map_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = version_path(dir.path(), "de", 2);
        assert!(path.ends_with("de/version-2.json"));

        let content = match json!({"title": "Hallo", "body": "Welt"}) {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        };
        write_content_map(&path, &content).await.unwrap();
        assert_eq!(read_content_map(&path).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_non_object_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.json");
        fs::write(&path, "[1, 2]").await.unwrap();
        assert!(read_content_map(&path).await.is_err());
    }
}
