use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::fingerprints::content_hash;

/// Hash of the file currently on disk, re-read every time. `None` when absent
/// or unreadable.
pub async fn local_hash(path: &Path) -> Option<String> {
    tokio::fs::read(path)
        .await
        .ok()
        .map(|bytes| content_hash(&bytes))
}

/// Writes through a sibling `.partial` file and renames it into place, so an
/// interrupted write never leaves a truncated mirror file.
pub async fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let partial = partial_path(target);
    let result: io::Result<()> = async {
        let mut file = tokio::fs::File::create(&partial).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&partial, target).await
    }
    .await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_path_keeps_original_extension() {
        assert_eq!(
            partial_path(Path::new("/m/css/site.css")),
            PathBuf::from("/m/css/site.css.partial")
        );
        assert_eq!(
            partial_path(Path::new("/m/LICENSE")),
            PathBuf::from("/m/LICENSE.partial")
        );
    }

    #[tokio::test]
    async fn writes_file_and_creates_parents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/deeper/page.html");

        write_atomic(&target, b"<html></html>").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"<html></html>");
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn overwrites_existing_content() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a.js");
        std::fs::write(&target, b"old old old").unwrap();

        write_atomic(&target, b"new").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn local_hash_reflects_disk_content() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("x.txt");
        assert_eq!(local_hash(&target).await, None);

        std::fs::write(&target, b"hello").unwrap();
        assert_eq!(
            local_hash(&target).await.as_deref(),
            Some("5d41402abc4b2a76b9719d911017c592")
        );
    }
}
