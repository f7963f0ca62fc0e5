use std::io::Write;
use std::path::Path;

/// Write `bytes` to `path` atomically: write to a sibling temp file, fsync
/// it, then rename into place. If the rename crosses a filesystem
/// boundary, fall back to copy-then-rename-then-unlink on the destination
/// side, matching `original_source/download_queue_manager.py::safe_move`'s
/// `EXDEV` handling.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let tmp_path = parent.join(format!(
        ".{}.{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("item"),
        uuid::Uuid::new_v4().simple()
    ));

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match std::fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => cross_device_finish(&tmp_path, path),
        Err(err) => {
            let _ = std::fs::remove_file(&tmp_path);
            Err(err)
        }
    }
}

/// `EXDEV` ("Invalid cross-device link") on Linux; `rename(2)` returns this,
/// and only this, when source and destination live on different mounts.
#[cfg(target_os = "linux")]
const EXDEV: i32 = 18;
#[cfg(all(unix, not(target_os = "linux")))]
const EXDEV: i32 = 18; // also 18 on the BSDs and macOS.

#[cfg(unix)]
fn is_cross_device(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(EXDEV)
}

#[cfg(not(unix))]
fn is_cross_device(_err: &std::io::Error) -> bool {
    false
}

fn cross_device_finish(tmp_path: &Path, dst: &Path) -> std::io::Result<()> {
    let copy_id = uuid::Uuid::new_v4().simple();
    let dst_tmp = dst.with_extension(format!(
        "{}.tmp",
        copy_id
    ));
    std::fs::copy(tmp_path, &dst_tmp)?;
    std::fs::rename(&dst_tmp, dst)?;
    std::fs::remove_file(tmp_path)?;
    Ok(())
}

/// Move an existing file from `src` to `dst`, atomically when both paths
/// share a filesystem, falling back to copy-then-rename-then-unlink when
/// they don't. Used by the download stage to move the downloaded media
/// file (and its sidecar) from a temp staging area into the final output
/// directory; grounded directly on `safe_move` in
/// `original_source/download_queue_manager.py`.
pub fn safe_move(src: &Path, dst: &Path) -> std::io::Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => {
            let copy_id = uuid::Uuid::new_v4().simple();
            let dst_tmp = dst.with_extension(format!("{copy_id}.tmp"));
            std::fs::copy(src, &dst_tmp)?;
            std::fs::rename(&dst_tmp, dst)?;
            std::fs::remove_file(src)?;
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_move_relocates_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("source.mkv");
        let dst = dir.path().join("out").join("dest.mkv");
        std::fs::write(&src, b"video bytes").unwrap();
        safe_move(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"video bytes");
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("file.json");
        atomic_write(&path, b"hello").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn no_partial_file_visible_on_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        // No stray temp files left behind.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
