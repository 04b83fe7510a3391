use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory {}", path.display()))
}

/// Writes a rendered document into `out_dir`, creating the directory if
/// needed. An existing file with the same name is overwritten; backups are
/// the caller's concern (see `backup_existing`).
pub fn write_document(filename: &str, content: &str, out_dir: &Path) -> Result<PathBuf> {
    ensure_dir(out_dir)?;
    let path = out_dir.join(filename);
    fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Derives a timestamped sibling path for backing up `original`.
pub fn backup_path(original: &Path) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let name = format!("{stem}_backup_{timestamp}{suffix}");
    original.with_file_name(name)
}

/// Copies `path` aside before it gets overwritten. Returns the backup path,
/// or `None` if there was nothing to back up.
pub fn backup_existing(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = backup_path(path);
    fs::copy(path, &backup)
        .with_context(|| format!("failed to back up {}", path.display()))?;
    Ok(Some(backup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_document_creates_directory_and_returns_path() {
        let tmp = tempfile::tempdir().unwrap();
        let out_dir = tmp.path().join("rules");
        let path = write_document("a.md", "hello", &out_dir).unwrap();
        assert_eq!(path, out_dir.join("a.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn write_document_overwrites_silently() {
        let tmp = tempfile::tempdir().unwrap();
        write_document("a.md", "first", tmp.path()).unwrap();
        let path = write_document("a.md", "second", tmp.path()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn backup_path_keeps_extension() {
        let backup = backup_path(Path::new("/out/security_rule.md"));
        let name = backup.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("security_rule_backup_"));
        assert!(name.ends_with(".md"));
    }

    #[test]
    fn backup_existing_copies_previous_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "original").unwrap();
        let backup = backup_existing(&path).unwrap().unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), "original");
    }

    #[test]
    fn backup_existing_is_none_for_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(backup_existing(&tmp.path().join("a.md")).unwrap().is_none());
    }
}
