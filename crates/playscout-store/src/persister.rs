//! JSON array output with write-then-replace semantics.

use crate::error::{Result, StoreError};
use playscout_core::{CatalogItem, SeedQuery};
use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes collected items as a JSON array of objects keyed by `id`.
///
/// The document is written to a temporary file next to the destination and
/// renamed over it, so a failed write never leaves a truncated file behind.
#[derive(Debug, Clone, Default)]
pub struct Persister {
    limit: Option<usize>,
}

impl Persister {
    /// Persister that writes every item it is given.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write at most `limit` items.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Default destination for a run seeded by `seed`: `<dir>/<label>_details.json`.
    #[must_use]
    pub fn default_path(dir: &Path, seed: &SeedQuery) -> PathBuf {
        dir.join(format!("{}_details.json", seed.file_stem()))
    }

    /// Whether a previous run already wrote `destination`.
    #[must_use]
    pub fn output_exists(destination: &Path) -> bool {
        destination.is_file()
    }

    /// Serialize `items` in order to `destination`, creating parent directories.
    ///
    /// Returns the number of items written.
    pub fn save(&self, items: &[CatalogItem], destination: &Path) -> Result<usize> {
        let count = self.limit.map_or(items.len(), |limit| limit.min(items.len()));
        let items = &items[..count];

        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let json = serde_json::to_vec_pretty(items)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(&json)
            .and_then(|()| match output_permissions(destination) {
                Some(permissions) => tmp.as_file().set_permissions(permissions),
                None => Ok(()),
            })
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(destination)
            .map_err(|e| StoreError::io(destination, e.error))?;

        tracing::info!(path = %destination.display(), items = count, "Saved collected items");
        Ok(count)
    }

    /// Read a previously saved document.
    pub fn load(path: &Path) -> Result<Vec<CatalogItem>> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Permissions for a replaced output: the existing file's, or world-readable
/// for a new one. Temporary files start out owner-only.
fn output_permissions(destination: &Path) -> Option<Permissions> {
    if let Ok(metadata) = std::fs::metadata(destination) {
        return Some(metadata.permissions());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playscout_core::{AppId, Timestamp};
    use tempfile::TempDir;

    fn items(ids: &[&str]) -> Vec<CatalogItem> {
        ids.iter()
            .map(|id| CatalogItem::new(AppId::new(*id).expect("valid id")).with_title(*id))
            .collect()
    }

    #[test]
    fn test_default_path_uses_sanitized_label() {
        let seed = SeedQuery {
            term: "loan app".to_string(),
            label: Some("Finance & Credit/Loans".to_string()),
        };
        let path = Persister::default_path(Path::new("scraped_app_data"), &seed);
        assert_eq!(
            path,
            PathBuf::from("scraped_app_data/Finance_and_Credit_Loans_details.json")
        );
    }

    #[test]
    fn test_save_creates_directories_and_keeps_order() {
        let temp = TempDir::new().expect("temp dir");
        let destination = temp.path().join("nested/deeper/out.json");

        let written = Persister::new()
            .save(&items(&["c.3", "a.1", "b.2"]), &destination)
            .expect("save");

        assert_eq!(written, 3);
        assert!(Persister::output_exists(&destination));
        let loaded = Persister::load(&destination).expect("load");
        let ids: Vec<&str> = loaded.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c.3", "a.1", "b.2"]);
    }

    #[test]
    fn test_save_truncates_to_limit() {
        let temp = TempDir::new().expect("temp dir");
        let destination = temp.path().join("out.json");

        let written = Persister::new()
            .with_limit(2)
            .save(&items(&["a.1", "a.2", "a.3"]), &destination)
            .expect("save");

        assert_eq!(written, 2);
        assert_eq!(Persister::load(&destination).expect("load").len(), 2);
    }

    #[test]
    fn test_save_replaces_existing_output() {
        let temp = TempDir::new().expect("temp dir");
        let destination = temp.path().join("out.json");
        std::fs::write(&destination, "stale").expect("seed file");

        Persister::new()
            .save(&items(&["a.1"]), &destination)
            .expect("save");

        assert_eq!(Persister::load(&destination).expect("load").len(), 1);
        let leftovers = std::fs::read_dir(temp.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_unenriched_items_keep_search_fields_only() {
        let temp = TempDir::new().expect("temp dir");
        let destination = temp.path().join("out.json");
        let mut enriched = CatalogItem::new(AppId::new("a.full").expect("id"));
        enriched.installs = Some("5,000+".to_string());
        enriched.fetched_at = Timestamp::from_rfc3339("2024-05-01T12:00:00Z").ok();
        let stub = CatalogItem::new(AppId::new("a.stub").expect("id")).with_source_term("loan");

        Persister::new()
            .save(&[enriched, stub], &destination)
            .expect("save");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&destination).expect("read"))
                .expect("json");
        let array = raw.as_array().expect("array of objects");
        assert_eq!(array[0]["id"], "a.full");
        assert_eq!(array[0]["fetched_at"], "2024-05-01T12:00:00Z");
        assert_eq!(
            array[1],
            serde_json::json!({"id": "a.stub", "source_term": "loan"})
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_output_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("temp dir");
        let fresh = temp.path().join("fresh.json");
        Persister::new().save(&items(&["a.1"]), &fresh).expect("save");
        let mode = std::fs::metadata(&fresh).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o644);

        let existing = temp.path().join("existing.json");
        std::fs::write(&existing, "[]").expect("seed file");
        std::fs::set_permissions(&existing, Permissions::from_mode(0o640)).expect("chmod");
        Persister::new().save(&items(&["a.1"]), &existing).expect("save");
        let mode = std::fs::metadata(&existing).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_write_error_leaves_destination_untouched() {
        let temp = TempDir::new().expect("temp dir");
        let blocker = temp.path().join("not_a_dir");
        std::fs::write(&blocker, "file").expect("write blocker");

        let result = Persister::new().save(&items(&["a.1"]), &blocker.join("out.json"));

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(std::fs::read_to_string(&blocker).expect("read"), "file");
    }
}
