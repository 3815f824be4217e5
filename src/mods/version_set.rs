use tracing::debug;

use crate::mods::ModsSettings;
use crate::mods::remote_repo::{EntryKind, ListError, RemoteModsRepo};
use crate::mods::version::ModsVersion;

/// All versions that have a directory under the mods root, newest first.
///
/// Entries that are not directories or whose name is not a valid version are ignored. Listing
///  failures are passed on unchanged: the root path is fixed, so a failure here means the
///  deployment is misconfigured or upstream is unavailable.
pub async fn list_versions<R: RemoteModsRepo + ?Sized>(repo: &R, settings: &ModsSettings) -> Result<Vec<ModsVersion>, ListError> {
    let entries = repo.list_directory(&settings.root_path)
        .await?;

    let mut versions = entries.iter()
        .filter(|entry| entry.kind == EntryKind::Directory)
        .filter_map(|entry| ModsVersion::parse(&entry.name).ok())
        .collect::<Vec<_>>();

    // "1.21" and "1.21.0" compare equal; the raw string decides between them so the output
    //  does not depend on upstream order
    versions.sort_by(|a, b| b.cmp(a).then_with(|| b.as_str().cmp(a.as_str())));

    debug!("{} versions out of {} entries", versions.len(), entries.len());
    Ok(versions)
}

#[cfg(test)]
mod test {
    use hyper::StatusCode;

    use super::*;
    use crate::mods::remote_repo::DirectoryEntry;
    use crate::mods::transient_repo::{mem_file, TransientModsRepo};

    fn names(versions: &[ModsVersion]) -> Vec<&str> {
        versions.iter()
            .map(|v| v.as_str())
            .collect()
    }

    fn repo_with_root(entries: Vec<DirectoryEntry>) -> TransientModsRepo {
        TransientModsRepo::new()
            .with_directory("mods/version", entries)
    }

    #[tokio::test]
    async fn test_sorted_descending() {
        let repo = repo_with_root(vec![
            DirectoryEntry::directory("1.20"),
            DirectoryEntry::directory("1.21.8"),
            DirectoryEntry::directory("1.9"),
            DirectoryEntry::directory("abc"),
            DirectoryEntry::directory("1.21.10"),
        ]);

        let versions = list_versions(&repo, &ModsSettings::default()).await.unwrap();
        assert_eq!(names(&versions), vec!["1.21.10", "1.21.8", "1.20", "1.9"]);
    }

    #[tokio::test]
    async fn test_only_version_directories() {
        let repo = repo_with_root(vec![
            mem_file("1.21"),
            DirectoryEntry::directory("1.21.1-pre2"),
            DirectoryEntry::directory("README"),
            DirectoryEntry {
                kind: EntryKind::Other,
                ..DirectoryEntry::directory("1.19")
            },
            DirectoryEntry::directory("1.20.1"),
        ]);

        let versions = list_versions(&repo, &ModsSettings::default()).await.unwrap();
        assert_eq!(names(&versions), vec!["1.20.1"]);
    }

    #[tokio::test]
    async fn test_equal_tuples_are_ordered_deterministically() {
        let forward = repo_with_root(vec![DirectoryEntry::directory("1.21"), DirectoryEntry::directory("1.21.0")]);
        let backward = repo_with_root(vec![DirectoryEntry::directory("1.21.0"), DirectoryEntry::directory("1.21")]);

        let settings = ModsSettings::default();
        let forward = list_versions(&forward, &settings).await.unwrap();
        let backward = list_versions(&backward, &settings).await.unwrap();
        assert_eq!(names(&forward), names(&backward));
    }

    #[tokio::test]
    async fn test_empty_root() {
        let repo = repo_with_root(vec![]);
        assert!(list_versions(&repo, &ModsSettings::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_idempotent() {
        let repo = repo_with_root(vec![
            DirectoryEntry::directory("1.9"),
            DirectoryEntry::directory("1.21.8"),
            DirectoryEntry::directory("1.20"),
        ]);
        let settings = ModsSettings::default();

        let first = list_versions(&repo, &settings).await.unwrap();
        let second = list_versions(&repo, &settings).await.unwrap();
        assert_eq!(names(&first), names(&second));
        assert_eq!(repo.requests(), vec!["mods/version", "mods/version"]);
    }

    #[tokio::test]
    async fn test_failures_propagate() {
        let missing = TransientModsRepo::new();
        assert!(matches!(
            list_versions(&missing, &ModsSettings::default()).await,
            Err(ListError::NotFound(path)) if path == "mods/version"
        ));

        let failing = TransientModsRepo::new()
            .with_listing_failure("mods/version", StatusCode::FORBIDDEN);
        assert!(matches!(
            list_versions(&failing, &ModsSettings::default()).await,
            Err(ListError::UpstreamFailure(StatusCode::FORBIDDEN))
        ));
    }
}
