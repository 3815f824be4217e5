pub mod archive;
pub mod remote_repo;
pub mod version;
pub mod version_set;

#[cfg(test)]
pub mod transient_repo;

use crate::mods::remote_repo::{DirectoryEntry, EntryKind};
use crate::mods::version::ModsVersion;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ChecksumHandling {
    /// compare fetched member bytes against the git blob id upstream reports, if any
    VerifyIfPresent,
    Ignore,
}

/// Where mods live in the upstream repository and which files count as archive members.
#[derive(Debug, Clone)]
pub struct ModsSettings {
    /// repository-relative directory holding one subdirectory per version, no leading or
    ///  trailing '/'
    pub root_path: String,
    /// including the leading '.', e.g. ".jar"
    pub member_extension: String,
    pub checksum_handling: ChecksumHandling,
}
impl ModsSettings {
    pub fn version_path(&self, version: &ModsVersion) -> String {
        format!("{}/{}", self.root_path, version.as_str())
    }

    pub fn is_member(&self, entry: &DirectoryEntry) -> bool {
        entry.kind == EntryKind::File && entry.name.ends_with(&self.member_extension)
    }
}
impl Default for ModsSettings {
    fn default() -> Self {
        ModsSettings {
            root_path: "mods/version".to_string(),
            member_extension: ".jar".to_string(),
            checksum_handling: ChecksumHandling::VerifyIfPresent,
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[rstest]
    #[case::jar(DirectoryEntry::file("sodium.jar", "mem://sodium.jar"), true)]
    #[case::readme(DirectoryEntry::file("readme.txt", "mem://readme.txt"), false)]
    #[case::upper_case_extension(DirectoryEntry::file("SODIUM.JAR", "mem://SODIUM.JAR"), false)]
    #[case::extension_only_inside_name(DirectoryEntry::file("sodium.jar.disabled", "mem://x"), false)]
    #[case::directory_named_like_jar(DirectoryEntry::directory("weird.jar"), false)]
    fn test_is_member(#[case] entry: DirectoryEntry, #[case] expected: bool) {
        assert_eq!(ModsSettings::default().is_member(&entry), expected);
    }

    #[test]
    fn test_version_path() {
        let version = ModsVersion::parse("1.21.8").unwrap();
        assert_eq!(ModsSettings::default().version_path(&version), "mods/version/1.21.8");
    }
}
