//! Resolves which file(s) a catalog step ingests.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::data::CatalogKind;
use crate::error::ImportError;

/// Which broadcast file set to load from the default directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum BroadcastVariant {
    #[default]
    Default,
    Ldap,
}

impl BroadcastVariant {
    /// Filename prefix that selects the variant's file.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Ldap => "ldap",
        }
    }
}

/// Result of a lookup: files to ingest, in order, and backup files left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Located {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Editor backup and swap files (`name~`, `#name#`) are never ingested.
pub fn is_backup_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with('~') || name.ends_with('#'))
        .unwrap_or(false)
}

/// An explicit path is used verbatim. Otherwise `dir` is scanned: every file for tags, roles
/// and permission profiles, only the first file whose name starts with the variant prefix for
/// broadcasts.
pub fn locate(
    kind: CatalogKind,
    explicit: Option<&Path>,
    dir: &Path,
    variant: BroadcastVariant,
) -> Result<Located, ImportError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ImportError::NotFound(path.to_path_buf()));
        }
        return Ok(Located {
            files: vec![path.to_path_buf()],
            skipped: Vec::new(),
        });
    }

    if !dir.is_dir() {
        return Err(ImportError::NoInputAvailable { kind });
    }

    let mut candidates = Vec::new();
    let entries = fs::read_dir(dir).map_err(|source| ImportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ImportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    let (skipped, usable): (Vec<PathBuf>, Vec<PathBuf>) =
        candidates.into_iter().partition(|path| is_backup_file(path));

    let files: Vec<PathBuf> = match kind {
        CatalogKind::Broadcast => usable
            .into_iter()
            .find(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(|stem| stem.starts_with(variant.prefix()))
                    .unwrap_or(false)
            })
            .into_iter()
            .collect(),
        _ => usable,
    };

    if files.is_empty() {
        return Err(ImportError::NoInputAvailable { kind });
    }
    Ok(Located { files, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::unique_temp_dir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "").expect("fixture");
        path
    }

    #[test]
    fn explicit_path_is_used_verbatim() {
        let dir = unique_temp_dir("locate-explicit");
        let file = touch(&dir, "anything.txt~");
        let located = locate(CatalogKind::Role, Some(&file), &dir, BroadcastVariant::Default)
            .expect("explicit file");
        assert_eq!(located.files, vec![file]);
    }

    #[test]
    fn explicit_missing_path_is_not_found() {
        let dir = unique_temp_dir("locate-missing");
        let missing = dir.join("nope.csv");
        assert!(matches!(
            locate(CatalogKind::Tag, Some(&missing), &dir, BroadcastVariant::Default),
            Err(ImportError::NotFound(_))
        ));
    }

    #[test]
    fn directory_scan_skips_backups_and_sorts() {
        let dir = unique_temp_dir("locate-scan");
        let b = touch(&dir, "b_tags.csv");
        let a = touch(&dir, "a_tags.csv");
        let backup = touch(&dir, "a_tags.csv~");
        let swap = touch(&dir, "#c_tags.csv#");

        let located = locate(CatalogKind::Tag, None, &dir, BroadcastVariant::Default)
            .expect("scan");
        assert_eq!(located.files, vec![a, b]);
        assert_eq!(located.skipped.len(), 2);
        assert!(located.skipped.contains(&backup));
        assert!(located.skipped.contains(&swap));
    }

    #[test]
    fn broadcast_picks_first_file_matching_variant() {
        let dir = unique_temp_dir("locate-broadcast");
        touch(&dir, "default_broadcasts.csv");
        let ldap = touch(&dir, "ldap_broadcasts.csv");
        touch(&dir, "ldap_broadcasts_old.csv");

        let located = locate(CatalogKind::Broadcast, None, &dir, BroadcastVariant::Ldap)
            .expect("variant file");
        assert_eq!(located.files, vec![ldap]);
    }

    #[test]
    fn broadcast_without_matching_variant_has_no_input() {
        let dir = unique_temp_dir("locate-broadcast-none");
        touch(&dir, "default_broadcasts.csv");
        assert!(matches!(
            locate(CatalogKind::Broadcast, None, &dir, BroadcastVariant::Ldap),
            Err(ImportError::NoInputAvailable {
                kind: CatalogKind::Broadcast
            })
        ));
    }

    #[test]
    fn missing_or_empty_directory_has_no_input() {
        let dir = unique_temp_dir("locate-empty");
        assert!(matches!(
            locate(CatalogKind::Role, None, &dir, BroadcastVariant::Default),
            Err(ImportError::NoInputAvailable { .. })
        ));
        assert!(matches!(
            locate(CatalogKind::Role, None, &dir.join("absent"), BroadcastVariant::Default),
            Err(ImportError::NoInputAvailable { .. })
        ));
    }
}
