//! Migration file discovery and parsing

use crate::migration::MigrationError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Width of a migration version.
pub const VERSION_LEN: usize = 16;

/// Represents a discovered migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Path to the migration file
    pub path: PathBuf,

    /// Migration version, 16 digits
    pub version: String,

    /// Human-readable migration name
    pub name: String,
}

impl MigrationFile {
    /// Parse a migration file name into version and name
    ///
    /// Expected format: `{16 digits}-{name}.{ext}`. Returns `None` for
    /// anything else.
    ///
    /// # Example
    /// - `2016030700000000-create-posts.js` → version: `2016030700000000`, name: `create-posts`
    pub fn parse_filename(filename: &str) -> Result<Option<(String, String)>, MigrationError> {
        let re = Regex::new(r"^(\d{16})-(.+)\.[A-Za-z0-9]+$")
            .map_err(|e| MigrationError::InvalidFormat(format!("Invalid regex: {}", e)))?;

        Ok(re.captures(filename).and_then(|caps| {
            let version = caps.get(1)?.as_str().to_string();
            let name = caps.get(2)?.as_str().to_string();
            Some((version, name))
        }))
    }
}

/// Discover all migration files in a directory
///
/// Files that do not follow the `{version}-{name}.{ext}` pattern are
/// skipped. The result is sorted by version, oldest first.
///
/// # Errors
///
/// Returns `MigrationError::FileNotFound` if the directory does not exist or
/// cannot be read, and `MigrationError::InvalidFormat` if the path is not a
/// directory.
pub fn discover_migrations(migrations_dir: &Path) -> Result<Vec<MigrationFile>, MigrationError> {
    if !migrations_dir.exists() {
        return Err(MigrationError::FileNotFound(
            migrations_dir.to_string_lossy().to_string(),
        ));
    }

    if !migrations_dir.is_dir() {
        return Err(MigrationError::InvalidFormat(format!(
            "Path is not a directory: {}",
            migrations_dir.display()
        )));
    }

    let entries = fs::read_dir(migrations_dir).map_err(|e| {
        MigrationError::FileNotFound(format!(
            "Failed to read migrations directory {}: {}",
            migrations_dir.display(),
            e
        ))
    })?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            MigrationError::FileNotFound(format!("Failed to read directory entry: {}", e))
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        match MigrationFile::parse_filename(filename)? {
            Some((version, name)) => migrations.push(MigrationFile {
                path: path.clone(),
                version,
                name,
            }),
            None => log::debug!("Skipping {}, not a migration file", path.display()),
        }
    }

    migrations.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.name.cmp(&b.name)));

    Ok(migrations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filename() {
        assert_eq!(
            MigrationFile::parse_filename("2016030700000000-create-posts.js").unwrap(),
            Some(("2016030700000000".to_string(), "create-posts".to_string()))
        );
        assert_eq!(MigrationFile::parse_filename("README.md").unwrap(), None);
        assert_eq!(MigrationFile::parse_filename("201603-short.js").unwrap(), None);
        assert_eq!(MigrationFile::parse_filename("2016030700000000-no-extension").unwrap(), None);
    }

    #[test]
    fn test_discover_sorts_by_version_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "2016030900000000-c.sql",
            "2016030700000000-a.sql",
            ".gitkeep",
            "2016030800000000-b.sql",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("2016031000000000-dir.d")).unwrap();

        let found = discover_migrations(dir.path()).unwrap();
        let versions: Vec<&str> = found.iter().map(|m| m.version.as_str()).collect();
        assert_eq!(versions, vec!["2016030700000000", "2016030800000000", "2016030900000000"]);
        assert_eq!(found[0].name, "a");
    }

    #[test]
    fn test_missing_directory_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("db/migrate");
        assert!(matches!(
            discover_migrations(&missing),
            Err(MigrationError::FileNotFound(_))
        ));
    }
}
