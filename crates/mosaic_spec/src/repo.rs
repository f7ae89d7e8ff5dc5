//! Versioned on-disk tile repo.
//!
//! Repo layout is one directory per tile, one subdirectory per version,
//! holding the manifest:
//!
//! ```text
//! <repo>/network/0.1.0/tile.yaml
//! <repo>/eks-spot/0.5.0/tile.yaml
//! ```

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{SpecError, SpecResult};
use crate::models::TileManifest;
use crate::reader::SpecReader;

/// File name of a tile manifest inside its version directory.
pub const TILE_MANIFEST_FILE: &str = "tile.yaml";

/// A version string of the `major.minor.patch[suffix]` shape the
/// catalog uses (suffixes mark compatibility-tagged rebuilds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub suffix: String,
    raw: String,
}

impl TileVersion {
    pub fn parse(raw: &str) -> SpecResult<Self> {
        let pattern = Regex::new(r"^(\d+)\.(\d+)\.(\d+)([0-9A-Za-z-]*)$")
            .map_err(|_| SpecError::InvalidVersion(raw.to_string()))?;
        let caps = pattern
            .captures(raw)
            .ok_or_else(|| SpecError::InvalidVersion(raw.to_string()))?;

        // The pattern guarantees numeric captures; oversized components
        // are still rejected.
        let component = |idx: usize| -> SpecResult<u32> {
            caps[idx]
                .parse()
                .map_err(|_| SpecError::InvalidVersion(raw.to_string()))
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            suffix: caps[4].to_string(),
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialOrd for TileVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TileVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

impl std::fmt::Display for TileVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// One discovered tile version in the repo.
#[derive(Debug, Clone)]
pub struct TileRecord {
    pub manifest: TileManifest,
    pub version: TileVersion,
    pub path: PathBuf,
}

/// A local tile repo: discovery, listing, and lookup.
pub struct TileRepo {
    root: PathBuf,
}

impl TileRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open a repo, failing when the directory is missing.
    pub fn open(root: impl Into<PathBuf>) -> SpecResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SpecError::RepoNotFound(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a tile version directory.
    pub fn tile_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    /// Discover every readable tile manifest in the repo.
    ///
    /// Unreadable or malformed manifests are skipped with a warning so
    /// one broken tile does not hide the rest of the catalog.
    pub fn discover(&self) -> SpecResult<Vec<TileRecord>> {
        let mut records = Vec::new();

        if !self.root.exists() {
            warn!("Tile repo does not exist: {:?}", self.root);
            return Ok(records);
        }

        for entry in WalkDir::new(&self.root)
            .min_depth(3)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_manifest =
                path.file_name().and_then(|f| f.to_str()) == Some(TILE_MANIFEST_FILE);
            if !path.is_file() || !is_manifest {
                continue;
            }

            match Self::load_record(path) {
                Ok(record) => {
                    debug!(
                        tile = record.manifest.name(),
                        version = record.version.as_str(),
                        "discovered tile"
                    );
                    records.push(record);
                }
                Err(e) => warn!("Skipping tile manifest {:?}: {}", path, e),
            }
        }

        records.sort_by(|a, b| {
            a.manifest
                .name()
                .cmp(b.manifest.name())
                .then_with(|| a.version.cmp(&b.version))
        });

        info!("Discovered {} tile versions in {:?}", records.len(), self.root);
        Ok(records)
    }

    /// Look up a tile by name and exact version.
    pub fn lookup(&self, name: &str, version: &str) -> SpecResult<TileRecord> {
        let manifest_path = self.tile_dir(name, version).join(TILE_MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(SpecError::TileNotFound {
                name: name.to_string(),
                version: version.to_string(),
            });
        }
        Self::load_record(&manifest_path)
    }

    /// Look up the newest version of a tile.
    pub fn lookup_latest(&self, name: &str) -> SpecResult<TileRecord> {
        self.discover()?
            .into_iter()
            .filter(|r| r.manifest.name() == name)
            .max_by(|a, b| a.version.cmp(&b.version))
            .ok_or_else(|| SpecError::TileNotFound {
                name: name.to_string(),
                version: "latest".to_string(),
            })
    }

    fn load_record(path: &Path) -> SpecResult<TileRecord> {
        let manifest = SpecReader::read_tile(path)?;
        let version = TileVersion::parse(manifest.version())?;
        Ok(TileRecord {
            manifest,
            version,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Metadata, TileSpecBody};
    use crate::writer::SpecWriter;
    use std::fs;

    fn seed_tile(root: &Path, name: &str, version: &str) {
        let dir = root.join(name).join(version);
        fs::create_dir_all(&dir).unwrap();
        let manifest = TileManifest::new(
            Metadata::new(name, version).with_category(Category::Network),
            TileSpecBody::default(),
        );
        SpecWriter::write_tile(dir.join(TILE_MANIFEST_FILE), &manifest).unwrap();
    }

    #[test]
    fn test_version_ordering() {
        let a = TileVersion::parse("0.0.5").unwrap();
        let b = TileVersion::parse("0.1.0").unwrap();
        let c = TileVersion::parse("5.0.6x").unwrap();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(c.suffix, "x");
        assert!(TileVersion::parse("latest").is_err());
    }

    #[test]
    fn test_discover_and_lookup() {
        let temp = tempfile::tempdir().unwrap();
        seed_tile(temp.path(), "network", "0.0.1");
        seed_tile(temp.path(), "network", "0.1.0");
        seed_tile(temp.path(), "efs", "0.1.0");

        let repo = TileRepo::open(temp.path()).unwrap();
        let records = repo.discover().unwrap();
        assert_eq!(records.len(), 3);

        let latest = repo.lookup_latest("network").unwrap();
        assert_eq!(latest.version.as_str(), "0.1.0");

        assert!(repo.lookup("network", "9.9.9").is_err());
    }

    #[test]
    fn test_broken_manifest_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        seed_tile(temp.path(), "network", "0.1.0");
        let broken = temp.path().join("broken").join("0.1.0");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(TILE_MANIFEST_FILE), "kind: [").unwrap();

        let repo = TileRepo::new(temp.path());
        let records = repo.discover().unwrap();
        assert_eq!(records.len(), 1);
    }
}
