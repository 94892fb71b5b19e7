/**
 * Resource Manager
 *
 * Describes the remote resources that make up the LRA data directory and
 * answers questions about their on-disk state (available, size, stale paths).
 */

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::paths;

/// Default LRA release archive
pub const LRA_RELEASE_URL: &str = "https://storage.googleapis.com/long-range-arena/lra_release.gz";

/// How a downloaded resource is turned into files on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Gzipped tarball, extracted in place then removed
    TarGz,
    /// ZIP archive, extracted in place then removed
    Zip,
    /// Plain file kept as downloaded
    File,
}

impl ResourceKind {
    pub fn is_archive(&self) -> bool {
        !matches!(self, Self::File)
    }
}

/// A single remote resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub url: String,
    pub kind: ResourceKind,
    /// Name of the downloaded file inside the data directory
    pub file_name: String,
    /// Path (relative to the data directory) whose presence marks the
    /// resource as complete. Archives default to the file stem.
    #[serde(default)]
    pub check_path: Option<String>,
    /// Hex-encoded SHA-256 of the downloaded file
    #[serde(default)]
    pub sha256: Option<String>,
}

impl Resource {
    /// The LRA release tarball
    pub fn lra_release() -> Self {
        Self {
            name: "lra_release".to_string(),
            url: LRA_RELEASE_URL.to_string(),
            kind: ResourceKind::TarGz,
            file_name: "lra_release.gz".to_string(),
            check_path: Some("lra_release".to_string()),
            sha256: None,
        }
    }

    /// A plain file fetched next to the extracted archive
    pub fn auxiliary(name: &str, url: &str) -> Self {
        let file_name = file_name_from_url(url).unwrap_or_else(|| format!("{}.tsv", name));
        Self {
            name: name.to_string(),
            url: url.to_string(),
            kind: ResourceKind::File,
            file_name,
            check_path: None,
            sha256: None,
        }
    }

    /// URL actually requested (GitHub blob pages are rewritten to raw content)
    pub fn download_url(&self) -> String {
        github_raw_url(&self.url).unwrap_or_else(|| self.url.clone())
    }

    /// Where the downloaded bytes land
    pub fn artifact_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.file_name)
    }

    /// The path checked for completeness
    pub fn check_target(&self, data_dir: &Path) -> PathBuf {
        match (&self.check_path, self.kind) {
            (Some(check), _) => data_dir.join(check),
            (None, ResourceKind::File) => self.artifact_path(data_dir),
            (None, _) => data_dir.join(archive_stem(&self.file_name)),
        }
    }

    /// Paths left behind by an earlier fetch of this resource
    pub fn stale_paths(&self, data_dir: &Path) -> Vec<PathBuf> {
        let artifact = self.artifact_path(data_dir);
        let mut stale = vec![partial_path(&artifact), artifact.clone()];
        let check = self.check_target(data_dir);
        if check != artifact {
            stale.push(check);
        }
        stale
    }
}

/// `<dest>.part`, the file a download streams into before being renamed
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Strip archive extensions from a file name
fn archive_stem(file_name: &str) -> &str {
    [".tar.gz", ".tgz", ".gz", ".zip"]
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name)
}

fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next()?;
    let last = without_query.rsplit('/').next()?;
    if last.is_empty() || without_query.ends_with("://") {
        None
    } else {
        Some(last.to_string())
    }
}

fn github_blob_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://github\.com/([^/]+)/([^/]+)/blob/([^?#]+)")
            .expect("GitHub blob pattern is a valid regex")
    })
}

/// Rewrite `https://github.com/<owner>/<repo>/blob/<ref>/<path>` to the raw file URL.
///
/// Blob URLs serve an HTML page, not the file itself.
pub fn github_raw_url(url: &str) -> Option<String> {
    let caps = github_blob_regex().captures(url)?;
    Some(format!(
        "https://raw.githubusercontent.com/{}/{}/{}",
        &caps[1], &caps[2], &caps[3]
    ))
}

/// Check if a resource is available (downloaded and complete)
pub fn is_resource_available(data_dir: &Path, resource: &Resource) -> bool {
    resource.check_target(data_dir).exists()
}

/// Get the size of a resource on disk in bytes
pub fn resource_size(data_dir: &Path, resource: &Resource) -> u64 {
    paths::dir_size(&resource.check_target(data_dir))
}

/// Delete everything a resource put on disk
pub fn delete_resource(data_dir: &Path, resource: &Resource) -> Result<()> {
    for path in resource.stale_paths(data_dir) {
        if paths::remove_path(&path)? {
            tracing::info!("[ResourceManager] removed {:?}", path);
        }
    }
    Ok(())
}
