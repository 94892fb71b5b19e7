/**
 * Archive Extraction
 *
 * Unpacks downloaded archives in place. `.tar.gz` goes through flate2 + tar,
 * `.zip` through the zip crate. Entries that would land outside the
 * destination directory are skipped.
 */

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use zip::ZipArchive;

use super::resource::ResourceKind;
use crate::error::{DataError, Result};

/// Extraction progress information
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ExtractProgress {
    /// Entries written so far
    pub entries: u64,
    /// Total entries, when the archive format knows it up front (0 otherwise)
    pub total: u64,
}

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

fn archive_error(path: &Path, reason: impl ToString) -> DataError {
    DataError::Archive {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Extract a `.tar.gz` archive into `dest`, returning the number of entries written
pub fn extract_tar_gz<F>(archive_path: &Path, dest: &Path, progress: Option<F>) -> Result<u64>
where
    F: Fn(ExtractProgress),
{
    tracing::info!("[Extract] unpacking {:?} -> {:?}", archive_path, dest);
    std::fs::create_dir_all(dest).map_err(|e| DataError::io(dest, e))?;

    let file = File::open(archive_path).map_err(|e| DataError::io(archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let mut entries: u64 = 0;
    let mut last_report = Instant::now();
    for entry in archive.entries().map_err(|e| archive_error(archive_path, e))? {
        let mut entry = entry.map_err(|e| archive_error(archive_path, e))?;
        let unpacked = entry.unpack_in(dest).map_err(|e| archive_error(archive_path, e))?;
        if !unpacked {
            let name = entry.path().map(|p| p.display().to_string()).unwrap_or_default();
            tracing::warn!("[Extract] skipped entry outside destination: {}", name);
            continue;
        }
        entries += 1;

        if last_report.elapsed() >= PROGRESS_INTERVAL {
            last_report = Instant::now();
            if let Some(ref callback) = progress {
                callback(ExtractProgress { entries, total: 0 });
            }
        }
    }

    if let Some(ref callback) = progress {
        callback(ExtractProgress { entries, total: entries });
    }
    tracing::info!("[Extract] unpacked {} entries into {:?}", entries, dest);
    Ok(entries)
}

/// Extract a `.zip` archive into `dest`, returning the number of entries written
pub fn extract_zip<F>(archive_path: &Path, dest: &Path, progress: Option<F>) -> Result<u64>
where
    F: Fn(ExtractProgress),
{
    tracing::info!("[Extract] unpacking {:?} -> {:?}", archive_path, dest);
    std::fs::create_dir_all(dest).map_err(|e| DataError::io(dest, e))?;

    let file = File::open(archive_path).map_err(|e| DataError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| archive_error(archive_path, e))?;
    let total = archive.len() as u64;

    let mut entries: u64 = 0;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| archive_error(archive_path, e))?;

        let outpath: PathBuf = match file.enclosed_name() {
            Some(path) => dest.join(path),
            None => {
                tracing::warn!("[Extract] skipped entry outside destination: {}", file.name());
                continue;
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| DataError::io(&outpath, e))?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
            }
            let mut outfile = File::create(&outpath).map_err(|e| DataError::io(&outpath, e))?;
            std::io::copy(&mut file, &mut outfile).map_err(|e| DataError::io(&outpath, e))?;
        }
        entries += 1;

        if let Some(ref callback) = progress {
            callback(ExtractProgress { entries, total });
        }
    }

    tracing::info!("[Extract] unpacked {} entries into {:?}", entries, dest);
    Ok(entries)
}

/// Extract an archive according to its kind. Plain files are left alone.
pub fn extract_archive<F>(
    kind: ResourceKind,
    archive_path: &Path,
    dest: &Path,
    progress: Option<F>,
) -> Result<u64>
where
    F: Fn(ExtractProgress),
{
    match kind {
        ResourceKind::TarGz => extract_tar_gz(archive_path, dest, progress),
        ResourceKind::Zip => extract_zip(archive_path, dest, progress),
        ResourceKind::File => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::cell::Cell;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_tar_gz_in_place() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("lra_release.gz");
        write_tar_gz(
            &archive,
            &[
                ("lra_release/listops-1000/basic_test.tsv", b"Source\tTarget\n( 1 )\t1\n"),
                ("lra_release/README", b"hello"),
            ],
        );

        let seen = Cell::new(0u64);
        let on_progress = |p: ExtractProgress| seen.set(p.entries);
        let n = extract_tar_gz(&archive, tmp.path(), Some(on_progress)).unwrap();

        assert_eq!(n, 2);
        assert_eq!(seen.get(), 2);
        let body = tmp.path().join("lra_release/listops-1000/basic_test.tsv");
        let body = std::fs::read_to_string(body).unwrap();
        assert!(body.starts_with("Source\tTarget"));
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("broken.gz");
        std::fs::write(&archive, b"definitely not gzip").unwrap();

        let out = tmp.path().join("out");
        let err = extract_tar_gz(&archive, &out, None::<fn(ExtractProgress)>).unwrap_err();
        assert!(matches!(err, DataError::Archive { .. }));
    }

    #[test]
    fn test_extract_zip() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("pack.zip");
        {
            let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
            let options = zip::write::FileOptions::default();
            writer.add_directory("pack/", options).unwrap();
            writer.start_file("pack/data.tsv", options).unwrap();
            writer.write_all(b"a\tb\n").unwrap();
            writer.finish().unwrap();
        }

        let no_progress = None::<fn(ExtractProgress)>;
        let n = extract_archive(ResourceKind::Zip, &archive, tmp.path(), no_progress).unwrap();
        assert_eq!(n, 2);
        assert_eq!(std::fs::read(tmp.path().join("pack/data.tsv")).unwrap(), b"a\tb\n");
    }
}
