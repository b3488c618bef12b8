use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use crate::errors::DownloadError;

/// Extensions we trust from a url path. Anything else (or no extension
/// at all) is saved as jpg.
const VALID_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// One persisted asset. The file's existence is the durability record;
/// there is no separate index.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadRecord {
    pub content_hash: String,
    pub extension: String,
    pub file_path: PathBuf,
}

/// Result of persisting one body: the record plus whether an identical
/// file was already on disk.
#[derive(Debug)]
pub struct SaveOutcome {
    pub record: DownloadRecord,
    pub already_existed: bool,
}

/// Hash of the exact bytes received. Stable dedup key, not a security
/// boundary.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Infer the file extension from the url path, defaulting to jpg when
/// the path has none or an unrecognized one.
pub fn infer_extension(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url.to_string(),
    };

    let ext = path
        .rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    if VALID_EXTENSIONS.contains(&ext.as_str()) {
        ext
    } else {
        "jpg".to_string()
    }
}

pub fn ensure_dir(dir: &Path) -> Result<(), DownloadError> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Persist one downloaded body under `<hash>.<ext>`.
///
/// If a file with that name already exists it is left alone and the
/// call still counts as success: same hash means same bytes. The
/// extension is not part of the hash key, so identical bytes fetched
/// from urls with different extensions land in two files; that matches
/// the sibling scripts this replaces and is covered by a test.
///
/// The exists-check followed by the write is not atomic. Two processes
/// writing the same hash concurrently both succeed and the second write
/// is harmless because the content is identical.
pub fn save_bytes(dir: &Path, url: &str, bytes: &[u8]) -> Result<SaveOutcome, DownloadError> {
    ensure_dir(dir)?;

    let hash = content_hash(bytes);
    let extension = infer_extension(url);
    let file_name = format!("{hash}.{extension}");
    let file_path = dir.join(&file_name);

    let record = DownloadRecord {
        content_hash: hash,
        extension,
        file_path: file_path.clone(),
    };

    if file_path.exists() {
        log::info!("already saved, skipping: {file_name}");
        return Ok(SaveOutcome {
            record,
            already_existed: true,
        });
    }

    let part_path = dir.join(format!("{file_name}.part"));
    {
        let mut file = fs::File::create(&part_path)?;
        for chunk in bytes.chunks(1024) {
            file.write_all(chunk)?;
        }
    }
    fs::rename(&part_path, &file_path)?;

    log::info!("saved {file_name}");

    Ok(SaveOutcome {
        record,
        already_existed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_extension_from_path() {
        assert_eq!(infer_extension("https://example.com/a/b/photo.PNG"), "png");
        assert_eq!(infer_extension("https://example.com/photo.webp?w=1920"), "webp");
    }

    #[test]
    fn test_infer_extension_defaults_to_jpg() {
        assert_eq!(infer_extension("https://example.com/no-extension"), "jpg");
        assert_eq!(infer_extension("https://example.com/archive.tar.xz"), "jpg");
        assert_eq!(infer_extension("https://example.com/"), "jpg");
    }

    #[test]
    fn test_hash_is_function_of_bytes_only() {
        let a = content_hash(b"same body");
        let b = content_hash(b"same body");
        let c = content_hash(b"different body");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("nested").join("dir");

        let outcome = save_bytes(&dest, "https://example.com/a.jpg", b"body").unwrap();
        assert!(!outcome.already_existed);
        assert!(outcome.record.file_path.exists());
        assert!(dest.is_dir());
    }

    #[test]
    fn test_second_save_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();

        let first = save_bytes(tmp.path(), "https://example.com/a.jpg", b"body").unwrap();
        let second = save_bytes(tmp.path(), "https://example.com/a.jpg", b"body").unwrap();

        assert!(!first.already_existed);
        assert!(second.already_existed);
        assert_eq!(first.record, second.record);

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_same_bytes_different_extension_are_distinct_files() {
        // The extension is not folded into the hash key. Documented
        // seam: one body, two urls, two files.
        let tmp = tempfile::tempdir().unwrap();

        let a = save_bytes(tmp.path(), "https://example.com/x.jpg", b"body").unwrap();
        let b = save_bytes(tmp.path(), "https://example.com/x.png", b"body").unwrap();

        assert_eq!(a.record.content_hash, b.record.content_hash);
        assert_ne!(a.record.file_path, b.record.file_path);
        assert!(!b.already_existed);
    }

    #[test]
    fn test_no_part_file_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        save_bytes(tmp.path(), "https://example.com/a.gif", b"gif bytes").unwrap();

        let leftover = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().ends_with(".part"));
        assert!(!leftover);
    }
}
