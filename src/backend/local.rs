use std::{
    fs::{self, File},
    io::{self, BufWriter, Read as _, Seek as _, SeekFrom, Write},
    path::{Path, PathBuf},
};

use md5::{Digest as _, Md5};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use walkdir::WalkDir;

use super::{ObjectClient, ObjectWriter, checked_range};
use crate::{
    api,
    error::{Error, Result},
    types::{ByteStream, GetObjectOutput, Item, ItemKind, PutObjectOutput},
    util,
};

/// A file or directory tree on the local filesystem.
#[derive(Clone, Debug)]
pub struct LocalObject {
    path: PathBuf,
}

impl LocalObject {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.to_string_lossy().trim().is_empty() {
            return Err(Error::invalid_config("local path must not be empty"));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> Result<fs::Metadata> {
        fs::metadata(&self.path).map_err(|e| fs_error(&self.path, "stat", e))
    }

    fn open_file(&self) -> Result<(File, u64)> {
        let meta = self.metadata()?;
        if meta.is_dir() {
            return Err(Error::IsDirectory {
                path: self.path.display().to_string(),
            });
        }
        let file = File::open(&self.path).map_err(|e| fs_error(&self.path, "open", e))?;
        Ok((file, meta.len()))
    }
}

impl ObjectClient for LocalObject {
    fn put(&self, md5_hex: &str, size: i64) -> Result<Box<dyn ObjectWriter>> {
        let expected_len = u64::try_from(size).map_err(|_| {
            Error::invalid_config(format!("content length must not be negative, got {size}"))
        })?;
        let expected_md5 = util::md5::parse_md5_hex(md5_hex)?;

        if self.path.is_dir() {
            return Err(Error::IsDirectory {
                path: self.path.display().to_string(),
            });
        }
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(parent).map_err(|e| fs_error(parent, "create", e))?;
        // Staged next to the target so the final rename stays on one filesystem.
        let staged = NamedTempFile::new_in(parent).map_err(|e| fs_error(parent, "create", e))?;

        Ok(Box::new(LocalWriter {
            path: self.path.clone(),
            file: BufWriter::new(staged),
            hasher: Md5::new(),
            written: 0,
            expected_len,
            expected_md5,
        }))
    }

    fn get(&self) -> Result<GetObjectOutput> {
        let (file, len) = self.open_file()?;
        Ok(GetObjectOutput {
            body: ByteStream::new(file),
            etag: None,
            content_length: Some(len),
            content_type: None,
        })
    }

    fn get_range(&self, offset: i64, length: i64) -> Result<GetObjectOutput> {
        let (start, len) = checked_range(offset, length)?;
        let (mut file, size) = self.open_file()?;

        let in_bounds = start <= size && start.checked_add(len).is_some_and(|end| end <= size);
        if !in_bounds {
            return Err(Error::InvalidRange { offset, length });
        }

        file.seek(SeekFrom::Start(start))
            .map_err(|e| fs_error(&self.path, "seek", e))?;
        Ok(GetObjectOutput {
            body: ByteStream::new(file.take(len)),
            etag: None,
            content_length: Some(len),
            content_type: None,
        })
    }

    fn stat(&self) -> Result<Item> {
        let meta = self.metadata()?;
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        Ok(item(name, &meta))
    }

    fn list(&self) -> Box<dyn Iterator<Item = Result<Item>> + Send> {
        Box::new(LocalList {
            walker: WalkDir::new(&self.path).follow_links(false).into_iter(),
            done: false,
        })
    }

    fn make_bucket(&self, acl: &str) -> Result<()> {
        api::validate_acl(acl)?;
        fs::create_dir_all(&self.path).map_err(|e| fs_error(&self.path, "create", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;

            fs::set_permissions(&self.path, fs::Permissions::from_mode(acl_mode(acl)))
                .map_err(|e| fs_error(&self.path, "chmod", e))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn acl_mode(acl: &str) -> u32 {
    match acl {
        "public-read" => 0o500,
        "public-read-write" => 0o777,
        _ => 0o700,
    }
}

fn item(name: String, meta: &fs::Metadata) -> Item {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        ItemKind::Symlink
    } else if file_type.is_dir() {
        ItemKind::Directory
    } else {
        ItemKind::File
    };

    Item {
        name,
        size: meta.len(),
        modified: meta.modified().ok().map(OffsetDateTime::from),
        kind,
    }
}

fn fs_error(path: &Path, op: &str, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        return Error::NotFound {
            path: path.display().to_string(),
        };
    }
    Error::io(format!("failed to {op} {}", path.display()), err)
}

/// Lazy directory walk. Entries we may not read are skipped; any other
/// failure is reported once and ends the walk.
struct LocalList {
    walker: walkdir::IntoIter,
    done: bool,
}

impl Iterator for LocalList {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let err = match self.walker.next()? {
                Ok(entry) => match entry.metadata() {
                    Ok(meta) => return Some(Ok(item(entry.path().display().to_string(), &meta))),
                    Err(err) => err,
                },
                Err(err) => err,
            };

            if err.io_error().map(io::Error::kind) == Some(io::ErrorKind::PermissionDenied) {
                continue;
            }

            self.done = true;
            let path = err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            return Some(Err(fs_error(&path, "walk", io::Error::from(err))));
        }
    }
}

/// Writes into a staged temp file that only replaces the target once the
/// length and digest check out. Dropping it discards the staged bytes.
struct LocalWriter {
    path: PathBuf,
    file: BufWriter<NamedTempFile>,
    hasher: Md5,
    written: u64,
    expected_len: u64,
    expected_md5: Option<[u8; 16]>,
}

impl Write for LocalWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl ObjectWriter for LocalWriter {
    fn close(self: Box<Self>) -> Result<PutObjectOutput> {
        let LocalWriter {
            path,
            file,
            hasher,
            written,
            expected_len,
            expected_md5,
        } = *self;

        let staged = file
            .into_inner()
            .map_err(|e| fs_error(&path, "flush", e.into_error()))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|e| fs_error(&path, "sync", e))?;

        if written != expected_len {
            return Err(rejected(
                &path,
                format!("wrote {written} bytes, expected {expected_len}"),
            ));
        }

        let mut digest = [0u8; 16];
        digest.copy_from_slice(&hasher.finalize());
        if expected_md5.is_some_and(|expected| expected != digest) {
            return Err(rejected(&path, "content md5 mismatch".to_string()));
        }

        staged
            .persist(&path)
            .map_err(|e| fs_error(&path, "rename", e.error))?;

        Ok(PutObjectOutput {
            etag: Some(hex::encode(digest)),
        })
    }
}

fn rejected(path: &Path, reason: String) -> Error {
    Error::io(
        format!("{} not stored", path.display()),
        io::Error::new(io::ErrorKind::InvalidData, reason),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_path() {
        assert!(LocalObject::new("").is_err());
        assert!(LocalObject::new("  ").is_err());
    }

    #[test]
    fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let obj = LocalObject::new(dir.path().join("nope")).unwrap();

        assert!(matches!(obj.stat(), Err(Error::NotFound { .. })));
        assert!(matches!(obj.get(), Err(Error::NotFound { .. })));
    }

    #[test]
    fn range_must_fit_inside_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, b"0123456789").unwrap();
        let obj = LocalObject::new(&path).unwrap();

        let out = obj.get_range(2, 3).unwrap();
        assert_eq!(out.bytes().unwrap().as_ref(), b"234");
        assert_eq!(obj.get_range(0, 10).unwrap().bytes().unwrap().len(), 10);

        for (offset, length) in [(11, 0), (8, 3), (-1, 1), (0, -2)] {
            assert!(
                matches!(obj.get_range(offset, length), Err(Error::InvalidRange { .. })),
                "{offset}/{length}"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn acl_maps_to_permissions() {
        assert_eq!(acl_mode(""), 0o700);
        assert_eq!(acl_mode("private"), 0o700);
        assert_eq!(acl_mode("public-read"), 0o500);
        assert_eq!(acl_mode("public-read-write"), 0o777);
    }

    #[test]
    fn close_checks_length_and_digest() {
        let dir = tempfile::tempdir().unwrap();
        let obj = LocalObject::new(dir.path().join("out.txt")).unwrap();

        let mut short = obj.put("", 10).unwrap();
        short.write_all(b"abc").unwrap();
        let err = short.close().unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Local);

        let mut wrong = obj.put("d41d8cd98f00b204e9800998ecf8427e", 5).unwrap();
        wrong.write_all(b"hello").unwrap();
        assert!(matches!(wrong.close(), Err(Error::Io { .. })));
        assert!(!obj.path().exists());

        let mut good = obj.put("5d41402abc4b2a76b9719d911017c592", 5).unwrap();
        good.write_all(b"hello").unwrap();
        let out = good.close().unwrap();
        assert_eq!(out.etag.as_deref(), Some("5d41402abc4b2a76b9719d911017c592"));
    }

    #[test]
    fn failed_put_keeps_the_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, b"original contents").unwrap();
        let obj = LocalObject::new(&path).unwrap();

        let mut short = obj.put("", 10).unwrap();
        short.write_all(b"abc").unwrap();
        assert!(short.close().is_err());
        assert_eq!(fs::read(&path).unwrap(), b"original contents");

        let mut abandoned = obj.put("", 3).unwrap();
        abandoned.write_all(b"abc").unwrap();
        drop(abandoned);
        assert_eq!(fs::read(&path).unwrap(), b"original contents");

        // Staged files never outlive their writer.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        let mut good = obj.put("", 3).unwrap();
        good.write_all(b"new").unwrap();
        good.close().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }
}
