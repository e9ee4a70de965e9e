use memmap2::Mmap;
use std::fs::{self, File, OpenOptions};
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Unpacks a zip-format archive (jar, war) into `dest`, returning the number
/// of file entries written.
///
/// Any entry whose name would land outside `dest` aborts the whole
/// extraction before that entry touches the filesystem, as does the first
/// I/O failure on any entry.
pub fn extract(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path).map_err(|source| Error::OpenArchive {
        path: archive_path.to_path_buf(),
        source,
    })?;
    // SAFETY: The file is opened read-only and outlives the mapping, which is
    // dropped at the end of this function.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| Error::OpenArchive {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive =
        ZipArchive::new(Cursor::new(&mmap[..])).map_err(|source| Error::ReadArchive {
            path: archive_path.to_path_buf(),
            source,
        })?;

    fs::create_dir_all(dest).map_err(|e| Error::entry(archive_path, "/", e))?;

    let mut written = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| Error::ReadArchive {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let name = entry.name().to_string();
        let target = resolve_inside(dest, &name).ok_or_else(|| Error::ZipSlip {
            archive: archive_path.to_path_buf(),
            entry: name.clone(),
        })?;

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::entry(archive_path, &name, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::entry(archive_path, &name, e))?;
        }
        let mut out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target)
            .map_err(|e| Error::entry(archive_path, &name, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| Error::entry(archive_path, &name, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))
                .map_err(|e| Error::entry(archive_path, &name, e))?;
        }

        written += 1;
    }

    Ok(written)
}

/// Joins `name` onto `dest` lexically, returning `None` unless the result is
/// strictly below `dest`.
fn resolve_inside(dest: &Path, name: &str) -> Option<PathBuf> {
    if name.contains('\0') {
        return None;
    }

    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if parts.is_empty() {
        return None;
    }
    let mut target = dest.to_path_buf();
    target.extend(parts);
    Some(target)
}
