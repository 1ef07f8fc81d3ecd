//! Temp-directory resolution and header/PCH path probing.
//!
//! A thin safe wrapper per `libc` call, with
//! `std::io::Error::last_os_error()` surfaced on failure.

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Resolve the temp directory the PCH file and per-unit source files are
/// written under: `$TMPDIR`, then `$TMP`, then `/tmp`, falling back to
/// `/tmp` if nothing usable is found.
pub fn resolve_temp_dir() -> PathBuf {
    for var in ["TMPDIR", "TMP"] {
        if let Ok(val) = std::env::var(var) {
            let candidate = PathBuf::from(val);
            if is_usable_temp_dir(&candidate) {
                return candidate;
            }
        }
    }
    PathBuf::from("/tmp")
}

/// The directory must exist, be a directory, and either be owner-only
/// writable or have the sticky bit set, and be writable by the effective
/// user.
fn is_usable_temp_dir(path: &Path) -> bool {
    let Ok(meta) = stat(path) else {
        return false;
    };
    if !meta.is_dir {
        return false;
    }
    let owner_only = meta.mode & 0o077 == 0;
    let sticky = meta.mode & libc::S_ISVTX as u32 != 0;
    if !owner_only && !sticky {
        return false;
    }
    access_writable(path)
}

struct Stat {
    is_dir: bool,
    mode: u32,
}

fn stat(path: &Path) -> io::Result<Stat> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
    let mut buf: libc::stat = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::stat(c_path.as_ptr(), &mut buf) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(Stat {
        is_dir: buf.st_mode & libc::S_IFMT == libc::S_IFDIR,
        mode: buf.st_mode & 0o7777,
    })
}

fn access_writable(path: &Path) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

/// Probe that a file exists and is openable read-only. Used at init to
/// verify the header/PCH source file is present before committing to
/// starting the worker: on failure the subsystem is disabled.
pub fn probe_readable(path: &Path) -> io::Result<()> {
    File::open(path).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_is_usable_on_unix() {
        assert!(is_usable_temp_dir(Path::new("/tmp")));
    }

    #[test]
    fn nonexistent_dir_is_unusable() {
        assert!(!is_usable_temp_dir(Path::new(
            "/does/not/exist/mjit-coord-test"
        )));
    }

    #[test]
    fn resolve_falls_back_to_tmp() {
        // Only meaningful when no TMPDIR/TMP is set in the test environment.
        if std::env::var_os("TMPDIR").is_none() && std::env::var_os("TMP").is_none() {
            assert_eq!(resolve_temp_dir(), PathBuf::from("/tmp"));
        }
    }

    #[test]
    fn probe_missing_header_fails() {
        assert!(probe_readable(Path::new("/does/not/exist/header.h")).is_err());
    }
}
