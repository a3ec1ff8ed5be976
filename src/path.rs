//! Path joining and `PATH`-style executable resolution, bounded at
//! [`MAX_PATH`] bytes (§4.10, §9).

use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::getcwd;

use crate::error::{Error, Result};

/// Inclusive of the terminating NUL, per §4.6/§9.
pub const MAX_PATH: usize = 1024;

/// Joins `base` and `rel` the way the host orchestrator resolves mount
/// sources/targets: absolute paths are used verbatim, relative ones are
/// joined onto `base`. Fails if the joined path would not fit in
/// [`MAX_PATH`] bytes including the NUL terminator.
pub fn join_checked(base: &Path, rel: &str) -> Result<PathBuf> {
    let joined = if Path::new(rel).is_absolute() {
        PathBuf::from(rel)
    } else {
        base.join(rel)
    };
    check_len(&joined)?;
    Ok(joined)
}

fn check_len(path: &Path) -> Result<()> {
    // +1 for the NUL terminator a C-style path buffer would carry.
    let len = path.as_os_str().len() + 1;
    if len > MAX_PATH {
        return Err(Error::config(format!(
            "path '{}' exceeds MAX_PATH ({MAX_PATH} bytes)",
            path.display()
        )));
    }
    Ok(())
}

/// Resolves `arg0` against the host filesystem for the `process.host` case
/// (§4.10):
///  - absolute: open directly.
///  - contains a `/`: resolve relative to `getcwd()`.
///  - bare name: search `PATH` entries in order, first open wins.
///
/// Returns an owned, close-on-exec, path-only fd suitable for a later
/// `execveat(fd, "", ..., AT_EMPTY_PATH)`-style exec.
pub fn resolve_host_executable(arg0: &str) -> Result<File> {
    let candidate = Path::new(arg0);
    if candidate.is_absolute() {
        return open_path_only(candidate);
    }
    if arg0.contains('/') {
        let cwd = getcwd().map_err(|e| Error::Resource(format!("getcwd failed: {e}")))?;
        let full = cwd.join(candidate);
        check_len(&full)?;
        return open_path_only(&full);
    }
    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in path_var.split(':') {
        if dir.is_empty() {
            continue;
        }
        let full = PathBuf::from(dir).join(arg0);
        if check_len(&full).is_err() {
            continue;
        }
        if let Ok(file) = open_path_only(&full) {
            return Ok(file);
        }
    }
    Err(Error::config(format!(
        "cannot resolve host executable '{arg0}' against PATH"
    )))
}

fn open_path_only(path: &Path) -> Result<File> {
    let fd = fcntl::open(
        path,
        OFlag::O_PATH | OFlag::O_CLOEXEC,
        Mode::empty(),
    )
    .map_err(|e| Error::Resource(format!("open '{}' failed: {e}", path.display())))?;
    Ok(unsafe { <File as std::os::fd::FromRawFd>::from_raw_fd(fd) })
}

/// Raw fd accessor, used by the exec dispatcher's `execveat(fd, "", ...)` path.
pub fn as_raw(file: &File) -> RawFd {
    file.as_raw_fd()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_used_verbatim() {
        let joined = join_checked(Path::new("/host/cwd"), "/abs/target").unwrap();
        assert_eq!(joined, PathBuf::from("/abs/target"));
    }

    #[test]
    fn relative_paths_joined_onto_base() {
        let joined = join_checked(Path::new("/host/cwd"), "rel/target").unwrap();
        assert_eq!(joined, PathBuf::from("/host/cwd/rel/target"));
    }

    #[test]
    fn path_length_boundary() {
        let base = Path::new("/");
        let exact = "a".repeat(MAX_PATH - 2); // +1 for leading '/', +1 for NUL == MAX_PATH
        assert!(join_checked(base, &exact).is_ok());
        let over = "a".repeat(MAX_PATH - 1);
        assert!(join_checked(base, &over).is_err());
    }
}
