//! The final exec dispatch (§4.11): a pre-opened host-path fd, an explicit
//! in-container path, or a bare `argv[0]` searched against `PATH` — in that
//! priority order.

use std::ffi::CString;
use std::os::fd::RawFd;

use nix::unistd::execvpe;

use crate::config::ProcessDescriptor;
use crate::error::{Error, Result};

pub fn build_argv(args: &[String]) -> Result<Vec<CString>> {
    args.iter()
        .map(|a| CString::new(a.as_str()).map_err(Error::from))
        .collect()
}

pub fn build_envp(env: &[String]) -> Result<Vec<CString>> {
    env.iter()
        .map(|e| CString::new(e.as_str()).map_err(Error::from))
        .collect()
}

/// Execs `descriptor`, never returning on success. `host_fd` must be
/// `Some` when `descriptor.host` is set (resolved by
/// [`crate::path::resolve_host_executable`] before the mount view changed).
/// An empty `args` is a clean no-op `Ok(())` rather than an error — it
/// yields container exit 0 without invoking exec (§4.2 step 11, §8).
pub fn exec_process(descriptor: &ProcessDescriptor, host_fd: Option<RawFd>) -> Result<()> {
    let argv = build_argv(&descriptor.args)?;
    if argv.is_empty() {
        return Ok(());
    }
    let envp = build_envp(&descriptor.env)?;

    if descriptor.host {
        let fd = host_fd.ok_or_else(|| {
            Error::config("process.host is set but no host executable fd was resolved")
        })?;
        return exec_by_fd(fd, &argv, &envp);
    }

    if let Some(path) = &descriptor.path {
        let cpath = CString::new(path.as_str())?;
        nix::unistd::execve(&cpath, &argv, &envp)
            .map_err(|e| Error::privilege(format!("execve({path}) failed: {e}")))?;
        unreachable!("execve only returns on error");
    }

    execvpe(&argv[0], &argv, &envp)
        .map_err(|e| Error::privilege(format!("execvpe({:?}) failed: {e}", argv[0])))?;
    unreachable!("execvpe only returns on error");
}

fn exec_by_fd(fd: RawFd, argv: &[CString], envp: &[CString]) -> Result<()> {
    let empty_path = CString::new("").expect("empty CString is always valid");
    let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|a| a.as_ptr()).collect();
    argv_ptrs.push(std::ptr::null());
    let mut envp_ptrs: Vec<*const libc::c_char> = envp.iter().map(|e| e.as_ptr()).collect();
    envp_ptrs.push(std::ptr::null());

    unsafe {
        libc::execveat(
            fd,
            empty_path.as_ptr(),
            argv_ptrs.as_ptr(),
            envp_ptrs.as_ptr(),
            libc::AT_EMPTY_PATH,
        );
    }
    // execveat only returns on failure; the process image is gone otherwise.
    let errno = std::io::Error::last_os_error();
    Err(Error::privilege(format!(
        "execveat(fd={fd}) failed: {errno}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_argv_rejects_embedded_nul() {
        assert!(build_argv(&["bad\0arg".to_string()]).is_err());
    }

    #[test]
    fn build_argv_preserves_order() {
        let argv = build_argv(&["/bin/true".to_string(), "-x".to_string()]).unwrap();
        assert_eq!(argv[0].to_str().unwrap(), "/bin/true");
        assert_eq!(argv[1].to_str().unwrap(), "-x");
    }

    #[test]
    fn empty_args_is_a_clean_no_op() {
        let descriptor = ProcessDescriptor {
            args: vec![],
            env: vec![],
            path: None,
            cwd: None,
            host: false,
            user: None,
            capabilities: vec![],
        };
        assert!(exec_process(&descriptor, None).is_ok());
    }
}
