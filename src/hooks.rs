//! Hook process lifecycle (§4.8): each hook is forked, fed the container
//! pid as a line on its stdin, exec'd, and waited on. A failing `pre-start`
//! hook aborts the run before `exec-process` is ever sent; a failing
//! `post-stop` hook is logged and ignored, since the container is already
//! gone by then.

use std::io::Write;
use std::os::fd::AsRawFd;

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2, fork, pipe, ForkResult, Pid};

use crate::config::ProcessDescriptor;
use crate::error::{Error, Result};
use crate::exec;
use crate::signals;

/// Forks and execs `descriptor`, then waits for it to exit. When
/// `container_pid` is nonzero, writes `"<container_pid>\n"` to the hook's
/// stdin before exec; a post-stop hook runs with `container_pid` zeroed
/// (§4.1 step 12), in which case no pipe is set up and stdin is left
/// inherited (§4.8 step 1). Returns the hook's exit status; a nonzero
/// status is the caller's to interpret (fatal for pre-start, ignored for
/// post-stop).
fn run_one(container_pid: Pid, descriptor: &ProcessDescriptor) -> Result<i32> {
    if container_pid.as_raw() == 0 {
        return run_one_without_pid(descriptor);
    }

    let (rx, tx) = pipe().map_err(|e| Error::Resource(format!("pipe: {e}")))?;

    match unsafe { fork() }.map_err(|e| Error::Resource(format!("fork: {e}")))? {
        ForkResult::Parent { child } => {
            drop(rx);
            signals::set_hook_pid(child);
            let mut tx_file = std::fs::File::from(tx);
            writeln!(tx_file, "{}", container_pid.as_raw())
                .map_err(|e| Error::Protocol(format!("writing hook stdin: {e}")))?;
            drop(tx_file);

            let status = wait_for_hook(child)?;
            signals::clear_hook_pid();
            Ok(status)
        }
        ForkResult::Child => {
            drop(tx);
            let _ = dup2(rx.as_raw_fd(), 0);
            drop(rx);
            exec_hook_child(descriptor);
        }
    }
}

/// `run_one` variant for post-stop hooks with no container pid to report:
/// no pipe, stdin stays inherited from the host process.
fn run_one_without_pid(descriptor: &ProcessDescriptor) -> Result<i32> {
    match unsafe { fork() }.map_err(|e| Error::Resource(format!("fork: {e}")))? {
        ForkResult::Parent { child } => {
            signals::set_hook_pid(child);
            let status = wait_for_hook(child)?;
            signals::clear_hook_pid();
            Ok(status)
        }
        ForkResult::Child => exec_hook_child(descriptor),
    }
}

fn wait_for_hook(child: Pid) -> Result<i32> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(128 + sig as i32),
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(Error::Resource(format!("waitpid(hook): {e}"))),
        }
    }
}

fn exec_hook_child(descriptor: &ProcessDescriptor) -> ! {
    if let Some(cwd) = &descriptor.cwd {
        if nix::unistd::chdir(cwd.as_str()).is_err() {
            std::process::exit(127);
        }
    }
    for kv in &descriptor.env {
        if let Some((k, v)) = kv.split_once('=') {
            std::env::set_var(k, v);
        }
    }
    let _ = exec::exec_process(descriptor, None);
    std::process::exit(127);
}

/// Runs every `pre-start` hook in order. The first nonzero exit is fatal
/// (§4.8).
pub fn run_pre_start(container_pid: Pid, hooks: &[ProcessDescriptor]) -> Result<()> {
    for hook in hooks {
        let status = run_one(container_pid, hook)?;
        if status != 0 {
            return Err(Error::privilege(format!(
                "pre-start hook exited with status {status}"
            )));
        }
    }
    Ok(())
}

/// Runs every `post-stop` hook in order, ignoring failures (§4.8).
pub fn run_post_stop(container_pid: Pid, hooks: &[ProcessDescriptor]) {
    for hook in hooks {
        if let Err(e) = run_one(container_pid, hook) {
            log::warn!("post-stop hook failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn true_hook() -> ProcessDescriptor {
        ProcessDescriptor {
            args: vec!["/bin/true".to_string()],
            env: vec![],
            path: Some("/bin/true".to_string()),
            cwd: None,
            host: false,
            user: None,
            capabilities: vec![],
        }
    }

    fn false_hook() -> ProcessDescriptor {
        ProcessDescriptor {
            args: vec!["/bin/false".to_string()],
            env: vec![],
            path: Some("/bin/false".to_string()),
            cwd: None,
            host: false,
            user: None,
            capabilities: vec![],
        }
    }

    #[test]
    fn successful_pre_start_hooks_pass() {
        if !std::path::Path::new("/bin/true").exists() {
            return;
        }
        let result = run_pre_start(nix::unistd::getpid(), &[true_hook()]);
        assert!(result.is_ok());
    }

    #[test]
    fn failing_pre_start_hook_is_fatal() {
        if !std::path::Path::new("/bin/false").exists() {
            return;
        }
        let result = run_pre_start(nix::unistd::getpid(), &[false_hook()]);
        assert!(result.is_err());
    }

    #[test]
    fn failing_post_stop_hook_is_ignored() {
        if !std::path::Path::new("/bin/false").exists() {
            return;
        }
        run_post_stop(nix::unistd::getpid(), &[false_hook()]);
    }
}
