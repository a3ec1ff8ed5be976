//! The host/container two-process state machine (§4.1, §4.2): this is the
//! one place that knows both halves of the handshake.

use std::fs::File;
use std::os::fd::{FromRawFd, RawFd};

use nix::sys::signal::{kill, Signal};
use nix::unistd::{close, getcwd, Pid};

use crate::clone3;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec;
use crate::hooks;
use crate::identity;
use crate::mounts;
use crate::namespaces;
use crate::path;
use crate::pipe::{self, Pipe};
use crate::signals;
use crate::userns;

/// Runs one container lifecycle end to end and returns the process exit
/// code the binary should use (§4.1 step 13).
pub fn run(config: &Config) -> Result<i32> {
    signals::install()?;

    let flags = namespaces::compute_clone_flags(config)?;
    let to_child = Pipe::new()?;
    let to_host = Pipe::new()?;

    let (to_child_rx_raw, to_child_tx_raw) = to_child.raw_fds();
    let (to_host_rx_raw, to_host_tx_raw) = to_host.raw_fds();

    let config_for_child = config.clone();
    let callback: Box<dyn FnMut() -> isize> = Box::new(move || {
        match container_main(
            &config_for_child,
            to_child_rx_raw,
            to_child_tx_raw,
            to_host_rx_raw,
            to_host_tx_raw,
        ) {
            Ok(()) => 0,
            Err(e) => {
                log::error!("container setup failed: {e}");
                1
            }
        }
    });

    let child_pid = clone3::spawn(flags, callback)?;
    signals::set_child_pid(child_pid);

    // Host keeps tx_to_child + rx_to_host; collapse each Pipe down to the
    // half it owns, closing the other (§4.1 step 4).
    let mut tx_to_child = to_child.into_tx();
    let mut rx_to_host = to_host.into_rx();

    if let Some(user_ns) = config.namespaces.get("user") {
        userns::apply_mappings(
            child_pid,
            &user_ns.uid_mappings,
            &user_ns.gid_mappings,
            user_ns.setgroups,
        )?;
    }
    pipe::write_line(&mut tx_to_child, pipe::MSG_MAPPING_COMPLETE)?;

    pipe::expect_line(&mut rx_to_host, pipe::MSG_SETUP_COMPLETE)?;

    if let Err(e) = hooks::run_pre_start(child_pid, &config.hooks.pre_start) {
        let _ = kill(child_pid, Signal::SIGKILL);
        return Err(e);
    }

    pipe::write_line(&mut tx_to_child, pipe::MSG_EXEC)?;

    let code = wait_for_exit(child_pid)?;

    hooks::run_post_stop(Pid::from_raw(0), &config.hooks.post_stop);

    Ok(code)
}

fn wait_for_exit(child_pid: Pid) -> Result<i32> {
    use nix::sys::wait::{waitpid, WaitStatus};
    loop {
        match waitpid(child_pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(128 + sig as i32),
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(nix::errno::Errno::ECHILD) => {
                // The async SIGCHLD handler already reaped it first.
                if let Some(code) = signals::take_child_exit_status() {
                    return Ok(code);
                }
                return Err(Error::peer_died("waiting for container exit"));
            }
            Err(e) => return Err(Error::Resource(format!("waitpid(container): {e}"))),
        }
    }
}

/// The container side of the handshake (§4.2). Runs entirely in the cloned
/// child; any `Err` here becomes the container's nonzero exit code via the
/// orchestrating callback.
fn container_main(
    config: &Config,
    rx_raw: RawFd,
    unused_tx_raw: RawFd,
    unused_rx_raw: RawFd,
    tx_raw: RawFd,
) -> Result<()> {
    let _ = close(unused_tx_raw);
    let _ = close(unused_rx_raw);

    let mut rx = unsafe { File::from_raw_fd(rx_raw) };
    let mut tx = unsafe { File::from_raw_fd(tx_raw) };

    pipe::expect_line(&mut rx, pipe::MSG_MAPPING_COMPLETE)?;

    let host_cwd = getcwd().map_err(|e| Error::Resource(format!("getcwd failed: {e}")))?;

    let host_fd = match &config.process {
        Some(process) if process.host => {
            let arg0 = process
                .args
                .first()
                .ok_or_else(|| Error::config("process.args must not be empty"))?;
            Some(path::resolve_host_executable(arg0)?)
        }
        _ => None,
    };

    namespaces::join_configured_namespaces(config)?;

    if let Some(mount_ns) = config.namespaces.get("mount") {
        mounts::apply_all(&host_cwd, &mount_ns.mounts)?;
    }

    pipe::write_line(&mut tx, pipe::MSG_SETUP_COMPLETE)?;

    pipe::expect_line(&mut rx, pipe::MSG_EXEC)?;

    // Missing process, or (inside exec_process) empty args, is a clean skip:
    // the container exits 0 without ever invoking exec (§4.2 step 11, §8).
    let process = match &config.process {
        Some(process) => process,
        None => return Ok(()),
    };

    if let Some(cwd) = &process.cwd {
        nix::unistd::chdir(cwd.as_str())
            .map_err(|e| Error::privilege(format!("chdir({cwd}) failed: {e}")))?;
    }

    if let Some(user) = &process.user {
        identity::apply(user)?;
    }

    crate::capabilities::apply(&process.capabilities)?;

    let host_fd_raw = host_fd.as_ref().map(path::as_raw);
    exec::exec_process(process, host_fd_raw)
}
