//! Process-wide signal state: the orchestrator's view of "which pid is the
//! thing I'm currently responsible for", read and written from both regular
//! control flow and async-signal-context handlers (§4.1 steps 5/11, §9).
//!
//! `AtomicI32` cells stand in for the reference's plain global `pid_t`
//! variables; `-1` means "no current peer of this kind", matching the
//! sentinel the handshake/reaping code already treats as a dead peer
//! (`Error::PeerDied`).

use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::error::Result;

static CHILD_PID: AtomicI32 = AtomicI32::new(-1);
static HOOK_PID: AtomicI32 = AtomicI32::new(-1);

/// Sentinel meaning "the container hasn't been reaped by the async handler
/// yet". Set to a real exit code (the 128+signal convention of §4.1 step
/// 13) once `reap_child` observes it exit.
const NO_STATUS: i32 = i32::MIN;
static CHILD_EXIT_STATUS: AtomicI32 = AtomicI32::new(NO_STATUS);

/// Consumes and clears a status stashed by the async `SIGCHLD` handler, if
/// one has been recorded since the last call.
pub fn take_child_exit_status() -> Option<i32> {
    let status = CHILD_EXIT_STATUS.swap(NO_STATUS, Ordering::SeqCst);
    if status == NO_STATUS {
        None
    } else {
        Some(status)
    }
}

pub fn set_child_pid(pid: Pid) {
    CHILD_PID.store(pid.as_raw(), Ordering::SeqCst);
}

pub fn clear_child_pid() {
    CHILD_PID.store(-1, Ordering::SeqCst);
}

pub fn current_child_pid() -> Pid {
    Pid::from_raw(CHILD_PID.load(Ordering::SeqCst))
}

pub fn set_hook_pid(pid: Pid) {
    HOOK_PID.store(pid.as_raw(), Ordering::SeqCst);
}

pub fn clear_hook_pid() {
    HOOK_PID.store(-1, Ordering::SeqCst);
}

pub fn current_hook_pid() -> Pid {
    Pid::from_raw(HOOK_PID.load(Ordering::SeqCst))
}

/// Forwards `SIGKILL` to whichever of `CHILD_PID`/`HOOK_PID` is currently
/// live (§4.1 step 5). Async-signal-safe: only reads atomics and calls
/// `kill`.
extern "C" fn forward_kill(_: nix::libc::c_int) {
    let child = CHILD_PID.load(Ordering::SeqCst);
    if child > 0 {
        let _ = signal::kill(Pid::from_raw(child), Signal::SIGKILL);
    }
    let hook = HOOK_PID.load(Ordering::SeqCst);
    if hook > 0 {
        let _ = signal::kill(Pid::from_raw(hook), Signal::SIGKILL);
    }
}

/// Reaps whichever tracked pid just exited and clears its cell (§4.1 step
/// 11). Installed with `SA_SIGINFO | SA_NOCLDSTOP` so stop/continue
/// notifications don't spuriously reap.
extern "C" fn reap_child(_: nix::libc::c_int) {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(pid, code)) => {
                if pid.as_raw() == CHILD_PID.load(Ordering::SeqCst) {
                    CHILD_EXIT_STATUS.store(code, Ordering::SeqCst);
                    CHILD_PID.store(-1, Ordering::SeqCst);
                } else if pid.as_raw() == HOOK_PID.load(Ordering::SeqCst) {
                    HOOK_PID.store(-1, Ordering::SeqCst);
                }
            }
            Ok(WaitStatus::Signaled(pid, sig, _)) => {
                if pid.as_raw() == CHILD_PID.load(Ordering::SeqCst) {
                    CHILD_EXIT_STATUS.store(128 + sig as i32, Ordering::SeqCst);
                    CHILD_PID.store(-1, Ordering::SeqCst);
                } else if pid.as_raw() == HOOK_PID.load(Ordering::SeqCst) {
                    HOOK_PID.store(-1, Ordering::SeqCst);
                }
            }
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            _ => continue,
        }
    }
}

/// Installs the forwarding handlers for `SIGHUP`/`SIGINT`/`SIGTERM` and the
/// reaping handler for `SIGCHLD`, per §4.1 step 5.
pub fn install() -> Result<()> {
    let forward = SigAction::new(
        SigHandler::Handler(forward_kill),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        signal::sigaction(Signal::SIGHUP, &forward)?;
        signal::sigaction(Signal::SIGINT, &forward)?;
        signal::sigaction(Signal::SIGTERM, &forward)?;
    }

    let reap = SigAction::new(
        SigHandler::Handler(reap_child),
        SaFlags::SA_SIGINFO | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    unsafe {
        signal::sigaction(Signal::SIGCHLD, &reap)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_cells_round_trip() {
        set_child_pid(Pid::from_raw(123));
        assert_eq!(current_child_pid().as_raw(), 123);
        clear_child_pid();
        assert_eq!(current_child_pid().as_raw(), -1);

        set_hook_pid(Pid::from_raw(456));
        assert_eq!(current_hook_pid().as_raw(), 456);
        clear_hook_pid();
        assert_eq!(current_hook_pid().as_raw(), -1);
    }
}
