//! Spawning the container process across a computed set of namespaces with
//! a 1 MiB child stack (§4.1 step 2).
//!
//! The teacher's `clone3`/`CloneArgs` wrapper also carried cgroup-specific
//! builder methods (`flag_into_cgroup`, `flag_newcgroup`, `flag_parent`);
//! cgroups are out of scope here, so this is built on `nix::sched::clone`
//! directly with a plain [`nix::sched::CloneFlags`] word instead (see
//! DESIGN.md).

use nix::sched::{clone, CloneFlags};
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::error::{Error, Result};

/// Matches the reference implementation's fixed child stack size.
pub const STACK_SIZE: usize = 1024 * 1024;

/// Clones a new process with `flags` (the `CLONE_NEW*` bits computed by
/// [`crate::namespaces::compute_clone_flags`]) running `callback`. The exit
/// signal is `SIGCHLD`, so the parent's ordinary `wait`/`SIGCHLD` handling
/// applies to it like any other child.
pub fn spawn(flags: CloneFlags, callback: Box<dyn FnMut() -> isize>) -> Result<Pid> {
    let mut stack = vec![0u8; STACK_SIZE];
    unsafe { clone(callback, &mut stack, flags, Some(Signal::SIGCHLD as i32)) }
        .map_err(|e| Error::Resource(format!("clone failed: {e}")))
}
