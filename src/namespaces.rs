//! Namespace name tables and joining-by-path (§4.5, §6).

use std::fs::File;
use std::os::fd::AsFd;

use nix::mount::MsFlags;
use nix::sched::CloneFlags;

use crate::config::Config;
use crate::error::{Error, Result};

/// Maps a configuration namespace name to its `CLONE_NEW*` flag.
pub fn flag_for_name(name: &str) -> Result<CloneFlags> {
    match name {
        "mount" => Ok(CloneFlags::CLONE_NEWNS),
        "uts" => Ok(CloneFlags::CLONE_NEWUTS),
        "ipc" => Ok(CloneFlags::CLONE_NEWIPC),
        "net" => Ok(CloneFlags::CLONE_NEWNET),
        "pid" => Ok(CloneFlags::CLONE_NEWPID),
        "user" => Ok(CloneFlags::CLONE_NEWUSER),
        other => Err(Error::config(format!("unknown namespace name '{other}'"))),
    }
}

/// Computes the `clone`/`clone3` flag word for every namespace configured to
/// be *created* (no `path` field), per §4.1 step 1.
pub fn compute_clone_flags(config: &Config) -> Result<CloneFlags> {
    let mut flags = CloneFlags::empty();
    for (name, descriptor) in &config.namespaces {
        if !descriptor.is_join() {
            flags |= flag_for_name(name)?;
        }
    }
    Ok(flags)
}

/// Opens `path` and `setns()`s into it using the flag appropriate for `name`,
/// per §4.5. Iteration order is the caller's responsibility (configuration
/// order).
pub fn join_namespace(name: &str, path: &str) -> Result<()> {
    let flag = flag_for_name(name)?;
    let file = File::open(path)
        .map_err(|e| Error::Privilege(format!("cannot open namespace path '{path}': {e}")))?;
    nix::sched::setns(file.as_fd(), flag)
        .map_err(|e| Error::Privilege(format!("setns({name}, {path}) failed: {e}")))?;
    Ok(())
}

/// Joins every namespace in `config` that names a `path`, in configuration
/// order (§4.2 step 4, §4.5).
pub fn join_configured_namespaces(config: &Config) -> Result<()> {
    for (name, descriptor) in &config.namespaces {
        if let Some(path) = &descriptor.path {
            if !path.is_empty() {
                join_namespace(name, path)?;
            }
        }
    }
    Ok(())
}

/// Maps a symbolic mount-flag token (§6) to its `MsFlags` bit. Unrecognized
/// tokens are fatal to the caller (Configuration error).
pub fn mount_flag_for_name(name: &str) -> Result<MsFlags> {
    let flag = match name {
        "MS_BIND" => MsFlags::MS_BIND,
        "MS_DIRSYNC" => MsFlags::MS_DIRSYNC,
        "MS_I_VERSION" => MsFlags::MS_I_VERSION,
        "MS_MANDLOCK" => MsFlags::MS_MANDLOCK,
        "MS_MOVE" => MsFlags::MS_MOVE,
        "MS_NOATIME" => MsFlags::MS_NOATIME,
        "MS_NODEV" => MsFlags::MS_NODEV,
        "MS_NODIRATIME" => MsFlags::MS_NODIRATIME,
        "MS_NOEXEC" => MsFlags::MS_NOEXEC,
        "MS_NOSUID" => MsFlags::MS_NOSUID,
        "MS_PRIVATE" => MsFlags::MS_PRIVATE,
        "MS_RDONLY" => MsFlags::MS_RDONLY,
        "MS_REC" => MsFlags::MS_REC,
        "MS_RELATIME" => MsFlags::MS_RELATIME,
        "MS_REMOUNT" => MsFlags::MS_REMOUNT,
        "MS_SHARED" => MsFlags::MS_SHARED,
        "MS_SILENT" => MsFlags::MS_SILENT,
        "MS_SLAVE" => MsFlags::MS_SLAVE,
        "MS_STRICTATIME" => MsFlags::MS_STRICTATIME,
        "MS_SYNCHRONOUS" => MsFlags::MS_SYNCHRONOUS,
        "MS_UNBINDABLE" => MsFlags::MS_UNBINDABLE,
        other => {
            return Err(Error::config(format!("unknown mount flag '{other}'")));
        }
    };
    Ok(flag)
}

/// ORs together the named mount-flag tokens, per §4.6/§6.
pub fn mount_flags(names: &[String]) -> Result<MsFlags> {
    let mut flags = MsFlags::empty();
    for name in names {
        flags |= mount_flag_for_name(name)?;
    }
    Ok(flags)
}
