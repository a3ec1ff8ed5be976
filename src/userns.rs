//! Host-side user-namespace id mapping: direct writes to
//! `/proc/<pid>/{uid_map,gid_map,setgroups}` (§4.7), in the mandated order —
//! `uid_map`, then `setgroups`, then `gid_map` — rather than shelling out to
//! `newuidmap`/`newgidmap` the way a setuid-helper-based implementation
//! would.

use std::fs::OpenOptions;
use std::io::Write;

use nix::unistd::Pid;

use crate::config::IdMapping;
use crate::error::{Error, Result};

/// Writes `mappings` as lines of `"container_id host_id size\n"` to
/// `/proc/<pid>/{uid,gid}_map`. A negative or zero `pid` means the child
/// already died (§4.1 step 7) and is a [`Error::PeerDied`].
fn write_map(pid: Pid, file: &str, mappings: &[IdMapping]) -> Result<()> {
    if pid.as_raw() <= 0 {
        return Err(Error::peer_died(format!("writing {file}")));
    }
    let path = format!("/proc/{}/{file}", pid.as_raw());
    let mut body = String::new();
    for m in mappings {
        body.push_str(&format!("{} {} {}\n", m.container_id, m.host_id, m.size));
    }
    let mut handle = OpenOptions::new()
        .write(true)
        .open(&path)
        .map_err(|e| Error::Privilege(format!("open {path} failed: {e}")))?;
    handle
        .write_all(body.as_bytes())
        .map_err(|e| Error::Privilege(format!("write {path} failed: {e}")))?;
    Ok(())
}

/// Writes `/proc/<pid>/setgroups`, either `"allow\n"` or `"deny\n"`. Must
/// precede the `gid_map` write whenever `setgroups` is being denied, since
/// the kernel refuses an unprivileged `gid_map` write otherwise (§4.7).
fn write_setgroups(pid: Pid, allow: bool) -> Result<()> {
    if pid.as_raw() <= 0 {
        return Err(Error::peer_died("writing setgroups"));
    }
    let path = format!("/proc/{}/setgroups", pid.as_raw());
    let body = if allow { "allow\n" } else { "deny\n" };
    let mut handle = OpenOptions::new()
        .write(true)
        .open(&path)
        .map_err(|e| Error::Privilege(format!("open {path} failed: {e}")))?;
    handle
        .write_all(body.as_bytes())
        .map_err(|e| Error::Privilege(format!("write {path} failed: {e}")))?;
    Ok(())
}

/// Performs the full mapping sequence for one user namespace: `uid_map`,
/// `setgroups`, `gid_map`, in that order (§4.7). `setgroups_allow` defaults
/// to `false` (deny) when the config is silent, matching the common
/// unprivileged-mapping case.
pub fn apply_mappings(
    pid: Pid,
    uid_mappings: &[IdMapping],
    gid_mappings: &[IdMapping],
    setgroups_allow: Option<bool>,
) -> Result<()> {
    if !uid_mappings.is_empty() {
        write_map(pid, "uid_map", uid_mappings)?;
    }
    write_setgroups(pid, setgroups_allow.unwrap_or(false))?;
    if !gid_mappings.is_empty() {
        write_map(pid, "gid_map", gid_mappings)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_peer_is_rejected_before_touching_proc() {
        let mappings = vec![IdMapping {
            container_id: 0,
            host_id: 1000,
            size: 1,
        }];
        let err = write_map(Pid::from_raw(-1), "uid_map", &mappings).unwrap_err();
        assert!(matches!(err, Error::PeerDied(_)));
    }

    #[test]
    fn zero_pid_is_rejected() {
        let err = write_setgroups(Pid::from_raw(0), false).unwrap_err();
        assert!(matches!(err, Error::PeerDied(_)));
    }

    #[test]
    fn apply_mappings_against_self_pid() {
        // Writing to our own /proc/<pid>/setgroups as a non-root test runner
        // is expected to fail with a privilege error, not panic or silently
        // succeed; this exercises the real file path end to end.
        let pid = nix::unistd::getpid();
        let result = apply_mappings(pid, &[], &[], Some(true));
        // Either it succeeds (already namespaced/root test runner) or it
        // surfaces as a Privilege error; both are acceptable outcomes here.
        if let Err(e) = result {
            assert!(matches!(e, Error::Privilege(_)));
        }
    }
}
