//! Ordered mount operations, including `pivot_root` with removal of the old
//! root (§4.6).
//!
//! Every `source`/`target` is resolved once against the container process's
//! starting working directory (`getcwd()`), matching the C reference's
//! single `snprintf("%s/%s", cwd, rel)` — and, per the spec.md Open
//! Questions, resolved with a NUL-terminated join rather than the reference
//! implementation's `memcpy` that drops the terminator (see DESIGN.md).

use std::path::{Path, PathBuf};

use nix::mount::{mount as nix_mount, umount2, MntFlags};
use nix::unistd::{chdir, mkdtemp};

use crate::config::MountEntry;
use crate::error::{Error, Result};
use crate::namespaces::mount_flags;
use crate::path::join_checked;

/// Performs every mount entry in order, resolving `source`/`target` against
/// `host_cwd` (§4.6).
pub fn apply_all(host_cwd: &Path, mounts: &[MountEntry]) -> Result<()> {
    for entry in mounts {
        if entry.is_pivot_root() {
            let source = join_checked(host_cwd, &entry.source)?;
            pivot_root_remove_old(&source)?;
        } else {
            apply_one(host_cwd, entry)?;
        }
    }
    Ok(())
}

fn apply_one(host_cwd: &Path, entry: &MountEntry) -> Result<()> {
    let source = join_checked(host_cwd, &entry.source)?;
    let target = join_checked(host_cwd, &entry.target)?;
    let flags = mount_flags(&entry.flags)?;
    nix_mount(
        Some(source.as_path()),
        target.as_path(),
        Some(entry.kind.as_str()),
        flags,
        entry.data.as_deref(),
    )
    .map_err(|e| {
        Error::privilege(format!(
            "mount({:?} -> {:?}, type={}) failed: {e}",
            source, target, entry.kind
        ))
    })
}

/// `pivot_root_remove_old` (§4.6):
///  1. `put_old = source/pivot-root.XXXXXX` via `mkdtemp`.
///  2. `chdir(source)`.
///  3. `pivot_root(source, put_old)`.
///  4. `chdir("/")`.
///  5. `umount2(basename(put_old), MNT_DETACH)`.
///  6. `rmdir(basename(put_old))`.
fn pivot_root_remove_old(source: &Path) -> Result<()> {
    let template = source.join("pivot-root.XXXXXX");
    let put_old: PathBuf = mkdtemp(&template)
        .map_err(|e| Error::privilege(format!("mkdtemp({template:?}) failed: {e}")))?;

    chdir(source).map_err(|e| Error::privilege(format!("chdir({source:?}) failed: {e}")))?;

    nix::unistd::pivot_root(source, &put_old)
        .map_err(|e| Error::privilege(format!("pivot_root({source:?}, {put_old:?}) failed: {e}")))?;

    chdir("/").map_err(|e| Error::privilege(format!("chdir(/) after pivot_root failed: {e}")))?;

    let put_old_name = put_old
        .file_name()
        .ok_or_else(|| Error::privilege("pivot_root put_old has no basename".to_string()))?;
    let put_old_rel = Path::new(put_old_name);

    umount2(put_old_rel, MntFlags::MNT_DETACH)
        .map_err(|e| Error::privilege(format!("umount2({put_old_rel:?}) failed: {e}")))?;

    std::fs::remove_dir(put_old_rel)
        .map_err(|e| Error::privilege(format!("rmdir({put_old_rel:?}) failed: {e}")))?;

    Ok(())
}
