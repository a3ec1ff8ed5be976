//! Applying the container process's identity: gid, supplementary groups,
//! then uid, in that order (§4.3), so a privileged step is never attempted
//! after the uid drop (§4.2 step 9).

use nix::unistd::{setgid, setgroups, setuid, Gid, Uid};

use crate::config::UserSpec;
use crate::error::{Error, Result};

/// Applies `spec` to the current process. Each field is optional and
/// skipped when absent; each failure is fatal (§4.3).
pub fn apply(spec: &UserSpec) -> Result<()> {
    if let Some(gid) = spec.gid {
        setgid(Gid::from_raw(gid))
            .map_err(|e| Error::privilege(format!("setgid({gid}) failed: {e}")))?;
    }
    if !spec.additional_gids.is_empty() {
        let groups: Vec<Gid> = spec.additional_gids.iter().map(|g| Gid::from_raw(*g)).collect();
        setgroups(&groups)
            .map_err(|e| Error::privilege(format!("setgroups({:?}) failed: {e}", spec.additional_gids)))?;
    }
    if let Some(uid) = spec.uid {
        setuid(Uid::from_raw(uid))
            .map_err(|e| Error::privilege(format!("setuid({uid}) failed: {e}")))?;
    }
    Ok(())
}
