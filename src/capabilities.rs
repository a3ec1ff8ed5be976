//! Capability state reconstruction: clear the scratch space, then add back
//! exactly the named capabilities to effective/permitted/inheritable/
//! bounding (§4.4, §9).
//!
//! The spec.md Open Questions note a latent bug in the reference behavior:
//! an unknown capability name is a non-fatal warning whose (failed) lookup
//! value still gets added to the set. This crate resolves that Open
//! Question by making an unknown name a fatal [`Error::Configuration`] —
//! the reference's own recommendation (see DESIGN.md).

use caps::{CapSet, CapsHashSet, Capability};

use crate::error::{Error, Result};

const SETS: [CapSet; 4] = [
    CapSet::Effective,
    CapSet::Permitted,
    CapSet::Inheritable,
    CapSet::Bounding,
];

/// Looks up a `CAP_`-prefixed capability name. Rejects names shorter than 4
/// characters outright (§4.4).
pub fn lookup(name: &str) -> Result<Capability> {
    if name.len() < 4 {
        return Err(Error::config(format!("capability name '{name}' too short")));
    }
    name.parse::<Capability>()
        .map_err(|_| Error::config(format!("unknown capability '{name}'")))
}

/// Clears then repopulates effective/permitted/inheritable/bounding with
/// exactly `names`. A no-op when `names` is empty — the ambient set is then
/// left unchanged (§8).
pub fn apply(names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    for set in SETS {
        caps::clear(None, set)
            .map_err(|e| Error::privilege(format!("clearing {set:?} capabilities failed: {e}")))?;
    }
    let mut wanted = CapsHashSet::new();
    for name in names {
        wanted.insert(lookup(name)?);
    }
    for set in SETS {
        caps::set(None, set, &wanted)
            .map_err(|e| Error::privilege(format!("applying {set:?} capabilities failed: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_names() {
        assert!(lookup("CAP").is_err());
        assert!(lookup("X").is_err());
    }

    #[test]
    fn accepts_known_capability() {
        assert_eq!(lookup("CAP_CHOWN").unwrap(), Capability::CAP_CHOWN);
    }

    #[test]
    fn rejects_unknown_capability() {
        assert!(lookup("CAP_NOT_A_REAL_CAP").is_err());
    }

    #[test]
    fn empty_list_is_a_no_op() {
        assert!(apply(&[]).is_ok());
    }
}
