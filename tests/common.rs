use rand::distributions::{Alphanumeric, DistString as _};

#[allow(unused)]
pub fn rand_string(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), len)
}

/// Tests that unshare namespaces or touch `/proc/<pid>/uid_map` need real
/// privilege; skip them gracefully outside a CI runner configured for it,
/// rather than failing everywhere else.
#[allow(unused)]
pub fn has_root() -> bool {
    nix::unistd::getuid().is_root()
}
