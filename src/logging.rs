//! Logging setup: one verbosity toggle, stderr only (§6, SPEC_FULL.md §B.3).
//! Anything richer (structured fields, file sinks, rotation) is out of
//! scope here.

use env_logger::Builder;
use log::LevelFilter;

pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .init();
}
