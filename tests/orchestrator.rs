mod common;

use std::sync::Mutex;

use ccon::config::Config;
use ccon::orchestrator;

// The orchestrator tracks the current container/hook pid in process-wide
// statics (`ccon::signals`); serialize these tests so concurrent runs don't
// race on that shared state.
static SERIAL: Mutex<()> = Mutex::new(());

/// End-to-end: create no new namespaces, run `/bin/true` as the container
/// process, and expect a clean exit. Exercises the full handshake without
/// requiring any namespace/user privilege, since an empty `namespaces` map
/// means `compute_clone_flags` returns no `CLONE_NEW*` bits.
#[test]
fn runs_a_trivial_process_with_no_namespaces() {
    let _guard = SERIAL.lock().unwrap();
    if !std::path::Path::new("/bin/true").exists() {
        return;
    }
    let json = r#"{
        "version": "0.2.0",
        "process": {"args": ["/bin/true"]}
    }"#;
    let config = Config::parse(json).unwrap();
    let code = orchestrator::run(&config).expect("orchestrator run should succeed");
    assert_eq!(code, 0);
}

/// A failing process reports a nonzero exit code rather than an error —
/// only setup failures are `Err`, per §4.1/§7.
#[test]
fn nonzero_container_exit_is_not_an_orchestrator_error() {
    let _guard = SERIAL.lock().unwrap();
    if !std::path::Path::new("/bin/false").exists() {
        return;
    }
    let json = r#"{
        "version": "0.2.0",
        "process": {"args": ["/bin/false"]}
    }"#;
    let config = Config::parse(json).unwrap();
    let code = orchestrator::run(&config).expect("orchestrator run should succeed");
    assert_ne!(code, 0);
}

/// User-namespace mapping end to end requires real privilege (writing
/// another process's `/proc/<pid>/uid_map`); skip gracefully where it's not
/// available, in the teacher's `tests/container.rs` style.
#[test]
fn user_namespace_mapping_requires_root() {
    let _guard = SERIAL.lock().unwrap();
    if !common::has_root() {
        return;
    }
    let json = r#"{
        "version": "0.2.0",
        "namespaces": {
            "user": {
                "uidMappings": [{"containerID": 0, "hostID": 0, "size": 1}],
                "gidMappings": [{"containerID": 0, "hostID": 0, "size": 1}],
                "setgroups": false
            }
        },
        "process": {"args": ["/bin/true"]}
    }"#;
    let config = Config::parse(json).unwrap();
    let code = orchestrator::run(&config).expect("orchestrator run should succeed");
    assert_eq!(code, 0);
}
