// =============
// tests/unit/broadcast_tests.rs
// =============
//! Broadcast manager lifecycle with `sh` standing in for the container runtime.
use std::path::Path;
use std::time::Duration;

use backend_lib::broadcast::BroadcastManager;
use backend_lib::config::BroadcastSettings;
use meetsignal_common::BroadcastStatus;
use tempfile::TempDir;

use crate::test_utils::{fake_runtime, script_runtime};

const VIEWER: &str = "http://127.0.0.1:8080";
const RTMP: &str = "rtmp://live.example/app/";

/// `run` records its pid and sleeps; `kill` terminates that pid
fn killable_runtime(dir: &Path) -> BroadcastSettings {
    let pid_file = dir.join("bcast.pid");
    let pid_file = pid_file.display();
    script_runtime(&format!(
        "case \"$1\" in \
           run) echo $$ > '{pid_file}'; exec sleep 30 ;; \
           kill) kill \"$(cat '{pid_file}')\" ;; \
         esac"
    ))
}

async fn wait_for_pid(path: &Path) {
    for _ in 0..250 {
        let written = std::fs::read_to_string(path).is_ok_and(|pid| pid.ends_with('\n'));
        if written {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} never appeared", path.display());
}

async fn wait_idle(manager: &BroadcastManager) {
    tokio::time::timeout(Duration::from_secs(10), manager.wait_idle())
        .await
        .expect("broadcast did not return to idle");
}

#[tokio::test]
async fn test_stop_kills_running_broadcast() {
    let dir = TempDir::new().unwrap();
    let manager = BroadcastManager::new(killable_runtime(dir.path()), VIEWER);

    manager.start("m-1", RTMP, "key").unwrap();
    wait_for_pid(&dir.path().join("bcast.pid")).await;
    assert!(matches!(manager.status(), BroadcastStatus::Broadcasting { .. }));
    assert!(manager.active().and_then(|a| a.pid).is_some());

    manager.stop().unwrap();
    wait_idle(&manager).await;
    assert_eq!(manager.status(), BroadcastStatus::Idle);
}

#[tokio::test]
async fn test_idle_follows_exit_not_stop() {
    // `kill` is a no-op here, so only the subprocess exit ends the broadcast
    let manager = BroadcastManager::new(fake_runtime(1), VIEWER);

    manager.start("m-1", RTMP, "key").unwrap();
    manager.stop().unwrap();
    assert!(matches!(
        manager.status(),
        BroadcastStatus::Broadcasting { ref meeting_id, .. } if meeting_id == "m-1"
    ));

    wait_idle(&manager).await;
    assert_eq!(manager.status(), BroadcastStatus::Idle);
}

#[tokio::test]
async fn test_failed_subprocess_returns_to_idle() {
    let manager = BroadcastManager::new(script_runtime("echo 'no such image' >&2; exit 3"), VIEWER);

    manager.start("m-1", RTMP, "key").unwrap();
    wait_idle(&manager).await;

    // and can be started again
    assert!(manager.start("m-2", RTMP, "key").is_ok());
}

#[tokio::test]
async fn test_chatty_subprocess_is_drained() {
    // Far more output than a pipe buffer holds; the subprocess would stall if
    // nobody read it
    let manager = BroadcastManager::new(
        script_runtime("i=0; while [ $i -lt 20000 ]; do echo \"frame $i\"; i=$((i+1)); done"),
        VIEWER,
    );

    manager.start("m-1", RTMP, "key").unwrap();
    wait_idle(&manager).await;
}

#[tokio::test]
async fn test_stop_with_nothing_running() {
    let dir = TempDir::new().unwrap();
    let manager = BroadcastManager::new(killable_runtime(dir.path()), VIEWER);

    // `cat` of a missing pid file fails; still accepted
    assert!(manager.stop().is_ok());
    assert_eq!(manager.status(), BroadcastStatus::Idle);
}
