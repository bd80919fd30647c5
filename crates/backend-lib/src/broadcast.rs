// ============================
// crates/backend-lib/src/broadcast.rs
// ============================
//! Broadcast process manager.
//!
//! At most one broadcast subprocess exists at a time, addressed by the fixed
//! container name from the settings. The manager is either idle or
//! broadcasting; it only returns to idle when the subprocess itself exits,
//! never because a stop was requested.
//!
//! Launch and kill are fire-and-forget: their failures are logged, and the
//! caller is told the request was accepted.
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use meetsignal_common::BroadcastStatus;
use metrics::{counter, gauge};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::BroadcastSettings;
use crate::error::AppError;
use crate::metrics::{BROADCAST_ACTIVE, BROADCAST_EXITED, BROADCAST_STARTED, BROADCAST_STOPPED};

/// The broadcast currently running
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveBroadcast {
    /// Launch counter, used to match exit notifications to launches
    pub session: u64,
    pub meeting_id: String,
    pub started_at: DateTime<Utc>,
    pub pid: Option<u32>,
}

type State = Option<ActiveBroadcast>;

/// Owns the broadcast subprocess lifecycle
pub struct BroadcastManager {
    settings: BroadcastSettings,
    viewer_base_url: String,
    state: Arc<watch::Sender<State>>,
    sessions: AtomicU64,
}

impl BroadcastManager {
    pub fn new(settings: BroadcastSettings, viewer_base_url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            settings,
            viewer_base_url: viewer_base_url.into(),
            state: Arc::new(state),
            sessions: AtomicU64::new(0),
        }
    }

    /// Page the broadcaster opens to render `meeting_id`
    pub fn viewer_url(&self, meeting_id: &str) -> String {
        format!(
            "{}/?broadcast=1&meetingId={}",
            self.viewer_base_url.trim_end_matches('/'),
            meeting_id
        )
    }

    /// Current state
    pub fn status(&self) -> BroadcastStatus {
        match &*self.state.borrow() {
            None => BroadcastStatus::Idle,
            Some(active) => BroadcastStatus::Broadcasting {
                meeting_id: active.meeting_id.clone(),
                started_at: active.started_at,
            },
        }
    }

    /// The running broadcast, if any
    pub fn active(&self) -> Option<ActiveBroadcast> {
        self.state.borrow().clone()
    }

    /// Resolves once no broadcast is running
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(Option::is_none).await;
    }

    /// Launch the broadcast subprocess for `meeting_id`, streaming to
    /// `rtmp_base` + `stream_key`. Returns as soon as the launch was issued.
    pub fn start(&self, meeting_id: &str, rtmp_base: &str, stream_key: &str) -> Result<(), AppError> {
        let Some((program, leading_args)) = self.settings.command.split_first() else {
            return Err(AppError::Internal("broadcast command is empty".to_string()));
        };

        let session = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        let mut busy_with = None;
        self.state.send_if_modified(|state| {
            if let Some(active) = state.as_ref() {
                busy_with = Some(active.meeting_id.clone());
                return false;
            }
            *state = Some(ActiveBroadcast {
                session,
                meeting_id: meeting_id.to_string(),
                started_at: Utc::now(),
                pid: None,
            });
            true
        });
        if let Some(active_meeting) = busy_with {
            warn!(meeting_id, active_meeting = %active_meeting, "broadcast already running, start rejected");
            return Err(AppError::BroadcastAlreadyActive {
                meeting_id: active_meeting,
            });
        }

        let viewer_url = self.viewer_url(meeting_id);
        let ingest_url = format!("{rtmp_base}{stream_key}");
        info!(session, meeting_id, %viewer_url, "starting broadcast");

        let mut child = match Command::new(program)
            .args(leading_args)
            .args(self.launch_args(&viewer_url, &ingest_url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                error!(session, %program, error = %e, "failed to launch broadcast");
                finish(&self.state, session);
                return Ok(());
            },
        };

        let pid = child.id();
        self.state.send_if_modified(|state| match state {
            Some(active) if active.session == session => {
                active.pid = pid;
                true
            },
            _ => false,
        });
        counter!(BROADCAST_STARTED).increment(1);
        gauge!(BROADCAST_ACTIVE).set(1.0);
        info!(session, ?pid, "broadcast launched");

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(session, "stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(session, "stderr", stderr));
        }

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => info!(session, %status, "broadcast exited"),
                Ok(status) => warn!(session, %status, "broadcast exited with failure"),
                Err(e) => error!(session, error = %e, "failed to wait for broadcast"),
            }
            counter!(BROADCAST_EXITED).increment(1);
            finish(&state, session);
        });

        Ok(())
    }

    /// Ask the container runtime to kill the broadcast by its fixed name.
    /// Nothing running is not an error.
    pub fn stop(&self) -> Result<(), AppError> {
        let Some((program, leading_args)) = self.settings.command.split_first() else {
            return Err(AppError::Internal("broadcast command is empty".to_string()));
        };
        let name = self.settings.container_name.clone();
        info!(container = %name, "stopping broadcast");
        counter!(BROADCAST_STOPPED).increment(1);

        let mut kill = Command::new(program);
        kill.args(leading_args)
            .arg("kill")
            .arg(&name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        tokio::spawn(async move {
            match kill.status().await {
                Ok(status) if status.success() => info!(container = %name, "broadcast kill delivered"),
                // Usually "no such container": nothing was running
                Ok(status) => debug!(container = %name, %status, "broadcast kill had no target"),
                Err(e) => error!(container = %name, error = %e, "failed to run broadcast kill"),
            }
        });

        Ok(())
    }

    fn launch_args(&self, viewer_url: &str, ingest_url: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            format!("--network={}", self.settings.network),
            format!("--shm-size={}", self.settings.shm_size),
            "--env".to_string(),
            format!("MEETING_URL={viewer_url}"),
            "--env".to_string(),
            format!("RTMP_URL={ingest_url}"),
            format!("--name={}", self.settings.container_name),
            self.settings.image.clone(),
        ]
    }
}

/// Return to idle, unless a newer launch has taken over since
fn finish(state: &watch::Sender<State>, session: u64) {
    let cleared = state.send_if_modified(|state| {
        if state.as_ref().is_some_and(|active| active.session == session) {
            *state = None;
            return true;
        }
        false
    });
    if cleared {
        gauge!(BROADCAST_ACTIVE).set(0.0);
    }
}

async fn forward_output<R: AsyncRead + Unpin>(session: u64, stream: &'static str, reader: R) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if stream == "stderr" => warn!(session, stream, "{line}"),
            Ok(Some(line)) => info!(session, stream, "{line}"),
            Ok(None) => break,
            Err(e) => {
                warn!(session, stream, error = %e, "error reading broadcast output");
                break;
            },
        }
    }
}
