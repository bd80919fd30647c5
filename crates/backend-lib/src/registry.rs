// ============================
// crates/backend-lib/src/registry.rs
// ============================
//! Meeting registry: title -> meeting record + attendee names.
//!
//! Every title owns a slot guarded by an async mutex. The slot lock is held
//! across the backend call, so two requests for the same new title can never
//! both create a backend meeting; requests for other titles are unaffected.
//! A slot removed from the map is marked `Retired` first, and anyone who was
//! queued on it goes back to the map for a fresh slot.
//!
//! Live records are also published to a lock-free map, so listing never
//! waits behind a backend call in flight for some title.
//!
//! Mutating operations run on their own task: a client hanging up mid-request
//! cannot cancel a backend call halfway and leave the two sides disagreeing.
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use meetsignal_common::{JoinInfo, MeetingRecord, UNKNOWN_ATTENDEE_NAME};
use metrics::{counter, gauge};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::backend::ConferencingBackend;
use crate::error::AppError;
use crate::metrics::{
    ATTENDEE_JOINED, BACKEND_FAILURE, MEETING_ACTIVE, MEETING_CREATED, MEETING_DELETED,
    MEETING_ENDED,
};

/// A meeting and the display names of its attendees
#[derive(Debug, Clone)]
struct MeetingEntry {
    record: MeetingRecord,
    /// attendee id -> display name
    attendees: HashMap<String, String>,
    /// The backend meeting was ended; the record stays listed
    ended: bool,
}

#[derive(Debug)]
enum Slot {
    /// Claimed, no meeting yet (creation in flight or about to start)
    Vacant,
    Live(MeetingEntry),
    /// Detached from the map; whoever locks it must look the title up again
    Retired,
}

type SlotRef = Arc<Mutex<Slot>>;

struct Inner {
    backend: Arc<dyn ConferencingBackend>,
    default_region: String,
    meetings: DashMap<String, SlotRef>,
    /// title -> record of every `Live` slot
    records: DashMap<String, MeetingRecord>,
}

/// In-memory registry of meetings, keyed by title
#[derive(Clone)]
pub struct MeetingRegistry {
    inner: Arc<Inner>,
}

impl MeetingRegistry {
    /// Create an empty registry backed by `backend`
    pub fn new(backend: Arc<dyn ConferencingBackend>, default_region: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                default_region: default_region.into(),
                meetings: DashMap::new(),
                records: DashMap::new(),
            }),
        }
    }

    /// Return the meeting for `title`, creating the backend meeting first if
    /// the title is new. On a repeat call `region` and `playback_url` are
    /// ignored and the original record is returned unchanged.
    #[instrument(skip(self))]
    pub async fn ensure_meeting(
        &self,
        title: &str,
        region: Option<&str>,
        playback_url: Option<&str>,
    ) -> Result<MeetingRecord, AppError> {
        let owned_title = title.to_string();
        let region = region.map(str::to_string);
        let playback_url = playback_url.map(str::to_string);

        self.detached("ensure_meeting", title, move |this| async move {
            let title = owned_title;
            let (slot, mut guard) = this.claim(&title).await;
            let entry = this
                .ensure_locked(&title, &slot, &mut guard, region, playback_url)
                .await?;
            Ok(entry.record.clone())
        })
        .await
    }

    /// Register a new attendee with the backend for an existing meeting and
    /// remember `name` for it, if one was given.
    #[instrument(skip(self))]
    pub async fn add_attendee(&self, title: &str, name: Option<&str>) -> Result<JoinInfo, AppError> {
        let owned_title = title.to_string();
        let name = name.map(str::to_string);

        self.detached("add_attendee", title, move |this| async move {
            let title = owned_title;
            let (_slot, mut guard) = this
                .existing(&title)
                .await
                .ok_or_else(|| AppError::MeetingNotFound(title.clone()))?;
            let Slot::Live(entry) = &mut *guard else {
                return Err(AppError::MeetingNotFound(title));
            };
            this.add_attendee_locked(&title, entry, name).await
        })
        .await
    }

    /// Create-or-join in one critical section: no delete can slip in between
    /// the meeting being ensured and the attendee being added.
    #[instrument(skip(self))]
    pub async fn join_meeting(
        &self,
        title: &str,
        name: Option<&str>,
        region: Option<&str>,
        playback_url: Option<&str>,
    ) -> Result<JoinInfo, AppError> {
        let owned_title = title.to_string();
        let name = name.map(str::to_string);
        let region = region.map(str::to_string);
        let playback_url = playback_url.map(str::to_string);

        self.detached("join_meeting", title, move |this| async move {
            let title = owned_title;
            let (slot, mut guard) = this.claim(&title).await;
            let entry = this
                .ensure_locked(&title, &slot, &mut guard, region, playback_url)
                .await?;
            this.add_attendee_locked(&title, entry, name).await
        })
        .await
    }

    /// Display name recorded for `attendee_id`, or the "unknown" sentinel when
    /// the attendee never supplied one.
    pub async fn lookup_attendee_name(
        &self,
        title: &str,
        attendee_id: &str,
    ) -> Result<String, AppError> {
        let (_slot, guard) = self
            .existing(title)
            .await
            .ok_or_else(|| AppError::MeetingNotFound(title.to_string()))?;
        match &*guard {
            Slot::Live(entry) => Ok(entry
                .attendees
                .get(attendee_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_ATTENDEE_NAME.to_string())),
            _ => Err(AppError::MeetingNotFound(title.to_string())),
        }
    }

    /// Snapshot of every meeting. Not kept in sync with later mutations.
    pub async fn list_meetings(&self) -> BTreeMap<String, MeetingRecord> {
        self.inner
            .records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Snapshot of the recorded attendee names of a meeting
    pub async fn attendee_names(&self, title: &str) -> Result<HashMap<String, String>, AppError> {
        let (_slot, guard) = self
            .existing(title)
            .await
            .ok_or_else(|| AppError::MeetingNotFound(title.to_string()))?;
        match &*guard {
            Slot::Live(entry) => Ok(entry.attendees.clone()),
            _ => Err(AppError::MeetingNotFound(title.to_string())),
        }
    }

    /// Delete the backend meeting, then drop the title and its attendees.
    /// If the backend call fails the local record is kept.
    #[instrument(skip(self))]
    pub async fn delete_meeting(&self, title: &str) -> Result<(), AppError> {
        let owned_title = title.to_string();

        self.detached("delete_meeting", title, move |this| async move {
            let title = owned_title;
            let (slot, mut guard) = this
                .existing(&title)
                .await
                .ok_or_else(|| AppError::MeetingNotFound(title.clone()))?;
            let Slot::Live(entry) = &*guard else {
                return Err(AppError::MeetingNotFound(title));
            };
            let meeting_id = entry.record.meeting.meeting_id.clone();

            if let Err(e) = this.inner.backend.delete_meeting(&meeting_id).await {
                counter!(BACKEND_FAILURE, "op" => "delete_meeting").increment(1);
                warn!(%title, %meeting_id, error = %e, "backend delete failed, keeping meeting");
                return Err(e.into());
            }

            let ended = entry.ended;
            this.retire(&title, &slot, &mut guard);
            counter!(MEETING_DELETED).increment(1);
            if !ended {
                gauge!(MEETING_ACTIVE).decrement(1.0);
            }
            info!(%title, %meeting_id, "meeting deleted");
            Ok(())
        })
        .await
    }

    /// End the backend meeting but keep the local record, so the title keeps
    /// showing up in listings.
    #[instrument(skip(self))]
    pub async fn end_meeting(&self, title: &str) -> Result<(), AppError> {
        let owned_title = title.to_string();

        self.detached("end_meeting", title, move |this| async move {
            let title = owned_title;
            let (_slot, mut guard) = this
                .existing(&title)
                .await
                .ok_or_else(|| AppError::MeetingNotFound(title.clone()))?;
            let Slot::Live(entry) = &mut *guard else {
                return Err(AppError::MeetingNotFound(title));
            };
            let meeting_id = entry.record.meeting.meeting_id.clone();

            if let Err(e) = this.inner.backend.delete_meeting(&meeting_id).await {
                counter!(BACKEND_FAILURE, "op" => "end_meeting").increment(1);
                warn!(%title, %meeting_id, error = %e, "backend delete failed while ending meeting");
                return Err(e.into());
            }

            if !entry.ended {
                entry.ended = true;
                gauge!(MEETING_ACTIVE).decrement(1.0);
            }
            counter!(MEETING_ENDED).increment(1);
            info!(%title, %meeting_id, "meeting ended, record retained");
            Ok(())
        })
        .await
    }

    /// Run `op` on its own task and wait for it
    async fn detached<T, F, Fut>(&self, op: &'static str, title: &str, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        match tokio::spawn(f(self.clone())).await {
            Ok(result) => result,
            Err(e) => {
                // The backend may have acted without the registry recording it
                error!(op, %title, error = %e, "registry operation aborted; backend and registry may disagree, manual check required");
                Err(AppError::Internal(format!("{op} did not complete")))
            },
        }
    }

    /// Lock the slot for `title`, creating a vacant one if needed
    async fn claim(&self, title: &str) -> (SlotRef, OwnedMutexGuard<Slot>) {
        loop {
            let slot = Arc::clone(
                self.inner
                    .meetings
                    .entry(title.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(Slot::Vacant)))
                    .value(),
            );
            let guard = Arc::clone(&slot).lock_owned().await;
            if !matches!(*guard, Slot::Retired) {
                return (slot, guard);
            }
        }
    }

    /// Lock the slot for `title` if the title is known
    async fn existing(&self, title: &str) -> Option<(SlotRef, OwnedMutexGuard<Slot>)> {
        loop {
            let slot = self.inner.meetings.get(title).map(|e| Arc::clone(e.value()))?;
            let guard = Arc::clone(&slot).lock_owned().await;
            if !matches!(*guard, Slot::Retired) {
                return Some((slot, guard));
            }
        }
    }

    /// Detach a locked slot from the map
    fn retire(&self, title: &str, slot: &SlotRef, guard: &mut Slot) {
        *guard = Slot::Retired;
        self.inner.records.remove(title);
        self.inner
            .meetings
            .remove_if(title, |_, current| Arc::ptr_eq(current, slot));
    }

    async fn ensure_locked<'g>(
        &self,
        title: &str,
        slot: &SlotRef,
        guard: &'g mut OwnedMutexGuard<Slot>,
        region: Option<String>,
        playback_url: Option<String>,
    ) -> Result<&'g mut MeetingEntry, AppError> {
        if matches!(**guard, Slot::Vacant) {
            let region = region.unwrap_or_else(|| self.inner.default_region.clone());
            let client_request_token = Uuid::new_v4().to_string();

            match self
                .inner
                .backend
                .create_meeting(&client_request_token, &region)
                .await
            {
                Ok(meeting) => {
                    info!(%title, meeting_id = %meeting.meeting_id, %region, "meeting created");
                    counter!(MEETING_CREATED).increment(1);
                    gauge!(MEETING_ACTIVE).increment(1.0);
                    let record = MeetingRecord {
                        meeting,
                        playback_url,
                    };
                    self.inner.records.insert(title.to_string(), record.clone());
                    **guard = Slot::Live(MeetingEntry {
                        record,
                        attendees: HashMap::new(),
                        ended: false,
                    });
                },
                Err(e) => {
                    counter!(BACKEND_FAILURE, "op" => "create_meeting").increment(1);
                    warn!(%title, %region, error = %e, "backend create failed");
                    self.retire(title, slot, guard);
                    return Err(e.into());
                },
            }
        }

        match &mut **guard {
            Slot::Live(entry) => Ok(entry),
            _ => Err(AppError::MeetingNotFound(title.to_string())),
        }
    }

    async fn add_attendee_locked(
        &self,
        title: &str,
        entry: &mut MeetingEntry,
        name: Option<String>,
    ) -> Result<JoinInfo, AppError> {
        let meeting_id = entry.record.meeting.meeting_id.clone();
        let external_user_id = Uuid::new_v4().to_string();

        let attendee = self
            .inner
            .backend
            .create_attendee(&meeting_id, &external_user_id)
            .await
            .inspect_err(|e| {
                counter!(BACKEND_FAILURE, "op" => "create_attendee").increment(1);
                warn!(%title, %meeting_id, error = %e, "backend attendee creation failed");
            })?;

        if let Some(name) = name.filter(|n| !n.is_empty()) {
            entry.attendees.insert(attendee.attendee_id.clone(), name);
        }
        counter!(ATTENDEE_JOINED).increment(1);
        info!(%title, %meeting_id, attendee_id = %attendee.attendee_id, "attendee joined");

        Ok(JoinInfo {
            title: title.to_string(),
            meeting: entry.record.meeting.clone(),
            playback_url: entry.record.playback_url.clone(),
            attendee: Some(attendee),
        })
    }
}
