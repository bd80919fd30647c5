// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const MEETING_CREATED: &str = "meeting.created";
pub const MEETING_DELETED: &str = "meeting.deleted";
pub const MEETING_ENDED: &str = "meeting.ended";
pub const MEETING_ACTIVE: &str = "meeting.active";
pub const ATTENDEE_JOINED: &str = "attendee.joined";
pub const BACKEND_FAILURE: &str = "backend.failure";
pub const BROADCAST_STARTED: &str = "broadcast.started";
pub const BROADCAST_STOPPED: &str = "broadcast.stopped";
pub const BROADCAST_EXITED: &str = "broadcast.exited";
pub const BROADCAST_ACTIVE: &str = "broadcast.active";
