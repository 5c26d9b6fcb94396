//! Client record domain entity.
//!
//! One [`ClientRecord`] exists per open connection.  It is keyed in the
//! registry by a [`ConnectionHandle`], never by its user-facing `id`: the `id`
//! starts as a random token but a streamer may overwrite it with any room
//! identifier it likes, so it is neither stable nor unique.
//!
//! # Role lifecycle
//!
//! ```text
//!            join                    viewer_join
//! Unknown ─────────► Streamer    Unknown ─────────► Viewer
//!
//! Streamer ◄──────────────────────────────────────► Viewer
//!              (re-joins overwrite role and name)
//! ```
//!
//! There is no transition back to [`Role::Unknown`].

use std::fmt;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::domain::presence::StreamerEntry;

/// Display name given to a connection before it joins, and to a streamer that
/// joins without naming itself.
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// Display name given to a viewer that joins without naming itself.
pub const DEFAULT_VIEWER_NAME: &str = "Viewer";

/// Prefix of the temporary id assigned at connect time.
const TEMP_ID_PREFIX: &str = "c_";

/// Number of random characters following [`TEMP_ID_PREFIX`].
const TEMP_ID_LEN: usize = 7;

/// Opaque per-connection registry key.
///
/// Handles are allocated from a monotonically increasing counter, so ordering
/// handles orders connections by the time they were opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionHandle(u64);

impl ConnectionHandle {
    /// Wraps a raw counter value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What a connection has declared itself to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Connected but has not joined yet.
    #[default]
    Unknown,
    /// Joined with `join`; listed in the presence directory.
    Streamer,
    /// Joined with `viewer_join`; receives the directory but is not part of it.
    Viewer,
}

impl Role {
    /// Returns `true` if a connection in this role may move to `next`.
    ///
    /// Any joined role may be entered from any role, including itself, so a
    /// client can re-join with a new name or room.  Nothing returns to
    /// `Unknown`.
    pub fn can_transition_to(self, next: Role) -> bool {
        next != Role::Unknown
    }

    /// Lowercase wire/log name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unknown => "unknown",
            Role::Streamer => "streamer",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state of one open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    /// User-facing identifier: a random token until a streamer supplies a room id.
    pub id: String,
    /// Human-readable name shown in the presence directory.
    pub display_name: String,
    role: Role,
    last_activity: Instant,
}

impl ClientRecord {
    /// Creates the record for a freshly opened connection: random id,
    /// placeholder name, role `Unknown`, last activity `now`.
    pub fn new(now: Instant) -> Self {
        Self::with_id(generate_temp_id(), now)
    }

    /// Creates a not-yet-joined record with a caller-chosen id.
    pub fn with_id(id: impl Into<String>, now: Instant) -> Self {
        Self {
            id: id.into(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            role: Role::Unknown,
            last_activity: now,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn is_streamer(&self) -> bool {
        self.role == Role::Streamer
    }

    /// Records inbound activity at `now`.
    ///
    /// Activity never moves backwards: an older instant is ignored.
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Applies a `join`: the connection becomes a streamer.
    ///
    /// `room_id` replaces the current id when present; otherwise the id is
    /// kept.  A missing `name` falls back to [`DEFAULT_DISPLAY_NAME`].
    pub fn join_as_streamer(&mut self, room_id: Option<String>, name: Option<String>) {
        if let Some(room_id) = room_id {
            self.id = room_id;
        }
        self.display_name = name.unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
        self.set_role(Role::Streamer);
    }

    /// Applies a `viewer_join`: the connection becomes a viewer.
    ///
    /// A missing `name` falls back to [`DEFAULT_VIEWER_NAME`].  The id is
    /// left untouched.
    pub fn join_as_viewer(&mut self, name: Option<String>) {
        self.display_name = name.unwrap_or_else(|| DEFAULT_VIEWER_NAME.to_string());
        self.set_role(Role::Viewer);
    }

    fn set_role(&mut self, next: Role) {
        debug_assert!(self.role.can_transition_to(next));
        self.role = next;
    }

    /// Returns `true` if more than `timeout` has elapsed between the last
    /// activity and `now`.  Exactly `timeout` is still considered alive.
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) > timeout
    }

    /// The presence-directory entry for this record, if it is a streamer.
    pub fn streamer_entry(&self) -> Option<StreamerEntry> {
        self.is_streamer().then(|| StreamerEntry {
            id: self.id.clone(),
            name: self.display_name.clone(),
        })
    }
}

/// Generates `c_` followed by seven lowercase hex characters.
fn generate_temp_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{TEMP_ID_PREFIX}{}", &random[..TEMP_ID_LEN])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
