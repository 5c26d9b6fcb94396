//! The presence directory: who is streaming right now.
//!
//! A [`PresenceSnapshot`] is always derived from the live set of client
//! records at the moment it is needed.  It is a copy, not a view, and nothing
//! in the relay keeps one around between requests.

use serde::{Deserialize, Serialize};

use crate::domain::client::ClientRecord;

/// One streamer as it appears in a `users` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerEntry {
    pub id: String,
    pub name: String,
}

/// Point-in-time list of streamers, in the order their connections opened.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresenceSnapshot {
    pub users: Vec<StreamerEntry>,
}

impl PresenceSnapshot {
    /// Builds the snapshot from records already in connection order.
    ///
    /// Non-streamers are skipped.  Duplicate ids are kept as-is: two streamers
    /// that joined the same room both appear.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ClientRecord>,
    {
        Self {
            users: records
                .into_iter()
                .filter_map(ClientRecord::streamer_entry)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn streamer(room: &str, name: &str) -> ClientRecord {
        let mut rec = ClientRecord::with_id("tmp", Instant::now());
        rec.join_as_streamer(Some(room.into()), Some(name.into()));
        rec
    }

    #[test]
    fn test_from_records_keeps_only_streamers_in_order() {
        // Arrange
        let mut viewer = ClientRecord::with_id("v", Instant::now());
        viewer.join_as_viewer(Some("Bob".into()));
        let unknown = ClientRecord::with_id("u", Instant::now());
        let records = [streamer("r2", "Zed"), viewer, unknown, streamer("r1", "Alice")];

        // Act
        let snap = PresenceSnapshot::from_records(&records);

        // Assert
        let ids: Vec<&str> = snap.users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["r2", "r1"]);
    }

    #[test]
    fn test_from_records_keeps_duplicate_ids() {
        let records = [streamer("same", "A"), streamer("same", "B")];
        let snap = PresenceSnapshot::from_records(&records);
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn test_empty_registry_gives_empty_snapshot() {
        let snap = PresenceSnapshot::from_records(std::iter::empty());
        assert!(snap.is_empty());
    }
}
