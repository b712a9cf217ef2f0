use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Room {
    Lobby,
    Admin,
    Users,
}

#[derive(Debug, Clone, Copy)]
struct Connection {
    room: Room,
    user_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceCounts {
    pub total: usize,
    pub admins: usize,
    pub users: usize,
}

/// Live WebSocket connections and the room each one announced.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    connections: Arc<DashMap<Uuid, Connection>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: Option<i32>) -> Uuid {
        let id = Uuid::new_v4();
        self.connections.insert(
            id,
            Connection {
                room: Room::Lobby,
                user_id,
            },
        );
        id
    }

    /// Moves a connection into `room`. Returns `false` for an unknown connection.
    pub fn join(&self, id: Uuid, room: Room) -> bool {
        match self.connections.get_mut(&id) {
            Some(mut connection) => {
                connection.room = room;
                true
            }
            None => false,
        }
    }

    pub fn unregister(&self, id: Uuid) {
        self.connections.remove(&id);
    }

    pub fn counts(&self) -> PresenceCounts {
        let mut counts = PresenceCounts {
            total: 0,
            admins: 0,
            users: 0,
        };
        for entry in self.connections.iter() {
            counts.total += 1;
            match entry.room {
                Room::Admin => counts.admins += 1,
                Room::Users => counts.users += 1,
                Room::Lobby => {}
            }
        }
        counts
    }

    pub fn connections_for(&self, user_id: i32) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.user_id == Some(user_id))
            .count()
    }
}
