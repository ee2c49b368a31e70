use std::{collections::BTreeMap, fmt};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    game::{
        action::Action,
        change::WorldChange,
        world::{self, WorldSnapshot},
        Missing, PlayerId, SessionId, World,
    },
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
}

/// One resolved action as it was committed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GameLogEntry {
    pub sequence: u64,
    pub player: PlayerId,
    pub action: Action,
    pub changes: Vec<WorldChange>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GameSession {
    pub id: SessionId,
    pub status: SessionStatus,
    pub initial: WorldSnapshot,
    pub entries: Vec<GameLogEntry>,
}

impl GameSession {
    pub fn new(id: SessionId, initial: WorldSnapshot) -> Self {
        Self {
            id,
            status: SessionStatus::Active,
            initial,
            entries: Vec::new(),
        }
    }

    /// Rebuilds the world from the initial snapshot and every logged change.
    pub fn replay(&self) -> Result<World, Error> {
        let mut world = World::from_snapshot(&self.initial)?;
        for entry in &self.entries {
            world::apply(&mut world, &entry.changes)?;
        }
        Ok(world)
    }
}

/// Durable storage of game sessions.
pub trait SessionStore: fmt::Debug {
    fn create(&mut self, session: &GameSession) -> Result<(), Error>;
    fn append(&mut self, id: SessionId, entry: &GameLogEntry) -> Result<(), Error>;
    fn load(&self, id: SessionId) -> Result<GameSession, Error>;
    fn list(&self) -> Vec<SessionId>;
    fn delete(&mut self, id: SessionId) -> Result<(), Error>;
    fn set_status(&mut self, id: SessionId, status: SessionStatus) -> Result<(), Error>;
}

fn to_ron(session: &GameSession) -> Result<String, Error> {
    ron::ser::to_string(session).map_err(|err| Error::Persistence(err.to_string()))
}

fn from_ron(s: &str) -> Result<GameSession, Error> {
    ron::de::from_str(s).map_err(|err| Error::Persistence(err.to_string()))
}

/// Keeps every session as RON text.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: BTreeMap<u64, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&mut self, id: SessionId, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut GameSession),
    {
        let mut session = self.load(id)?;
        f(&mut session);
        let text = to_ron(&session)?;
        self.sessions.insert(id.0, text);
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn create(&mut self, session: &GameSession) -> Result<(), Error> {
        if self.sessions.contains_key(&session.id.0) {
            let s = format!("session {} already exists", session.id.0);
            return Err(Error::Persistence(s));
        }
        debug!("MemoryStore: create {:?}", session.id);
        let text = to_ron(session)?;
        self.sessions.insert(session.id.0, text);
        Ok(())
    }

    fn append(&mut self, id: SessionId, entry: &GameLogEntry) -> Result<(), Error> {
        self.update(id, |session| session.entries.push(entry.clone()))
    }

    fn load(&self, id: SessionId) -> Result<GameSession, Error> {
        let text = self
            .sessions
            .get(&id.0)
            .ok_or(Error::NotFound(Missing::Session(id)))?;
        from_ron(text)
    }

    fn list(&self) -> Vec<SessionId> {
        self.sessions.keys().map(|&id| SessionId(id)).collect()
    }

    fn delete(&mut self, id: SessionId) -> Result<(), Error> {
        self.sessions
            .remove(&id.0)
            .map(|_| ())
            .ok_or(Error::NotFound(Missing::Session(id)))
    }

    fn set_status(&mut self, id: SessionId, status: SessionStatus) -> Result<(), Error> {
        self.update(id, |session| session.status = status)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        error::Error,
        game::{
            action::{Action, EndTurn},
            change::{CoinsChanged, CoinsReason},
            Coins, Missing, PlayerId, SessionId, World,
        },
    };

    use super::{GameLogEntry, GameSession, MemoryStore, SessionStatus, SessionStore};

    fn income_entry(sequence: u64, previous: i32, new: i32) -> GameLogEntry {
        let change = CoinsChanged {
            player: PlayerId(1),
            previous: Coins(previous),
            new: Coins(new),
            reason: CoinsReason::Income,
        };
        GameLogEntry {
            sequence,
            player: PlayerId(1),
            action: Action::from(EndTurn),
            changes: vec![change.into()],
        }
    }

    #[test]
    fn store_round_trip() {
        let mut store = MemoryStore::new();
        let id = SessionId(7);
        let session = GameSession::new(id, World::new(2).snapshot());
        store.create(&session).unwrap();
        store.append(id, &income_entry(0, 0, 10)).unwrap();
        store.append(id, &income_entry(1, 10, 25)).unwrap();
        store.set_status(id, SessionStatus::Completed).unwrap();
        let loaded = store.load(id).unwrap();
        assert_eq!(loaded.status, SessionStatus::Completed);
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.initial, session.initial);
        assert_eq!(store.list(), vec![id]);
        let world = loaded.replay().unwrap();
        assert_eq!(world.coins(PlayerId(1)), Ok(Coins(25)));
    }

    #[test]
    fn missing_session() {
        let mut store = MemoryStore::new();
        let id = SessionId(1);
        let not_found: Result<(), Error> = Err(Error::NotFound(Missing::Session(id)));
        assert_eq!(store.load(id).map(|_| ()), not_found);
        assert_eq!(store.append(id, &income_entry(0, 0, 1)), not_found);
        assert_eq!(store.delete(id), not_found);
    }

    #[test]
    fn duplicate_and_delete() {
        let mut store = MemoryStore::new();
        let session = GameSession::new(SessionId(3), World::new(1).snapshot());
        store.create(&session).unwrap();
        assert!(matches!(
            store.create(&session),
            Err(Error::Persistence(_))
        ));
        store.delete(SessionId(3)).unwrap();
        assert!(store.list().is_empty());
    }
}
