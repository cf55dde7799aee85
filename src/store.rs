// src/store.rs
use dashmap::DashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreError;
use crate::session::GameId;
use crate::snapshot::GameSnapshot;

/// Persistence collaborator for game state.
pub trait GameStore: Send + Sync {
    fn load(&self, id: GameId) -> Result<GameSnapshot, StoreError>;
    fn save(&self, id: GameId, snapshot: &GameSnapshot) -> Result<(), StoreError>;
}

/// Keeps snapshots in memory. Lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: DashMap<GameId, GameSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self { MemoryStore::default() }

    pub fn len(&self) -> usize { self.games.len() }

    pub fn is_empty(&self) -> bool { self.games.is_empty() }
}

impl GameStore for MemoryStore {
    fn load(&self, id: GameId) -> Result<GameSnapshot, StoreError> {
        self.games.get(&id).map(|entry| entry.value().clone()).ok_or(StoreError::NotFound(id))
    }

    fn save(&self, id: GameId, snapshot: &GameSnapshot) -> Result<(), StoreError> {
        self.games.insert(id, snapshot.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per game, `game-<id>.json` under `dir`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates `dir` if it does not exist yet.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        Ok(JsonFileStore { dir })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn path_for(&self, id: GameId) -> PathBuf {
        self.dir.join(format!("game-{}.json", id))
    }
}

impl GameStore for JsonFileStore {
    fn load(&self, id: GameId) -> Result<GameSnapshot, StoreError> {
        let path = self.path_for(id);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound(id)),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(GameSnapshot::from_json(&json)?)
    }

    fn save(&self, id: GameId, snapshot: &GameSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(id);
        let json = snapshot.to_json()?;
        // Renaming within one directory replaces the old file atomically.
        let staged = path.with_extension("json.tmp");
        fs::write(&staged, json).map_err(|source| StoreError::Io { path: staged.clone(), source })?;
        fs::rename(&staged, &path).map_err(|source| StoreError::Io { path: path.clone(), source })?;
        debug!(%id, path = %path.display(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("duel_chess_{}_{}", name, std::process::id()))
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let id = GameId::new(7);
        assert!(matches!(store.load(id), Err(StoreError::NotFound(_))));
        let snapshot = Game::new().snapshot();
        store.save(id, &snapshot).unwrap();
        assert_eq!(store.load(id).unwrap(), snapshot);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn file_store_writes_one_file_per_game() {
        let dir = scratch_dir("file_store");
        let store = JsonFileStore::open(&dir).unwrap();
        let id = GameId::new(42);
        let snapshot = Game::new().snapshot();
        store.save(id, &snapshot).unwrap();

        assert!(store.path_for(id).ends_with("game-42.json"));
        assert_eq!(store.load(id).unwrap(), snapshot);
        assert!(matches!(store.load(GameId::new(43)), Err(StoreError::NotFound(_))));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn overwrite_replaces_the_file_and_leaves_no_staging_copy() {
        let dir = scratch_dir("overwrite");
        let store = JsonFileStore::open(&dir).unwrap();
        let id = GameId::new(5);
        store.save(id, &Game::new().snapshot()).unwrap();

        let mut game = Game::new();
        game.apply_move(&"e2e4".parse().unwrap()).unwrap();
        store.save(id, &game.snapshot()).unwrap();

        assert_eq!(store.load(id).unwrap(), game.snapshot());
        let names: Vec<_> = fs::read_dir(&dir).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names, vec![std::ffi::OsString::from("game-5.json")]);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_file_is_a_snapshot_error() {
        let dir = scratch_dir("corrupt");
        let store = JsonFileStore::open(&dir).unwrap();
        let id = GameId::new(1);
        fs::write(store.path_for(id), "not json").unwrap();
        assert!(matches!(store.load(id), Err(StoreError::Snapshot(_))));
        let _ = fs::remove_dir_all(dir);
    }
}
