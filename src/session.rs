// src/session.rs
//! Per-game fan-out. Each live game sits behind its own async mutex, held from
//! validation through persistence and broadcast, so a game has exactly one
//! writer while distinct games proceed in parallel.
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::board::Layout;
use crate::chess_move::Move;
use crate::error::{MoveError, SessionError, StoreError};
use crate::game::{Game, GameStatus, MoveReport};
use crate::piece::Color;
use crate::position::Position;
use crate::snapshot::GameSnapshot;
use crate::store::GameStore;

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct GameId(u32);

impl GameId {
    pub fn new(raw: u32) -> Self { GameId(raw) }

    pub fn value(&self) -> u32 { self.0 }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for GameId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { s.trim().parse().map(GameId) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// What a connection may do in its game.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Player(Color),
    Observer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player(color) => write!(f, "{} player", color),
            Role::Observer => write!(f, "An observer"),
        }
    }
}

// --- Wire messages ---

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Connect,
    MakeMove,
    Load,
    Highlight,
    Resign,
    Leave,
}

/// Inbound command, e.g. `{"commandType":"MAKE_MOVE","gameId":7,"move":{...}}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientCommand {
    pub command_type: CommandType,
    pub game_id: GameId,
    #[serde(default, rename = "move")]
    pub mv: Option<Move>,
    #[serde(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "serverMessageType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    LoadGame {
        board: Layout,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Notification { message: String },
    Error { message: String },
    LoadHighlight {
        board: Layout,
        destinations: BTreeSet<Position>,
        moves: Vec<Move>,
    },
}

impl ServerMessage {
    fn load_game(game: &Game) -> Self {
        ServerMessage::LoadGame { board: game.board().layout().clone(), message: state_message(game.status()) }
    }

    pub fn error(err: &SessionError) -> Self {
        ServerMessage::Error { message: format!("Error: {}", err) }
    }
}

/// Text attached to a board update. Only these three states carry one.
pub fn state_message(status: GameStatus) -> Option<String> {
    match status {
        GameStatus::Check(_) => Some("Check".to_string()),
        GameStatus::Checkmate(_) => Some("Checkmate".to_string()),
        GameStatus::Stalemate => Some("Stalemate".to_string()),
        GameStatus::InProgress | GameStatus::Resigned(_) => None,
    }
}

fn describe_move(report: &MoveReport) -> String {
    let mut text = format!("{} moved {} from {} to {}", report.mover, report.piece.kind, report.mv.from, report.mv.to);
    if let Some(captured) = report.captured {
        text.push_str(&format!(", capturing a {}", captured.kind));
    }
    if let Some(kind) = report.mv.promotion {
        text.push_str(&format!(", promoting to {}", kind));
    }
    match report.status {
        GameStatus::Check(color) => text.push_str(&format!(". {} is in check", color)),
        GameStatus::Checkmate(_) | GameStatus::Stalemate => text.push_str(&format!(". {}", report.status)),
        _ => {}
    }
    text
}

// --- Subscriptions ---

#[derive(Debug, Clone)]
struct Broadcast {
    exclude: Option<SubscriberId>,
    message: ServerMessage,
}

/// One connection's view of a game.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    game_id: GameId,
    role: Role,
    receiver: broadcast::Receiver<Broadcast>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId { self.id }

    pub fn game_id(&self) -> GameId { self.game_id }

    pub fn role(&self) -> Role { self.role }

    /// Next message addressed to this subscriber. Messages excluding it are
    /// skipped; a lagging receiver logs the drop and carries on.
    pub async fn recv(&mut self) -> Result<ServerMessage, SessionError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.exclude == Some(self.id) => continue,
                Ok(event) => return Ok(event.message),
                Err(RecvError::Lagged(count)) => {
                    warn!(game = %self.game_id, lagged_count = count, "subscriber lagged, {} messages dropped", count);
                }
                Err(RecvError::Closed) => return Err(SessionError::Closed),
            }
        }
    }

    /// Non-blocking variant of [`Subscription::recv`]; `None` when nothing is pending.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.exclude == Some(self.id) => continue,
                Ok(event) => return Some(event.message),
                Err(TryRecvError::Lagged(count)) => {
                    warn!(game = %self.game_id, lagged_count = count, "subscriber lagged, {} messages dropped", count);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

// --- Manager ---

#[derive(Debug)]
struct LiveGame {
    game: Game,
    seats: BTreeMap<Color, SubscriberId>,
    subscribers: BTreeSet<SubscriberId>,
}

impl LiveGame {
    fn require_member(&self, sub: &Subscription) -> Result<(), SessionError> {
        if self.subscribers.contains(&sub.id) { Ok(()) } else { Err(SessionError::Departed) }
    }

    fn require_seat(&self, sub: &Subscription, color: Color) -> Result<(), SessionError> {
        if self.seats.get(&color) == Some(&sub.id) { Ok(()) } else { Err(SessionError::NotSeated) }
    }
}

#[derive(Debug)]
struct GameSession {
    state: Mutex<LiveGame>,
    events: broadcast::Sender<Broadcast>,
}

impl GameSession {
    fn new(game: Game, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        let live = LiveGame { game, seats: BTreeMap::new(), subscribers: BTreeSet::new() };
        GameSession { state: Mutex::new(live), events }
    }

    fn publish(&self, exclude: Option<SubscriberId>, message: ServerMessage) {
        // No receivers is fine: nobody is watching.
        let _ = self.events.send(Broadcast { exclude, message });
    }
}

/// Owns every live game and routes commands to them.
pub struct SessionManager<S: GameStore> {
    store: S,
    games: DashMap<GameId, Arc<GameSession>>,
    next_subscriber: AtomicU64,
    capacity: usize,
}

impl<S: GameStore> SessionManager<S> {
    /// `capacity` bounds each game's broadcast buffer.
    pub fn new(store: S, capacity: usize) -> Self {
        SessionManager { store, games: DashMap::new(), next_subscriber: AtomicU64::new(1), capacity: capacity.max(1) }
    }

    pub fn store(&self) -> &S { &self.store }

    pub fn live_games(&self) -> usize { self.games.len() }

    /// Starts a fresh game under an unused random id and persists it.
    pub fn create_game(&self) -> Result<GameId, SessionError> {
        self.host(Game::new())
    }

    /// Hosts a previously exported game under a new id.
    pub fn import_game(&self, snapshot: &GameSnapshot) -> Result<GameId, SessionError> {
        let game = Game::from_snapshot(snapshot)?;
        self.host(game)
    }

    fn host(&self, game: Game) -> Result<GameId, SessionError> {
        let id = loop {
            let candidate = GameId(rand::random::<u32>());
            if self.games.contains_key(&candidate) { continue; }
            match self.store.load(candidate) {
                Err(StoreError::NotFound(_)) => break candidate,
                Ok(_) => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.store.save(id, &game.snapshot())?;
        self.games.insert(id, Arc::new(GameSession::new(game, self.capacity)));
        info!(game = %id, "game hosted");
        Ok(id)
    }

    /// Live session for `id`, resumed from the store if it is not in memory.
    fn session(&self, id: GameId) -> Result<Arc<GameSession>, SessionError> {
        if let Some(session) = self.games.get(&id) {
            return Ok(Arc::clone(session.value()));
        }
        let snapshot = match self.store.load(id) {
            Ok(snapshot) => snapshot,
            Err(StoreError::NotFound(_)) => return Err(SessionError::UnknownGame(id)),
            Err(e) => return Err(e.into()),
        };
        let game = Game::from_snapshot(&snapshot)?;
        debug!(game = %id, "game resumed from store");
        let session = self.games.entry(id).or_insert_with(|| Arc::new(GameSession::new(game, self.capacity)));
        Ok(Arc::clone(session.value()))
    }

    /// Session a subscription joined. Never resumes from the store: once the
    /// game has been evicted the subscription is gone with it.
    fn joined_session(&self, sub: &Subscription) -> Result<Arc<GameSession>, SessionError> {
        self.games.get(&sub.game_id).map(|session| Arc::clone(session.value())).ok_or(SessionError::Departed)
    }

    fn is_registered(&self, id: GameId, session: &Arc<GameSession>) -> bool {
        self.games.get(&id).is_some_and(|current| Arc::ptr_eq(current.value(), session))
    }

    /// Joins `id` as a player or observer. The others are told who joined.
    pub async fn connect(&self, id: GameId, role: Role) -> Result<Subscription, SessionError> {
        loop {
            let session = self.session(id)?;
            let mut live = session.state.lock().await;
            // The last subscriber may have evicted this session while we waited.
            if !self.is_registered(id, &session) {
                debug!(game = %id, "session evicted while joining, retrying");
                continue;
            }
            let subscriber = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));
            if let Role::Player(color) = role {
                if live.seats.contains_key(&color) {
                    return Err(SessionError::SeatTaken(color));
                }
                live.seats.insert(color, subscriber);
            }
            live.subscribers.insert(subscriber);
            let receiver = session.events.subscribe();
            let joined = format!("{} joined the game", role);
            session.publish(Some(subscriber), ServerMessage::Notification { message: joined });
            info!(game = %id, ?role, "subscriber connected");
            return Ok(Subscription { id: subscriber, game_id: id, role, receiver });
        }
    }

    /// Current board for the requester only.
    pub async fn load(&self, sub: &Subscription) -> Result<ServerMessage, SessionError> {
        let session = self.joined_session(sub)?;
        let live = session.state.lock().await;
        live.require_member(sub)?;
        Ok(ServerMessage::load_game(&live.game))
    }

    /// Full state of `id`, e.g. to learn whose turn it is.
    pub async fn snapshot(&self, id: GameId) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id)?;
        let live = session.state.lock().await;
        Ok(live.game.snapshot())
    }

    /// Legal moves from `pos`. Read-only, sent to the requester only.
    pub async fn highlight(&self, sub: &Subscription, pos: Position) -> Result<ServerMessage, SessionError> {
        let session = self.joined_session(sub)?;
        let live = session.state.lock().await;
        live.require_member(sub)?;
        let moves = live.game.valid_moves(pos);
        Ok(ServerMessage::LoadHighlight {
            board: live.game.board().layout().clone(),
            destinations: moves.iter().map(|mv| mv.to).collect(),
            moves,
        })
    }

    /// Applies, persists and broadcasts one move. The board goes to every
    /// subscriber, the move description to everyone but the mover. Nothing is
    /// committed unless the snapshot was saved.
    pub async fn submit_move(&self, sub: &Subscription, mv: Move) -> Result<ServerMessage, SessionError> {
        let color = player_color(sub, "move")?;
        let session = self.joined_session(sub)?;
        let mut live = session.state.lock().await;
        live.require_seat(sub, color)?;
        if live.game.is_game_over() {
            debug!(game = %sub.game_id, %mv, "move after game over rejected");
            return Err(MoveError::IllegalMove.into());
        }
        if live.game.turn() != color {
            return Err(SessionError::NotYourTurn);
        }

        let mut next = live.game.clone();
        let report = next.apply_move(&mv)?;
        self.store.save(sub.game_id, &next.snapshot())?;
        live.game = next;

        let board = ServerMessage::load_game(&live.game);
        session.publish(None, board.clone());
        session.publish(Some(sub.id), ServerMessage::Notification { message: describe_move(&report) });
        debug!(game = %sub.game_id, %mv, status = ?report.status, "move broadcast");
        Ok(board)
    }

    /// The requester's side concedes. Everyone else is notified.
    pub async fn resign(&self, sub: &Subscription) -> Result<ServerMessage, SessionError> {
        let color = player_color(sub, "resign")?;
        let session = self.joined_session(sub)?;
        let mut live = session.state.lock().await;
        live.require_seat(sub, color)?;
        if live.game.is_game_over() {
            debug!(game = %sub.game_id, "resignation after game over rejected");
            return Err(MoveError::IllegalMove.into());
        }

        let mut next = live.game.clone();
        let status = next.resign(color)?;
        self.store.save(sub.game_id, &next.snapshot())?;
        live.game = next;

        let notice = ServerMessage::Notification { message: status.to_string() };
        session.publish(Some(sub.id), notice.clone());
        Ok(notice)
    }

    /// Gives up the requester's seat without ending the game. Every later
    /// operation on `sub` fails with [`SessionError::Departed`]. The game is
    /// dropped from memory once nobody is subscribed; it stays in the store.
    pub async fn leave(&self, sub: &Subscription) -> Result<ServerMessage, SessionError> {
        let session = self.joined_session(sub)?;
        let mut live = session.state.lock().await;
        live.require_member(sub)?;
        live.subscribers.remove(&sub.id);
        if let Role::Player(color) = sub.role {
            if live.seats.get(&color) == Some(&sub.id) {
                live.seats.remove(&color);
            }
        }
        let notice = ServerMessage::Notification { message: format!("{} left the game", sub.role) };
        session.publish(Some(sub.id), notice.clone());
        info!(game = %sub.game_id, role = ?sub.role, "subscriber left");

        if live.subscribers.is_empty()
            && self.games.remove_if(&sub.game_id, |_, current| Arc::ptr_eq(current, &session)).is_some()
        {
            debug!(game = %sub.game_id, "game evicted from memory");
        }
        Ok(notice)
    }

    /// Decodes and dispatches one JSON command. Failures become an `ERROR`
    /// reply for the sender; nothing is broadcast for them.
    pub async fn handle_json(&self, sub: &Subscription, json: &str) -> ServerMessage {
        let outcome = match serde_json::from_str::<ClientCommand>(json) {
            Ok(command) => self.dispatch(sub, command).await,
            Err(e) => Err(SessionError::BadCommand(e.to_string())),
        };
        outcome.unwrap_or_else(|err| {
            debug!(game = %sub.game_id, error = %err, "command failed");
            ServerMessage::error(&err)
        })
    }

    pub async fn dispatch(&self, sub: &Subscription, command: ClientCommand) -> Result<ServerMessage, SessionError> {
        if command.game_id != sub.game_id {
            return Err(SessionError::BadCommand(format!("subscribed to game {}, not {}", sub.game_id, command.game_id)));
        }
        match command.command_type {
            CommandType::Connect | CommandType::Load => self.load(sub).await,
            CommandType::MakeMove => {
                let mv = command.mv.ok_or_else(|| SessionError::BadCommand("MAKE_MOVE needs a move".into()))?;
                self.submit_move(sub, mv).await
            }
            CommandType::Highlight => {
                let pos = command.position.ok_or_else(|| SessionError::BadCommand("HIGHLIGHT needs a position".into()))?;
                self.highlight(sub, pos).await
            }
            CommandType::Resign => self.resign(sub).await,
            CommandType::Leave => self.leave(sub).await,
        }
    }
}

fn player_color(sub: &Subscription, action: &'static str) -> Result<Color, SessionError> {
    match sub.role {
        Role::Player(color) => Ok(color),
        Role::Observer => Err(SessionError::Observer(action)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn mv(s: &str) -> Move { s.parse().unwrap() }

    #[test]
    fn command_json_shape() {
        let json = r#"{"commandType":"MAKE_MOVE","gameId":12,"move":{"from":"e2","to":"e4","promotion":null}}"#;
        let command: ClientCommand = serde_json::from_str(json).unwrap();
        assert_eq!(command.command_type, CommandType::MakeMove);
        assert_eq!(command.game_id, GameId::new(12));
        assert_eq!(command.mv, Some(mv("e2e4")));
        assert_eq!(command.position, None);
    }

    #[test]
    fn load_game_message_omits_absent_state() {
        let message = ServerMessage::load_game(&Game::new());
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["serverMessageType"], "LOAD_GAME");
        assert!(json.get("message").is_none());
        assert_eq!(json["board"]["e1"]["kind"], "KING");
    }

    #[test]
    fn only_three_states_carry_text() {
        assert_eq!(state_message(GameStatus::Check(Color::White)).as_deref(), Some("Check"));
        assert_eq!(state_message(GameStatus::Checkmate(Color::Black)).as_deref(), Some("Checkmate"));
        assert_eq!(state_message(GameStatus::Stalemate).as_deref(), Some("Stalemate"));
        assert_eq!(state_message(GameStatus::InProgress), None);
        assert_eq!(state_message(GameStatus::Resigned(Color::White)), None);
    }

    #[tokio::test]
    async fn seats_are_exclusive() {
        let manager = SessionManager::new(MemoryStore::new(), 16);
        let id = manager.create_game().unwrap();
        let _white = manager.connect(id, Role::Player(Color::White)).await.unwrap();
        assert!(matches!(
            manager.connect(id, Role::Player(Color::White)).await,
            Err(SessionError::SeatTaken(Color::White))
        ));
        assert!(manager.connect(id, Role::Observer).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_game_is_reported() {
        let manager = SessionManager::new(MemoryStore::new(), 16);
        assert!(matches!(
            manager.connect(GameId::new(99), Role::Observer).await,
            Err(SessionError::UnknownGame(_))
        ));
    }

    #[tokio::test]
    async fn subscriber_does_not_see_its_own_join_notice() {
        let manager = SessionManager::new(MemoryStore::new(), 16);
        let id = manager.create_game().unwrap();
        let mut white = manager.connect(id, Role::Player(Color::White)).await.unwrap();
        let _black = manager.connect(id, Role::Player(Color::Black)).await.unwrap();
        match white.try_recv() {
            Some(ServerMessage::Notification { message }) => assert!(message.contains("Black")),
            other => panic!("expected a join notice, got {:?}", other),
        }
        assert_eq!(white.try_recv(), None);
    }
}
