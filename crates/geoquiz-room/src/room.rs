//! The per-room actor.
//!
//! Each room is a single task owning its [`GameState`]. Everything else
//! talks to it through a [`RoomHandle`], which sends commands over a
//! bounded mailbox and awaits a reply on a oneshot channel. The actor's
//! `select!` loop also drives the two time-based events a room has: the
//! once-per-second countdown tick and the pending round transition
//! (round gap, answer grace, completion delay). Dropping the actor
//! cancels both — there are no detached timer tasks to race against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use geoquiz_countries::matching::fuzzy_match;
use geoquiz_countries::CountryProvider;
use geoquiz_protocol::{
    ClientMessage, GameMode, GameState, GameStatus, MapMode, Question, QuestionType, RoomType,
    ServerMessage,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::account::{self, AccountStore};
use crate::cache::{RoomSnapshot, RoomStateCache};
use crate::client::{ClientId, ConnectedClient, JoinRequest};
use crate::config::{RoomConfig, RoundEndPolicy};
use crate::hub::Hub;
use crate::RoomError;

/// Commands queued ahead of this are back-pressure on the callers, not
/// dropped traffic.
const ROOM_MAILBOX_SIZE: usize = 64;

/// Maximum Levenshtein distance for a timed answer to count as correct.
const ANSWER_MAX_DISTANCE: usize = 2;

/// Why a command was not applied. These are expected traffic, not
/// errors; the actor logs them at debug level and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Another live connection already holds this session id.
    SessionCollision { username: String },
    /// The sender is not attached to this room.
    UnknownClient,
    /// Only the room owner may do this.
    NotOwner,
    /// The game is not in a status where this applies.
    WrongStatus,
    /// Too few players attached to start.
    NotEnoughPlayers,
    /// No round is currently accepting answers.
    RoundInactive,
    /// This player already answered the current round.
    AlreadyAnswered,
    /// Free text that resolves to no country in the table.
    UnknownCountry,
    /// The country is already painted by someone.
    AlreadyPainted,
    /// The answer doesn't match the current question.
    Incorrect,
    /// Another player holds that color.
    ColorTaken,
    /// A round count of zero.
    BadRounds,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionCollision { username } => {
                write!(f, "session already live as {username}")
            }
            Self::UnknownClient => write!(f, "client not attached"),
            Self::NotOwner => write!(f, "not the room owner"),
            Self::WrongStatus => write!(f, "wrong game status"),
            Self::NotEnoughPlayers => write!(f, "not enough players"),
            Self::RoundInactive => write!(f, "no active round"),
            Self::AlreadyAnswered => write!(f, "already answered this round"),
            Self::UnknownCountry => write!(f, "unknown country"),
            Self::AlreadyPainted => write!(f, "country already painted"),
            Self::Incorrect => write!(f, "incorrect answer"),
            Self::ColorTaken => write!(f, "color already taken"),
            Self::BadRounds => write!(f, "invalid round count"),
        }
    }
}

/// Result of applying one command to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Rejected(RejectReason),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Room facts for lobby listings and diagnostics.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: String,
    pub status: GameStatus,
    pub game_mode: GameMode,
    pub room_type: RoomType,
    pub owner: String,
    pub players: Vec<String>,
    pub max_players: usize,
}

enum RoomCommand {
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Leave {
        id: ClientId,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Message {
        id: ClientId,
        message: ClientMessage,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Restore {
        snapshot: RoomSnapshot,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    State {
        reply: oneshot::Sender<GameState>,
    },
}

/// Cloneable address of a room actor.
#[derive(Clone)]
pub struct RoomHandle {
    code: String,
    sender: mpsc::Sender<RoomCommand>,
    torn_down: Arc<AtomicBool>,
}

impl RoomHandle {
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Whether the room has started (or finished) tearing down. A torn
    /// down room never accepts new joins.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        rx.await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    pub async fn join(&self, request: JoinRequest) -> Result<CommandOutcome, RoomError> {
        self.request(|reply| RoomCommand::Join { request, reply })
            .await
    }

    pub async fn leave(&self, id: ClientId) -> Result<CommandOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { id, reply }).await
    }

    pub async fn message(
        &self,
        id: ClientId,
        message: ClientMessage,
    ) -> Result<CommandOutcome, RoomError> {
        self.request(|reply| RoomCommand::Message { id, message, reply })
            .await
    }

    pub async fn restore(&self, snapshot: RoomSnapshot) -> Result<CommandOutcome, RoomError> {
        self.request(|reply| RoomCommand::Restore { snapshot, reply })
            .await
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    /// Current state snapshot, mainly for diagnostics and tests.
    pub async fn state(&self) -> Result<GameState, RoomError> {
        self.request(|reply| RoomCommand::State { reply }).await
    }
}

pub(crate) fn spawn_room<A: AccountStore>(
    code: String,
    config: RoomConfig,
    countries: Arc<CountryProvider>,
    cache: Arc<RoomStateCache>,
    accounts: Arc<A>,
    hub: Weak<Hub<A>>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(ROOM_MAILBOX_SIZE);
    let torn_down = Arc::new(AtomicBool::new(false));

    let round_secs = config.default_round_secs;
    let actor = RoomActor {
        code: code.clone(),
        config,
        state: GameState::new(),
        owner: String::new(),
        round_secs,
        settings_applied: false,
        clients: HashMap::new(),
        inactive_rounds: 0,
        timer: None,
        pending: None,
        countries,
        cache,
        accounts,
        hub,
        torn_down: Arc::clone(&torn_down),
        rx,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        code,
        sender: tx,
        torn_down,
    }
}

enum Flow {
    Continue,
    Stop,
}

struct Countdown {
    next_tick: Instant,
    remaining: u32,
}

enum PendingAction {
    EndRound,
    StartRound,
    Complete,
}

struct Pending {
    due: Instant,
    action: PendingAction,
}

struct RoomActor<A: AccountStore> {
    code: String,
    config: RoomConfig,
    state: GameState,
    owner: String,
    /// Round length for this room, fixed by the first joiner.
    round_secs: u32,
    /// First joiner's settings win; later joins can't reconfigure.
    settings_applied: bool,
    clients: HashMap<ClientId, ConnectedClient>,
    /// Consecutive round-ends with nobody attached.
    inactive_rounds: u32,
    timer: Option<Countdown>,
    pending: Option<Pending>,
    countries: Arc<CountryProvider>,
    cache: Arc<RoomStateCache>,
    accounts: Arc<A>,
    hub: Weak<Hub<A>>,
    torn_down: Arc<AtomicBool>,
    rx: mpsc::Receiver<RoomCommand>,
}

async fn maybe_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl<A: AccountStore> RoomActor<A> {
    async fn run(mut self) {
        tracing::info!(room = %self.code, "room opened");
        loop {
            let tick_at = self.timer.as_ref().map(|t| t.next_tick);
            let due_at = self.pending.as_ref().map(|p| p.due);
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => {
                        if let Flow::Stop = self.handle_command(cmd).await {
                            break;
                        }
                    }
                    // Every handle dropped; nobody can ever reach us.
                    None => {
                        self.teardown(None).await;
                        break;
                    }
                },
                _ = maybe_sleep(tick_at), if tick_at.is_some() => {
                    if let Flow::Stop = self.on_tick().await {
                        break;
                    }
                }
                _ = maybe_sleep(due_at), if due_at.is_some() => {
                    if let Flow::Stop = self.on_due().await {
                        break;
                    }
                }
            }
        }
        tracing::info!(room = %self.code, "room closed");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::Join { request, reply } => {
                let outcome = self.join(request).await;
                let _ = reply.send(outcome);
                Flow::Continue
            }
            RoomCommand::Leave { id, reply } => {
                let outcome = self.leave(id).await;
                let _ = reply.send(outcome);
                Flow::Continue
            }
            RoomCommand::Message { id, message, reply } => self.dispatch(id, message, reply).await,
            RoomCommand::Restore { snapshot, reply } => {
                let outcome = self.restore(snapshot);
                let _ = reply.send(outcome);
                Flow::Continue
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
                Flow::Continue
            }
            RoomCommand::State { reply } => {
                let _ = reply.send(self.state.clone());
                Flow::Continue
            }
        }
    }

    // -- membership ---------------------------------------------------------

    async fn join(&mut self, request: JoinRequest) -> CommandOutcome {
        self.inactive_rounds = 0;

        if !request.session_id.is_empty() {
            let existing = self
                .clients
                .values()
                .find(|c| c.session_id == request.session_id)
                .map(|c| (c.id, c.username.clone(), c.sender.is_closed()));
            if let Some((stale_id, username, closed)) = existing {
                if !closed {
                    tracing::info!(
                        room = %self.code,
                        %username,
                        "rejected join: session already live"
                    );
                    return CommandOutcome::Rejected(RejectReason::SessionCollision { username });
                }
                // The old connection's write pump is gone; this is a
                // reconnect, not a collision.
                self.clients.remove(&stale_id);
            }
        }

        if self.owner.is_empty() {
            self.owner = request.username.clone();
            self.state.owner = self.owner.clone();
        }

        if !self.settings_applied {
            self.apply_settings(&request);
            self.settings_applied = true;
        }

        self.state
            .scores
            .entry(request.username.clone())
            .or_insert(0);

        let username = request.username.clone();
        let sender = request.sender.clone();
        self.clients.insert(
            request.id,
            ConnectedClient {
                id: request.id,
                username: username.clone(),
                session_id: request.session_id,
                avatar_url: request.avatar_url,
                sender,
            },
        );

        // A late joiner's view has to catch up with the round in flight.
        if self.state.status.is_in_progress() && self.state.question.is_some() {
            if let Some(client) = self.clients.get(&request.id) {
                let _ = client
                    .sender
                    .try_send(ServerMessage::RoundStarted(self.state.clone()));
            }
        }

        self.save_snapshot().await;
        let update = self.room_update();
        self.broadcast(&update);
        self.broadcast(&ServerMessage::PlayerJoined {
            player_name: username.clone(),
            current_count: self.clients.len(),
        });
        tracing::info!(room = %self.code, %username, players = self.clients.len(), "player joined");
        CommandOutcome::Applied
    }

    fn apply_settings(&mut self, request: &JoinRequest) {
        let settings = &request.settings;
        if let Some(mode) = settings.game_mode {
            self.state.game_mode = mode;
        }
        if let Some(room_type) = settings.room_type {
            self.state.room_type = room_type;
        }
        if let Some(rounds) = settings.total_rounds {
            if rounds > 0 {
                self.state.total_rounds = rounds;
            }
        }
        if let Some(secs) = settings.round_secs {
            self.round_secs = self.config.clamp_round_secs(secs);
        }
    }

    async fn leave(&mut self, id: ClientId) -> CommandOutcome {
        let Some(client) = self.clients.remove(&id) else {
            return CommandOutcome::Rejected(RejectReason::UnknownClient);
        };
        let username = client.username;
        self.transfer_ownership_from(&username);

        self.save_snapshot().await;
        self.broadcast(&ServerMessage::PlayerLeft {
            player_name: username.clone(),
            current_count: self.clients.len(),
        });
        let update = self.room_update();
        self.broadcast(&update);
        tracing::info!(room = %self.code, %username, players = self.clients.len(), "player left");
        CommandOutcome::Applied
    }

    /// If `username` owned the room, hands ownership to any remaining
    /// client (or clears it when the room is empty, so the next joiner
    /// becomes owner).
    fn transfer_ownership_from(&mut self, username: &str) {
        if self.owner != username {
            return;
        }
        self.owner = self
            .clients
            .values()
            .next()
            .map(|c| c.username.clone())
            .unwrap_or_default();
        self.state.owner = self.owner.clone();
        if !self.owner.is_empty() {
            tracing::info!(room = %self.code, new_owner = %self.owner, "ownership transferred");
        }
    }

    fn restore(&mut self, snapshot: RoomSnapshot) -> CommandOutcome {
        // Only a room nobody is attached to can be rebuilt; restoring
        // over a live game would clobber it.
        if !self.clients.is_empty() {
            return CommandOutcome::Rejected(RejectReason::WrongStatus);
        }
        self.state = snapshot.game_state;
        self.owner = snapshot.owner;
        self.state.owner = self.owner.clone();
        // No live timers survive a restore.
        self.state.round_active = false;
        self.timer = None;
        self.pending = None;
        self.settings_applied = true;
        tracing::info!(room = %self.code, "state restored from cache");
        CommandOutcome::Applied
    }

    // -- message dispatch ---------------------------------------------------

    async fn dispatch(
        &mut self,
        id: ClientId,
        message: ClientMessage,
        reply: oneshot::Sender<CommandOutcome>,
    ) -> Flow {
        let Some(username) = self.clients.get(&id).map(|c| c.username.clone()) else {
            let _ = reply.send(CommandOutcome::Rejected(RejectReason::UnknownClient));
            return Flow::Continue;
        };

        let (outcome, flow) = match message {
            ClientMessage::StartGame => (self.start_game(&username).await, Flow::Continue),
            ClientMessage::SubmitAnswer {
                answer,
                response_time_ms,
            } => (
                self.submit_answer(&username, &answer, response_time_ms).await,
                Flow::Continue,
            ),
            ClientMessage::ChatMessage { message } => (self.chat(&username, message), Flow::Continue),
            ClientMessage::SetMapMode { map_mode } => {
                (self.set_map_mode(&username, map_mode).await, Flow::Continue)
            }
            ClientMessage::SetRounds { rounds } => {
                (self.set_rounds(&username, rounds).await, Flow::Continue)
            }
            ClientMessage::ColorSelected { color } => {
                (self.color_selected(id, &username, color).await, Flow::Continue)
            }
            ClientMessage::RestartGame => (self.restart_game(&username).await, Flow::Continue),
            ClientMessage::CloseRoom => {
                if self.owner != username {
                    (CommandOutcome::Rejected(RejectReason::NotOwner), Flow::Continue)
                } else {
                    let _ = reply.send(CommandOutcome::Applied);
                    self.teardown(Some("Room closed by the host")).await;
                    return Flow::Stop;
                }
            }
        };

        if let CommandOutcome::Rejected(reason) = &outcome {
            tracing::debug!(room = %self.code, %username, %reason, "command rejected");
        }
        let _ = reply.send(outcome);
        flow
    }

    // -- game flow ----------------------------------------------------------

    async fn start_game(&mut self, username: &str) -> CommandOutcome {
        if self.owner != username {
            return CommandOutcome::Rejected(RejectReason::NotOwner);
        }
        if !self.state.status.is_waiting() {
            return CommandOutcome::Rejected(RejectReason::WrongStatus);
        }
        if self.clients.len() < self.state.room_type.min_players() {
            return CommandOutcome::Rejected(RejectReason::NotEnoughPlayers);
        }

        self.state.status = GameStatus::InProgress;
        self.state.current_round = 1;
        self.inactive_rounds = 0;
        tracing::info!(
            room = %self.code,
            mode = ?self.state.game_mode,
            rounds = self.state.total_rounds,
            "game started"
        );

        if self.state.is_free_paint() {
            // No rounds, no timer; the session runs until restart/close.
            self.broadcast(&ServerMessage::GameStarted(self.state.clone()));
        } else {
            self.start_round();
        }
        self.save_snapshot().await;
        CommandOutcome::Applied
    }

    fn start_round(&mut self) {
        if self.state.used_countries.len() >= self.countries.drawable_len() {
            // Table exhausted; allow repeats rather than spin forever.
            self.state.used_countries.clear();
        }
        let (code, name) = loop {
            let (code, name) = self.countries.random_country();
            if !self.state.used_countries.contains(code) {
                break (code.to_string(), name.to_string());
            }
        };
        self.state.used_countries.insert(code.clone());

        let question_type = match self.state.game_mode {
            GameMode::Flag => QuestionType::FlagGuess,
            GameMode::WorldMap => QuestionType::MapGuess,
        };
        self.state.question = Some(Question {
            question_type,
            flag_code: code.clone(),
            country_name: name,
            country_code: code.clone(),
            time_limit: self.round_secs,
        });
        self.state.current_country = if self.state.paints_map() {
            Some(code)
        } else {
            None
        };
        self.state.time_remaining = self.round_secs;
        self.state.answered.clear();
        self.state.round_active = true;

        self.broadcast(&ServerMessage::RoundStarted(self.state.clone()));
        self.timer = Some(Countdown {
            next_tick: Instant::now() + Duration::from_secs(1),
            remaining: self.round_secs,
        });
    }

    async fn on_tick(&mut self) -> Flow {
        let expired = {
            let Some(timer) = self.timer.as_mut() else {
                return Flow::Continue;
            };
            if !self.state.round_active {
                self.timer = None;
                return Flow::Continue;
            }
            timer.remaining = timer.remaining.saturating_sub(1);
            timer.next_tick += Duration::from_secs(1);
            self.state.time_remaining = timer.remaining;
            timer.remaining == 0
        };

        self.broadcast(&ServerMessage::TimerUpdate {
            time_remaining: self.state.time_remaining,
        });

        if expired {
            self.timer = None;
            self.state.round_active = false;
            return self.end_round().await;
        }
        Flow::Continue
    }

    async fn on_due(&mut self) -> Flow {
        let Some(pending) = self.pending.take() else {
            return Flow::Continue;
        };
        match pending.action {
            PendingAction::EndRound => self.end_round().await,
            PendingAction::StartRound => {
                if self.state.status.is_in_progress() {
                    self.start_round();
                }
                Flow::Continue
            }
            PendingAction::Complete => {
                self.broadcast(&ServerMessage::GameCompleted(self.state.clone()));
                Flow::Continue
            }
        }
    }

    async fn end_round(&mut self) -> Flow {
        self.timer = None;
        self.state.round_active = false;
        let correct_answer = self
            .state
            .question
            .as_ref()
            .map(|q| q.country_name.clone())
            .unwrap_or_default();

        if self.clients.is_empty() {
            self.inactive_rounds += 1;
            tracing::warn!(
                room = %self.code,
                inactive = self.inactive_rounds,
                "round ended with no clients attached"
            );
            if self.inactive_rounds >= self.config.inactive_round_limit {
                self.teardown(None).await;
                return Flow::Stop;
            }
        } else {
            self.inactive_rounds = 0;
        }

        let is_last = self.state.current_round >= self.state.total_rounds;
        if is_last {
            self.state.status = GameStatus::Completed;
            self.state.question = None;
            self.state.current_country = None;
            self.state.time_remaining = 0;
            self.broadcast(&ServerMessage::RoundEnded {
                scores: self.state.scores.clone(),
                current_round: self.state.current_round,
                correct_answer,
                is_last_round: true,
            });
            self.record_game_result();
            self.save_snapshot().await;
            self.pending = Some(Pending {
                due: Instant::now() + self.config.completion_gap,
                action: PendingAction::Complete,
            });
            tracing::info!(room = %self.code, "game completed");
        } else {
            self.state.current_round += 1;
            self.state.current_country = None;
            self.broadcast(&ServerMessage::RoundEnded {
                scores: self.state.scores.clone(),
                current_round: self.state.current_round,
                correct_answer,
                is_last_round: false,
            });
            self.save_snapshot().await;
            self.pending = Some(Pending {
                due: Instant::now() + self.config.round_gap,
                action: PendingAction::StartRound,
            });
        }
        Flow::Continue
    }

    /// Fire-and-forget persistence of the final scores.
    fn record_game_result(&self) {
        let scores = self.state.scores.clone();
        let winners = account::winners(&scores);
        let accounts = Arc::clone(&self.accounts);
        let room = self.code.clone();
        tokio::spawn(async move {
            if let Err(error) = accounts.apply_game_result(&scores, &winners).await {
                tracing::warn!(%room, %error, "failed to record game result");
            }
        });
    }

    // -- answers ------------------------------------------------------------

    async fn submit_answer(
        &mut self,
        username: &str,
        answer: &str,
        response_time_ms: u64,
    ) -> CommandOutcome {
        if self.state.is_free_paint() {
            return self.free_paint(username, answer).await;
        }

        if !self.state.round_active {
            return CommandOutcome::Rejected(RejectReason::RoundInactive);
        }
        if self.state.answered.contains(username) {
            return CommandOutcome::Rejected(RejectReason::AlreadyAnswered);
        }
        let Some(question) = self.state.question.clone() else {
            return CommandOutcome::Rejected(RejectReason::RoundInactive);
        };

        if !fuzzy_match(answer, &question.country_name, ANSWER_MAX_DISTANCE) {
            // Wrong guesses stay private; the player can keep trying.
            return CommandOutcome::Rejected(RejectReason::Incorrect);
        }

        let score = score_for(response_time_ms);
        self.state.answered.insert(username.to_string());
        *self.state.scores.entry(username.to_string()).or_insert(0) += score;

        let paints = self.state.paints_map();
        if paints {
            self.state
                .painted_countries
                .insert(question.country_code.clone(), username.to_string());
        }

        self.broadcast(&ServerMessage::AnswerSubmitted {
            player: username.to_string(),
            is_correct: true,
            country_name: question.country_name.clone(),
            country_code: Some(question.country_code.clone()),
        });
        if paints {
            self.broadcast(&ServerMessage::CountryPainted {
                country_code: question.country_code.clone(),
                country_name: question.country_name.clone(),
                player: username.to_string(),
                painted_countries: self.state.painted_countries.clone(),
                player_colors: self.state.player_colors.clone(),
            });
        }
        self.broadcast(&ServerMessage::ScoreUpdate {
            scores: self.state.scores.clone(),
        });
        tracing::debug!(room = %self.code, %username, score, "correct answer");

        let round_over = match self.config.round_end_policy {
            RoundEndPolicy::FirstCorrectEnds => true,
            RoundEndPolicy::AllAnswered => self
                .clients
                .values()
                .all(|c| self.state.answered.contains(&c.username)),
        };
        if round_over {
            // Deactivate now; broadcast the round end after a short
            // grace so in-flight answers get their rejections first.
            self.state.round_active = false;
            self.timer = None;
            self.pending = Some(Pending {
                due: Instant::now() + self.config.answer_grace,
                action: PendingAction::EndRound,
            });
        }
        CommandOutcome::Applied
    }

    async fn free_paint(&mut self, username: &str, answer: &str) -> CommandOutcome {
        if !self.state.status.is_in_progress() {
            return CommandOutcome::Rejected(RejectReason::WrongStatus);
        }
        let Some((code, name)) = self
            .countries
            .find_by_display_name(answer)
            .map(|(c, n)| (c.to_string(), n.to_string()))
        else {
            // Not a country name at all; stays private.
            return CommandOutcome::Rejected(RejectReason::UnknownCountry);
        };

        if self.state.painted_countries.contains_key(&code) {
            // Valid country, but someone got there first — everyone
            // sees the failed claim.
            self.broadcast(&ServerMessage::AnswerSubmitted {
                player: username.to_string(),
                is_correct: false,
                country_name: name,
                country_code: Some(code),
            });
            return CommandOutcome::Rejected(RejectReason::AlreadyPainted);
        }

        self.state
            .painted_countries
            .insert(code.clone(), username.to_string());
        *self.state.scores.entry(username.to_string()).or_insert(0) += 1;

        self.broadcast(&ServerMessage::AnswerSubmitted {
            player: username.to_string(),
            is_correct: true,
            country_name: name.clone(),
            country_code: Some(code.clone()),
        });
        self.broadcast(&ServerMessage::CountryPainted {
            country_code: code,
            country_name: name,
            player: username.to_string(),
            painted_countries: self.state.painted_countries.clone(),
            player_colors: self.state.player_colors.clone(),
        });
        self.broadcast(&ServerMessage::ScoreUpdate {
            scores: self.state.scores.clone(),
        });
        self.save_snapshot().await;
        CommandOutcome::Applied
    }

    // -- configuration and chat ---------------------------------------------

    fn chat(&mut self, username: &str, message: String) -> CommandOutcome {
        self.broadcast(&ServerMessage::ChatMessage {
            player_name: username.to_string(),
            message,
            timestamp: Utc::now().to_rfc3339(),
        });
        CommandOutcome::Applied
    }

    async fn set_map_mode(&mut self, username: &str, map_mode: MapMode) -> CommandOutcome {
        if self.owner != username {
            return CommandOutcome::Rejected(RejectReason::NotOwner);
        }
        self.state.map_mode = map_mode;
        self.save_snapshot().await;
        let update = self.room_update();
        self.broadcast(&update);
        CommandOutcome::Applied
    }

    async fn set_rounds(&mut self, username: &str, rounds: u32) -> CommandOutcome {
        if self.owner != username {
            return CommandOutcome::Rejected(RejectReason::NotOwner);
        }
        if rounds == 0 {
            return CommandOutcome::Rejected(RejectReason::BadRounds);
        }
        self.state.total_rounds = rounds;
        self.save_snapshot().await;
        let update = self.room_update();
        self.broadcast(&update);
        CommandOutcome::Applied
    }

    async fn color_selected(
        &mut self,
        id: ClientId,
        username: &str,
        color: String,
    ) -> CommandOutcome {
        let taken = self
            .state
            .player_colors
            .iter()
            .any(|(holder, held)| held == &color && holder != username);
        if taken {
            if let Some(client) = self.clients.get(&id) {
                let _ = client.sender.try_send(ServerMessage::ColorRejected {
                    error: "Color already taken".to_string(),
                    color,
                });
            }
            return CommandOutcome::Rejected(RejectReason::ColorTaken);
        }
        self.state
            .player_colors
            .insert(username.to_string(), color);
        self.save_snapshot().await;
        let update = self.room_update();
        self.broadcast(&update);
        CommandOutcome::Applied
    }

    async fn restart_game(&mut self, username: &str) -> CommandOutcome {
        if self.owner != username {
            return CommandOutcome::Rejected(RejectReason::NotOwner);
        }

        self.timer = None;
        self.pending = None;
        self.inactive_rounds = 0;
        for score in self.state.scores.values_mut() {
            *score = 0;
        }
        self.state.current_round = 0;
        self.state.question = None;
        self.state.answered.clear();
        self.state.round_active = false;
        self.state.used_countries.clear();
        self.state.painted_countries.clear();
        self.state.current_country = None;
        self.state.time_remaining = 0;

        if self.state.room_type == RoomType::Single {
            // Solo rooms skip the lobby and go straight back into play.
            self.state.status = GameStatus::InProgress;
            self.state.current_round = 1;
            self.broadcast(&ServerMessage::GameRestarted(self.state.clone()));
            if self.state.is_free_paint() {
                self.broadcast(&ServerMessage::GameStarted(self.state.clone()));
            } else {
                self.start_round();
            }
        } else {
            self.state.status = GameStatus::Waiting;
            self.broadcast(&ServerMessage::GameRestarted(self.state.clone()));
            let update = self.room_update();
            self.broadcast(&update);
        }
        self.save_snapshot().await;
        tracing::info!(room = %self.code, "game restarted");
        CommandOutcome::Applied
    }

    // -- teardown -----------------------------------------------------------

    /// Idempotent. Notifies clients (when asked to), force-closes every
    /// connection, evicts the cache entry, and removes the room from
    /// the hub.
    async fn teardown(&mut self, notice: Option<&str>) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.timer = None;
        self.pending = None;
        self.state.status = GameStatus::Closed;
        self.state.round_active = false;

        if let Some(message) = notice {
            if !self.clients.is_empty() {
                self.broadcast(&ServerMessage::RoomClosed {
                    message: message.to_string(),
                });
                // Let the notice flush before the connections drop.
                tokio::time::sleep(self.config.close_flush).await;
            }
        }

        // Dropping the senders closes every write pump, which closes
        // the sockets.
        self.clients.clear();
        self.cache.delete(&self.code).await;
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(&self.code).await;
        }
        tracing::info!(room = %self.code, "room torn down");
    }

    // -- plumbing -----------------------------------------------------------

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code.clone(),
            status: self.state.status,
            game_mode: self.state.game_mode,
            room_type: self.state.room_type,
            owner: self.owner.clone(),
            players: self.clients.values().map(|c| c.username.clone()).collect(),
            max_players: self.config.max_players,
        }
    }

    fn room_update(&self) -> ServerMessage {
        let players: Vec<String> = self.clients.values().map(|c| c.username.clone()).collect();
        let player_avatars: HashMap<String, String> = self
            .clients
            .values()
            .filter(|c| !c.avatar_url.is_empty())
            .map(|c| (c.username.clone(), c.avatar_url.clone()))
            .collect();
        ServerMessage::RoomUpdate {
            current_count: players.len(),
            players,
            status: self.state.status,
            current_round: self.state.current_round,
            owner: self.owner.clone(),
            game_mode: self.state.game_mode,
            room_type: self.state.room_type,
            map_mode: self.state.map_mode,
            total_rounds: self.state.total_rounds,
            player_colors: self.state.player_colors.clone(),
            player_avatars,
        }
    }

    /// Queues a message to every attached client. A client whose queue
    /// is full is detached on the spot (it stopped draining long ago);
    /// closed queues are left for the read pump's leave to clean up.
    fn broadcast(&mut self, message: &ServerMessage) {
        let mut shed: Vec<ClientId> = Vec::new();
        for client in self.clients.values() {
            match client.sender.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        room = %self.code,
                        client = %client.id,
                        username = %client.username,
                        "outbound queue full, detaching client"
                    );
                    shed.push(client.id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        for id in shed {
            if let Some(client) = self.clients.remove(&id) {
                self.transfer_ownership_from(&client.username);
            }
        }
    }

    async fn save_snapshot(&self) {
        let session_to_user: HashMap<String, String> = self
            .clients
            .values()
            .filter(|c| !c.session_id.is_empty())
            .map(|c| (c.session_id.clone(), c.username.clone()))
            .collect();
        let mut snapshot = RoomSnapshot::new(self.code.clone(), self.state.clone());
        snapshot.players = self.clients.values().map(|c| c.username.clone()).collect();
        snapshot.owner = self.owner.clone();
        snapshot.session_to_user = session_to_user;
        self.cache.save(snapshot).await;
    }
}

/// Score for a correct timed answer: 100 minus 5 per full second taken,
/// floored at 25.
fn score_for(response_time_ms: u64) -> u32 {
    let secs = (response_time_ms / 1000).min(60) as u32;
    100u32.saturating_sub(5 * secs).max(25)
}
