use crate::errors::GameError;
use crate::models::{AttemptResponse, GameSettings, HistoryResponse, SessionResponse, User};
use crate::repository::{GameRepository, Scored};
use crate::session::{GameSession, SessionRegistry};
use crate::timing::{Clock, Reading, TICK_INTERVAL};
use crate::validation::{normalize_name, normalize_phone};
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_PRESS_COOLDOWN: Duration = Duration::from_millis(500);

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy)]
pub struct GameOptions {
    pub tick_interval: Duration,
    /// Minimum gap between two accepted presses of one session.
    pub press_cooldown: Duration,
    /// Sessions untouched for this long are closed by the sweep.
    pub session_idle: Duration,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            tick_interval: TICK_INTERVAL,
            press_cooldown: DEFAULT_PRESS_COOLDOWN,
            session_idle: DEFAULT_SESSION_IDLE,
        }
    }
}

/// Player-facing flows. Every session is an explicit token handed back to
/// the caller; nothing about a player lives outside the registry and the
/// repository.
pub struct Game {
    repo: Arc<dyn GameRepository>,
    clock: Arc<dyn Clock>,
    sessions: SessionRegistry,
    options: GameOptions,
}

impl Game {
    pub fn new(repo: Arc<dyn GameRepository>, clock: Arc<dyn Clock>, options: GameOptions) -> Self {
        Self {
            repo,
            clock,
            sessions: SessionRegistry::default(),
            options,
        }
    }

    pub async fn settings(&self) -> Result<GameSettings, GameError> {
        Ok(self.repo.load_game_settings().await?)
    }

    pub async fn register(&self, name: &str, phone: &str) -> Result<SessionResponse, GameError> {
        let name = normalize_name(name)?;
        let phone = normalize_phone(phone)?;

        if self.repo.find_user_by_phone(&phone).await?.is_some() {
            return Err(GameError::AlreadyRegistered);
        }

        let settings = self.repo.load_game_settings().await?;
        let user = self
            .repo
            .create_user(&name, &phone, settings.attempts_number, settings.fallback_discount)
            .await?;
        info!(user = %user.id, attempts = user.attempts_left, "player registered");

        Ok(self.open_session(user).await)
    }

    pub async fn login(&self, phone: &str) -> Result<SessionResponse, GameError> {
        let phone = normalize_phone(phone)?;
        let user = self
            .repo
            .find_user_by_phone(&phone)
            .await?
            .ok_or(GameError::UserNotFound)?;

        Ok(self.open_session(user).await)
    }

    pub async fn logout(&self, token: Uuid) -> bool {
        let closed = self.sessions.close(token).await;
        if closed {
            info!(%token, "session closed");
        }
        closed
    }

    /// Drops sessions whose player went away without logging out.
    pub async fn close_idle_sessions(&self) -> usize {
        let closed = self.sessions.close_idle(self.options.session_idle).await;
        if !closed.is_empty() {
            info!(count = closed.len(), "idle sessions closed");
        }
        closed.len()
    }

    pub async fn session(&self, token: Uuid) -> Result<SessionResponse, GameError> {
        let slot = self.sessions.get(token).await.ok_or(GameError::SessionNotFound)?;
        let session = slot.state.lock().await;
        Ok(snapshot(token, &session))
    }

    pub async fn reading(&self, token: Uuid) -> Result<Reading, GameError> {
        let slot = self.sessions.get(token).await.ok_or(GameError::SessionNotFound)?;
        let session = slot.state.lock().await;
        Ok(session.sampler.reading())
    }

    pub async fn start_timer(&self, token: Uuid) -> Result<SessionResponse, GameError> {
        let slot = self.sessions.get(token).await.ok_or(GameError::SessionNotFound)?;
        let mut session = slot.state.lock().await;

        self.refresh(&mut session).await?;
        if session.user.attempts_left == 0 {
            return Err(GameError::AttemptsExhausted);
        }
        session.sampler.start();
        Ok(snapshot(token, &session))
    }

    pub async fn stop_timer(&self, token: Uuid) -> Result<SessionResponse, GameError> {
        let slot = self.sessions.get(token).await.ok_or(GameError::SessionNotFound)?;
        let mut session = slot.state.lock().await;
        session.sampler.stop();
        Ok(snapshot(token, &session))
    }

    pub async fn reset_timer(&self, token: Uuid) -> Result<SessionResponse, GameError> {
        let slot = self.sessions.get(token).await.ok_or(GameError::SessionNotFound)?;
        let mut session = slot.state.lock().await;
        session.sampler.reset();
        Ok(snapshot(token, &session))
    }

    /// Records a press at the last sampled millisecond.
    pub async fn press(&self, token: Uuid) -> Result<AttemptResponse, GameError> {
        let slot = self.sessions.get(token).await.ok_or(GameError::SessionNotFound)?;
        let _press = slot.begin_press().ok_or(GameError::AttemptInFlight)?;
        let mut session = slot.state.lock().await;

        // an admin may have restored attempts since login
        self.refresh(&mut session).await?;
        if session.user.attempts_left == 0 {
            session.sampler.stop();
            return Err(GameError::AttemptsExhausted);
        }
        if !session.sampler.is_running() {
            return Err(GameError::TimerStopped);
        }
        let cooldown = self.options.press_cooldown;
        if session
            .last_press
            .is_some_and(|last| last.elapsed() < cooldown)
        {
            return Err(GameError::Cooldown);
        }

        let reading = session.sampler.reading();
        session.sampler.stop();

        let scored = match self.repo.record_attempt(session.user.id, reading.deviation()).await {
            Ok(scored) => scored,
            Err(err) => {
                warn!(user = %session.user.id, "attempt not recorded: {err}");
                session.sampler.start();
                return Err(err.into());
            }
        };
        let updated = match scored {
            Scored::Recorded(updated) => updated,
            Scored::Exhausted(stored) => {
                // another session of the same player used the last attempt
                session.user = stored;
                return Err(GameError::AttemptsExhausted);
            }
            Scored::UnknownUser => return Err(GameError::UserNotFound),
        };
        session.last_press = Some(Instant::now());

        if !self.sessions.is_open(token).await {
            warn!(user = %updated.id, "session closed while recording, result discarded");
            return Err(GameError::SessionClosed);
        }

        info!(
            user = %updated.id,
            difference = reading.deviation(),
            best = ?updated.best_result,
            discount = updated.discount,
            attempts_left = updated.attempts_left,
            "attempt recorded"
        );

        session.user = updated;
        if session.user.attempts_left > 0 {
            session.sampler.start();
        }

        Ok(AttemptResponse {
            difference: reading.deviation(),
            clock: reading.clock,
            user: session.user.clone(),
            phase: session.phase(),
        })
    }

    pub async fn history(&self, token: Uuid) -> Result<HistoryResponse, GameError> {
        let slot = self.sessions.get(token).await.ok_or(GameError::SessionNotFound)?;
        let mut session = slot.state.lock().await;
        self.refresh(&mut session).await?;
        let attempts = self.repo.list_attempts(session.user.id).await?;
        Ok(HistoryResponse {
            user: session.user.clone(),
            attempts,
        })
    }

    async fn open_session(&self, user: User) -> SessionResponse {
        let session = GameSession::new(user, Arc::clone(&self.clock), self.options.tick_interval);
        let response_user = session.user.clone();
        let phase = session.phase();
        let reading = session.sampler.reading();
        let token = self.sessions.open(session).await;
        info!(user = %response_user.id, %token, "session opened");

        SessionResponse {
            token,
            user: response_user,
            phase,
            reading,
        }
    }

    async fn refresh(&self, session: &mut GameSession) -> Result<(), GameError> {
        session.user = self
            .repo
            .find_user(session.user.id)
            .await?
            .ok_or(GameError::UserNotFound)?;
        Ok(())
    }
}

fn snapshot(token: Uuid, session: &GameSession) -> SessionResponse {
    SessionResponse {
        token,
        user: session.user.clone(),
        phase: session.phase(),
        reading: session.sampler.reading(),
    }
}
