use crate::models::{Phase, User};
use crate::timing::{Clock, TimingSampler};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::Mutex, time::Instant};
use uuid::Uuid;

/// One player's game screen, from login to logout.
pub struct GameSession {
    pub user: User,
    pub sampler: TimingSampler,
    pub last_press: Option<Instant>,
}

impl GameSession {
    pub fn new(user: User, clock: Arc<dyn Clock>, tick: Duration) -> Self {
        Self {
            user,
            sampler: TimingSampler::new(clock, tick),
            last_press: None,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.user.attempts_left == 0 {
            Phase::Exhausted
        } else if self.sampler.is_running() {
            Phase::Running
        } else {
            Phase::Idle
        }
    }
}

/// A session plus the flag that keeps a second press out while one is
/// being recorded.
pub struct SessionSlot {
    pressing: AtomicBool,
    last_seen: Mutex<Instant>,
    pub state: Mutex<GameSession>,
}

impl SessionSlot {
    fn new(session: GameSession) -> Self {
        Self {
            pressing: AtomicBool::new(false),
            last_seen: Mutex::new(Instant::now()),
            state: Mutex::new(session),
        }
    }

    async fn touch(&self) {
        *self.last_seen.lock().await = Instant::now();
    }

    async fn idle_for(&self) -> Duration {
        self.last_seen.lock().await.elapsed()
    }

    /// `None` while another press holds the slot.
    pub fn begin_press(&self) -> Option<PressGuard<'_>> {
        self.pressing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PressGuard(&self.pressing))
    }
}

pub struct PressGuard<'a>(&'a AtomicBool);

impl Drop for PressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub type SharedSession = Arc<SessionSlot>;

/// Open sessions by bearer token.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
}

impl SessionRegistry {
    pub async fn open(&self, session: GameSession) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions
            .lock()
            .await
            .insert(token, Arc::new(SessionSlot::new(session)));
        token
    }

    /// Every lookup counts as activity for the idle timeout.
    pub async fn get(&self, token: Uuid) -> Option<SharedSession> {
        let slot = self.sessions.lock().await.get(&token).cloned()?;
        slot.touch().await;
        Some(slot)
    }

    /// The sampler stops once the last handle to the session is gone.
    pub async fn close(&self, token: Uuid) -> bool {
        self.sessions.lock().await.remove(&token).is_some()
    }

    pub async fn is_open(&self, token: Uuid) -> bool {
        self.sessions.lock().await.contains_key(&token)
    }

    /// Closes every session not looked up for at least `idle` and returns
    /// their tokens.
    pub async fn close_idle(&self, idle: Duration) -> Vec<Uuid> {
        let mut sessions = self.sessions.lock().await;
        let mut stale = Vec::new();
        for (token, slot) in sessions.iter() {
            if slot.idle_for().await >= idle {
                stale.push(*token);
            }
        }
        for token in &stale {
            sessions.remove(token);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::tests::FixedClock;
    use crate::timing::TICK_INTERVAL;
    use chrono::Utc;

    fn session(attempts_left: u32) -> GameSession {
        let user = User {
            id: Uuid::new_v4(),
            name: "Dana".to_string(),
            phone: "+972501234567".to_string(),
            attempts_left,
            best_result: None,
            discount: 3,
            created_at: Utc::now(),
        };
        GameSession::new(user, FixedClock::at_millis(0), TICK_INTERVAL)
    }

    #[tokio::test]
    async fn phase_follows_sampler_and_attempts() {
        let mut live = session(2);
        assert_eq!(live.phase(), Phase::Idle);
        live.sampler.start();
        assert_eq!(live.phase(), Phase::Running);
        live.user.attempts_left = 0;
        assert_eq!(live.phase(), Phase::Exhausted);
    }

    #[tokio::test]
    async fn only_one_press_at_a_time() {
        let registry = SessionRegistry::default();
        let token = registry.open(session(1)).await;
        let slot = registry.get(token).await.unwrap();

        let first = slot.begin_press();
        assert!(first.is_some());
        assert!(slot.begin_press().is_none());
        drop(first);
        assert!(slot.begin_press().is_some());
    }

    #[tokio::test]
    async fn closing_forgets_the_token() {
        let registry = SessionRegistry::default();
        let token = registry.open(session(1)).await;
        assert!(registry.is_open(token).await);
        assert!(registry.close(token).await);
        assert!(!registry.close(token).await);
        assert!(registry.get(token).await.is_none());
    }

    #[tokio::test]
    async fn idle_sessions_are_closed_and_stop_ticking() {
        let registry = SessionRegistry::default();
        let quiet = registry.open(session(1)).await;
        let busy = registry.open(session(1)).await;

        let slot = registry.get(quiet).await.unwrap();
        slot.state.lock().await.sampler.start();
        drop(slot);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(registry.get(busy).await.is_some());

        assert_eq!(registry.close_idle(Duration::from_millis(60)).await, vec![quiet]);
        assert!(!registry.is_open(quiet).await);
        assert!(registry.is_open(busy).await);
        assert!(registry.close_idle(Duration::from_secs(60)).await.is_empty());
    }
}
