use crate::admin::Admin;
use crate::config::Config;
use crate::game::Game;
use crate::repository::{GameRepository, JsonStore};
use crate::timing::{Clock, SystemClock};
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

pub const HOUSEKEEPING_PERIOD: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub game: Arc<Game>,
    pub admin: Arc<Admin>,
}

impl AppState {
    pub fn new(repo: Arc<dyn GameRepository>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            game: Arc::new(Game::new(
                Arc::clone(&repo),
                Arc::clone(&clock),
                config.game_options(),
            )),
            admin: Arc::new(Admin::new(repo, clock, config.admin_password_hash.clone())),
        }
    }

    pub async fn from_config(config: &Config) -> Self {
        let store = JsonStore::open(&config.data_path).await;
        Self::new(Arc::new(store), Arc::new(SystemClock), config)
    }

    /// Periodically closes idle player sessions and drops expired admin
    /// tokens.
    pub fn spawn_housekeeping(&self, period: Duration) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                state.game.close_idle_sessions().await;
                state.admin.forget_expired_tokens().await;
            }
        })
    }
}
