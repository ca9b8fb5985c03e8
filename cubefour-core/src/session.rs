//! A game plus whatever drives the other side of it

use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::board::{Move, Player};
use crate::config::{EngineConfig, GameMode};
use crate::error::{GameError, Result};
use crate::game::{GameEngine, GameState};
use crate::scheduler::{SearchEvent, SearchScheduler};
use crate::sync::SyncRecord;

pub struct GameSession {
    config: EngineConfig,
    engine: GameEngine,
    scheduler: SearchScheduler,
    outbound: Option<Sender<SyncRecord>>,
}

impl GameSession {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let scheduler = SearchScheduler::new(&config)?;
        Ok(Self {
            config,
            engine: GameEngine::new(),
            scheduler,
            outbound: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn state(&self) -> &GameState {
        self.engine.state()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&GameState) + Send + 'static) {
        self.engine.subscribe(listener);
    }

    /// Where local moves are published in online mode
    pub fn connect(&mut self, outbound: Sender<SyncRecord>) {
        self.outbound = Some(outbound);
    }

    pub fn is_bot_turn(&self) -> bool {
        self.config.mode == GameMode::SinglePlayer
            && !self.engine.state().is_over()
            && self.engine.current_player() == self.config.bot_player
    }

    pub fn is_bot_thinking(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Local (human) move. Rejected while the bot is to move.
    pub fn play(&mut self, x: u8, z: u8) -> bool {
        if self.is_bot_turn() {
            return false;
        }
        if !self.engine.drop_piece(x, z) {
            return false;
        }
        self.publish();
        true
    }

    /// Advance the bot turn without blocking; the move applied, if any
    pub fn tick(&mut self) -> Result<Option<Move>> {
        if let Some(event) = self.scheduler.poll(&self.engine) {
            return self.apply(event);
        }
        self.ensure_requested()?;
        Ok(None)
    }

    /// Blocking form of `tick`
    pub fn wait_for_bot(&mut self, timeout: Duration) -> Result<Option<Move>> {
        self.ensure_requested()?;
        match self.scheduler.wait(&self.engine, timeout) {
            Some(event) => self.apply(event),
            None => Ok(None),
        }
    }

    pub fn reset(&mut self) {
        self.scheduler.cancel();
        self.engine.reset_game();
    }

    pub fn set_mode(&mut self, mode: GameMode) {
        self.config.mode = mode;
        self.reset();
    }

    /// Takes effect from the next bot turn
    pub fn set_selected_bot(&mut self, id: &str) {
        self.config.selected_bot = id.to_string();
    }

    /// The bot takes the other side
    pub fn set_human_player(&mut self, human: Player) {
        self.config.bot_player = human.opponent();
        self.reset();
    }

    /// Apply a peer's record. Ignored outside online mode.
    pub fn receive_remote(&mut self, record: &SyncRecord) -> bool {
        if self.config.mode != GameMode::Online {
            tracing::debug!("Ignoring remote record outside online mode");
            return false;
        }
        self.scheduler.cancel();
        self.engine.apply_remote(record);
        true
    }

    fn ensure_requested(&mut self) -> Result<()> {
        if self.is_bot_turn() && !self.scheduler.is_pending() {
            self.scheduler.request(&self.engine, &self.config.selected_bot)?;
        }
        Ok(())
    }

    fn apply(&mut self, event: SearchEvent) -> Result<Option<Move>> {
        match event {
            SearchEvent::Ready { bot, mv: Some(mv) } => {
                if self.engine.drop_piece(mv.x, mv.z) {
                    tracing::debug!("{} played {}", bot, mv);
                    self.publish();
                    Ok(Some(mv))
                } else {
                    tracing::error!("{} chose unplayable column {}", bot, mv);
                    Ok(None)
                }
            }
            SearchEvent::Ready { bot, mv: None } => {
                tracing::warn!("{} found no move", bot);
                Ok(None)
            }
            SearchEvent::Failed { message, .. } => Err(GameError::WorkerFailure(message)),
            SearchEvent::Discarded { .. } => Ok(None),
        }
    }

    fn publish(&mut self) {
        if self.config.mode != GameMode::Online {
            return;
        }
        let Some(outbound) = &self.outbound else {
            return;
        };
        if outbound.send(self.engine.export_record()).is_err() {
            tracing::warn!("Sync channel closed; further moves stay local");
            self.outbound = None;
        }
    }
}
