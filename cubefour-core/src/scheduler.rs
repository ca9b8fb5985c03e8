//! Runs bot searches off the engine's thread and hands results back
//!
//! Hard and Expert go to a dedicated worker thread over a pair of one-way
//! channels. Random and Greedy run on the caller's thread once a short pacing
//! delay has passed. Either way at most one request is pending, and a result
//! only surfaces if the engine's generation still matches the one it was
//! requested for.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::board::{Board, Move, Player};
use crate::bots::{BotId, BotRegistry, Snapshot};
use crate::config::EngineConfig;
use crate::error::{GameError, Result};
use crate::game::GameEngine;

// ============================================================================
// WORKER PROTOCOL
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum WorkerRequest {
    CalculateMove {
        generation: u64,
        bot_id: String,
        board: Board,
        current_player: Player,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum WorkerResponse {
    MoveCalculated {
        generation: u64,
        #[serde(rename = "move")]
        mv: Option<Move>,
    },
    Error {
        generation: u64,
        message: String,
    },
}

impl WorkerResponse {
    pub fn generation(&self) -> u64 {
        match self {
            WorkerResponse::MoveCalculated { generation, .. } | WorkerResponse::Error { generation, .. } => {
                *generation
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "bot panicked".to_string()
    }
}

fn worker_loop(mut registry: BotRegistry, requests: Receiver<WorkerRequest>, responses: Sender<WorkerResponse>) {
    for request in requests {
        let WorkerRequest::CalculateMove {
            generation,
            bot_id,
            board,
            current_player,
        } = request;

        let response = match registry.get_mut(&bot_id) {
            Ok(bot) => {
                let snapshot = Snapshot::new(board, current_player);
                match panic::catch_unwind(AssertUnwindSafe(|| bot.get_move(&snapshot))) {
                    Ok(mv) => WorkerResponse::MoveCalculated { generation, mv },
                    Err(payload) => WorkerResponse::Error {
                        generation,
                        message: panic_message(payload.as_ref()),
                    },
                }
            }
            Err(e) => WorkerResponse::Error {
                generation,
                message: e.to_string(),
            },
        };

        if responses.send(response).is_err() {
            break;
        }
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// What a finished (or abandoned) request produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchEvent {
    /// Fresh result for the current position
    Ready { bot: BotId, mv: Option<Move> },
    Failed { bot: BotId, message: String },
    /// Dropped because the engine moved on after the request was issued
    Discarded { bot: BotId, generation: u64 },
}

#[derive(Clone, Copy, Debug)]
enum Pending {
    Worker {
        bot: BotId,
        generation: u64,
    },
    /// Waiting for the worker to finish a cancelled job before it is sent
    Queued {
        bot: BotId,
        generation: u64,
        snapshot: Snapshot,
    },
    Paced {
        bot: BotId,
        generation: u64,
        due: Instant,
        snapshot: Snapshot,
    },
}

impl Pending {
    fn bot(&self) -> BotId {
        match *self {
            Pending::Worker { bot, .. } | Pending::Queued { bot, .. } | Pending::Paced { bot, .. } => bot,
        }
    }
}

pub struct SearchScheduler {
    requests: Option<Sender<WorkerRequest>>,
    responses: Receiver<WorkerResponse>,
    worker: Option<JoinHandle<()>>,
    /// Bots run on the caller's thread; also the routing table
    local: BotRegistry,
    pacing: Duration,
    pending: Option<Pending>,
    /// A job is on the worker and its reply has not been read yet. Stays set
    /// after `cancel` until the unwanted reply is drained.
    in_flight: bool,
    /// Reply received by `wait` but not yet validated
    parked: Option<WorkerResponse>,
}

impl SearchScheduler {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_registries(
            BotRegistry::new(config),
            BotRegistry::new(config),
            config.pacing_delay(),
        )
    }

    /// `worker` moves to the search thread; `local` serves paced bots and
    /// decides which ids go where.
    pub fn with_registries(local: BotRegistry, worker: BotRegistry, pacing: Duration) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("cubefour-search".to_string())
            .spawn(move || worker_loop(worker, request_rx, response_tx))?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            worker: Some(handle),
            local,
            pacing,
            pending: None,
            in_flight: false,
            parked: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_bot(&self) -> Option<BotId> {
        self.pending.map(|p| p.bot())
    }

    /// True while the worker owes a reply, wanted or not
    pub fn worker_busy(&self) -> bool {
        self.in_flight
    }

    /// Start computing a move for the engine's current position.
    ///
    /// A worker bot requested while a cancelled job is still running is
    /// held back and sent once that job's reply has been drained.
    pub fn request(&mut self, engine: &GameEngine, bot_id: &str) -> Result<()> {
        if self.pending.is_some() {
            return Err(GameError::SchedulerBusy);
        }
        if engine.state().is_over() {
            return Err(GameError::GameOver);
        }
        let info = self.local.info(bot_id).map_err(|e| {
            tracing::error!("Bot not found: {}", bot_id);
            e
        })?;

        let generation = engine.generation();
        let snapshot = engine.snapshot();

        if !info.runs_in_worker {
            self.pending = Some(Pending::Paced {
                bot: info.id,
                generation,
                due: Instant::now() + self.pacing,
                snapshot,
            });
        } else if self.in_flight {
            tracing::debug!("Worker still busy with a cancelled job; queueing {}", info.id);
            self.pending = Some(Pending::Queued {
                bot: info.id,
                generation,
                snapshot,
            });
        } else {
            self.send(info.id, generation, &snapshot)?;
            self.pending = Some(Pending::Worker {
                bot: info.id,
                generation,
            });
        }

        tracing::debug!("Requested move from {} at generation {}", info.id, generation);
        Ok(())
    }

    /// Drop the pending request. A worker job keeps the worker slot until its
    /// reply arrives and is thrown away.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!("Cancelled pending {} request", pending.bot());
        }
    }

    /// Non-blocking check for a result
    pub fn poll(&mut self, engine: &GameEngine) -> Option<SearchEvent> {
        if let Some(event) = self.receive(engine) {
            return Some(event);
        }

        match self.pending? {
            Pending::Worker { .. } => None,
            Pending::Queued {
                bot,
                generation,
                snapshot,
            } => {
                if generation != engine.generation() {
                    self.pending = None;
                    tracing::debug!("Queued request for {} overtaken by a state change", bot);
                    return Some(SearchEvent::Discarded { bot, generation });
                }
                if self.in_flight {
                    return None;
                }
                match self.send(bot, generation, &snapshot) {
                    Ok(()) => {
                        self.pending = Some(Pending::Worker { bot, generation });
                        None
                    }
                    Err(e) => {
                        self.pending = None;
                        Some(SearchEvent::Failed {
                            bot,
                            message: e.to_string(),
                        })
                    }
                }
            }
            Pending::Paced {
                bot,
                generation,
                due,
                snapshot,
            } => {
                if generation != engine.generation() {
                    self.pending = None;
                    tracing::debug!("Pacing delay for {} cancelled by a state change", bot);
                    return Some(SearchEvent::Discarded { bot, generation });
                }
                if Instant::now() < due {
                    return None;
                }
                self.pending = None;
                Some(self.run_local(bot, &snapshot))
            }
        }
    }

    /// Block up to `timeout` for a result
    pub fn wait(&mut self, engine: &GameEngine, timeout: Duration) -> Option<SearchEvent> {
        let give_up = Instant::now() + timeout;
        loop {
            if let Some(event) = self.poll(engine) {
                return Some(event);
            }
            let now = Instant::now();
            if now >= give_up {
                return None;
            }

            match self.pending {
                None => return None,
                Some(Pending::Paced { due, .. }) => {
                    thread::sleep(due.min(give_up).saturating_duration_since(now));
                }
                Some(Pending::Worker { .. }) | Some(Pending::Queued { .. }) => {
                    match self.responses.recv_timeout(give_up - now) {
                        Ok(reply) => self.parked = Some(reply),
                        Err(RecvTimeoutError::Timeout) => return None,
                        Err(RecvTimeoutError::Disconnected) => return self.worker_lost(),
                    }
                }
            }
        }
    }

    /// Read the worker's reply if one is owed and has arrived. Only a reply to
    /// the live `Worker` request becomes an event; replies to cancelled jobs
    /// are dropped here so they never pair up with a later request.
    fn receive(&mut self, engine: &GameEngine) -> Option<SearchEvent> {
        if !self.in_flight {
            return None;
        }
        let reply = match self.parked.take() {
            Some(reply) => reply,
            None => match self.responses.try_recv() {
                Ok(reply) => reply,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return self.worker_lost(),
            },
        };
        self.in_flight = false;

        match self.pending {
            Some(Pending::Worker { bot, generation }) => self.accept(reply, bot, generation, engine),
            _ => {
                tracing::debug!("Discarding reply to a cancelled request (generation {})", reply.generation());
                None
            }
        }
    }

    /// Decide what a reply to the live worker request means. `None` keeps the
    /// request open.
    fn accept(&mut self, reply: WorkerResponse, bot: BotId, generation: u64, engine: &GameEngine) -> Option<SearchEvent> {
        let reply_generation = reply.generation();
        if reply_generation != generation {
            // Not ours: our job is still queued behind it on the worker
            tracing::debug!(
                "Ignoring reply for generation {} while waiting on {}",
                reply_generation,
                generation
            );
            self.in_flight = true;
            return None;
        }

        self.pending = None;
        if generation != engine.generation() {
            tracing::debug!(
                "Discarding stale reply from {} (generation {}, engine at {})",
                bot,
                reply_generation,
                engine.generation()
            );
            return Some(SearchEvent::Discarded {
                bot,
                generation: reply_generation,
            });
        }

        match reply {
            WorkerResponse::MoveCalculated { mv, .. } => Some(SearchEvent::Ready { bot, mv }),
            WorkerResponse::Error { message, .. } => {
                tracing::error!("Search worker failed for {}: {}", bot, message);
                Some(SearchEvent::Failed { bot, message })
            }
        }
    }

    fn send(&mut self, bot: BotId, generation: u64, snapshot: &Snapshot) -> Result<()> {
        let sender = self.requests.as_ref().ok_or(GameError::WorkerDisconnected)?;
        sender
            .send(WorkerRequest::CalculateMove {
                generation,
                bot_id: bot.to_string(),
                board: snapshot.board,
                current_player: snapshot.current_player,
            })
            .map_err(|_| GameError::WorkerDisconnected)?;
        self.in_flight = true;
        Ok(())
    }

    fn worker_lost(&mut self) -> Option<SearchEvent> {
        tracing::error!("Search worker disconnected");
        self.in_flight = false;
        self.requests = None;
        match self.pending {
            Some(Pending::Worker { bot, .. }) | Some(Pending::Queued { bot, .. }) => {
                self.pending = None;
                Some(SearchEvent::Failed {
                    bot,
                    message: GameError::WorkerDisconnected.to_string(),
                })
            }
            _ => None,
        }
    }

    fn run_local(&mut self, bot: BotId, snapshot: &Snapshot) -> SearchEvent {
        match self.local.get_mut(bot.as_str()) {
            Ok(local) => SearchEvent::Ready {
                bot,
                mv: local.get_move(snapshot),
            },
            Err(e) => {
                tracing::error!("Bot not found: {}", bot);
                SearchEvent::Failed {
                    bot,
                    message: e.to_string(),
                }
            }
        }
    }
}

impl Drop for SearchScheduler {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
