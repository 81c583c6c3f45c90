//! The event core: a single task owning all broker state.
//!
//! Connection tasks frame lines and forward [`Event`]s; the core applies
//! them in arrival order and runs a dispatch pass after every state change
//! and on a one-second tick. Keeping the registry, ready queue, sessions and
//! journal writer on one task gives the delivery guarantees for free: the
//! journal writer is serialized, per-consumer delivery order is channel
//! order, and no lock is ever taken.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::broker::session::{ConsumerSession, ProducerSession};
use crate::config::BrokerConfig;
use crate::journal::{Journal, Recovery};
use crate::registry::{MessageRegistry, ReadyQueue};
use crate::stats::{BrokerStats, BrokerStatus, ConsumerStatus, ProducerStatus, StatusSnapshot};

/// Everything the connection layer can tell the core.
#[derive(Debug)]
pub(crate) enum Event {
    ProducerJoined {
        conn: u64,
        name: String,
    },
    ProducerLine {
        conn: u64,
        line: String,
    },
    ProducerLeft {
        conn: u64,
    },
    ConsumerJoined {
        conn: u64,
        name: String,
        outbound: mpsc::Sender<String>,
    },
    ConsumerLine {
        conn: u64,
        line: String,
    },
    ConsumerLeft {
        conn: u64,
    },
    StatusRequest {
        reply: oneshot::Sender<StatusSnapshot>,
    },
}

pub(crate) struct EventCore {
    config: BrokerConfig,
    journal: Journal,
    registry: MessageRegistry,
    queue: ReadyQueue,
    producers: HashMap<u64, ProducerSession>,
    consumers: HashMap<u64, ConsumerSession>,
    /// Connection order of live consumers; `rr_index` walks this.
    consumer_order: Vec<u64>,
    rr_index: usize,
    stats: BrokerStats,
    departed_producers: Vec<ProducerStatus>,
    departed_consumers: Vec<ConsumerStatus>,
}

impl EventCore {
    pub fn new(config: BrokerConfig, journal: Journal, recovery: Recovery) -> Self {
        let mut queue = ReadyQueue::new();
        for id in recovery.records.keys() {
            queue.push(*id);
        }
        let registry =
            MessageRegistry::with_records(recovery.next_id, recovery.records.into_values());

        Self {
            config,
            journal,
            registry,
            queue,
            producers: HashMap::new(),
            consumers: HashMap::new(),
            consumer_order: Vec::new(),
            rr_index: 0,
            stats: BrokerStats::default(),
            departed_producers: Vec::new(),
            departed_consumers: Vec::new(),
        }
    }

    /// Run until every event sender is gone (server shutdown).
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let summary_every = Duration::from_secs(self.config.stats_interval_secs.max(1));
        let mut last_summary = Instant::now();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event);
                        self.dispatch();
                    }
                    None => break,
                },
                _ = tick.tick() => {
                    self.dispatch();
                    if last_summary.elapsed() >= summary_every {
                        self.stats.log_summary(
                            self.queue.len(),
                            self.in_flight(),
                            self.producers.len(),
                            self.consumers.len(),
                        );
                        last_summary = Instant::now();
                    }
                }
            }
        }

        if let Err(e) = self.journal.flush() {
            error!("journal flush on shutdown failed: {e}");
        }
        info!("event core stopped");
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::ProducerJoined { conn, name } => {
                info!(producer = %name, "producer connected");
                self.producers.insert(conn, ProducerSession::new(name));
            }
            Event::ProducerLine { conn, line } => self.ingest(conn, line),
            Event::ProducerLeft { conn } => {
                if let Some(session) = self.producers.remove(&conn) {
                    info!(producer = %session.name, ingested = session.ingested,
                        "producer disconnected");
                    self.departed_producers.push(ProducerStatus {
                        id: session.name,
                        connected: false,
                        messages_sent: session.ingested,
                    });
                }
            }
            Event::ConsumerJoined {
                conn,
                name,
                outbound,
            } => {
                info!(consumer = %name, "consumer connected");
                self.consumers
                    .insert(conn, ConsumerSession::new(name, outbound));
                self.consumer_order.push(conn);
            }
            Event::ConsumerLine { conn, line } => match line.as_str() {
                "ACK" | "ERR" => self.apply_verdict(conn),
                other => debug!(line = %other, "ignoring unrecognized consumer line"),
            },
            Event::ConsumerLeft { conn } => self.reap_consumer(conn),
            Event::StatusRequest { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// One producer line: allocate an id, journal the INSERT, then enqueue.
    /// The journal append happens before the id becomes dispatchable so a
    /// crash between the two only ever loses the enqueue, never the record.
    fn ingest(&mut self, conn: u64, line: String) {
        let id = self.registry.insert(line);
        if let Some(record) = self.registry.get(id) {
            self.journal.append_insert(id, &record.payload);
        }
        self.queue.push(id);
        self.stats.ingested += 1;
        if let Some(session) = self.producers.get_mut(&conn) {
            session.ingested += 1;
        }
    }

    /// `ACK` and `ERR` are processed identically: the head of the session's
    /// pending list is the record being answered, in protocol order.
    fn apply_verdict(&mut self, conn: u64) {
        let Some(session) = self.consumers.get_mut(&conn) else {
            return;
        };
        let Some(id) = session.pending.pop_front() else {
            debug!(consumer = %session.name, "verdict with nothing pending");
            return;
        };
        self.registry.mark_acked(id);
        self.journal.append_ack(id);
        self.registry.remove(id);
        self.stats.acked += 1;
    }

    /// Consumer teardown: requeue its pending ids in dispatch order at the
    /// tail of the ready queue and keep the round-robin cursor in range.
    fn reap_consumer(&mut self, conn: u64) {
        let Some(session) = self.consumers.remove(&conn) else {
            return;
        };
        self.consumer_order.retain(|&c| c != conn);
        if self.rr_index >= self.consumer_order.len() {
            self.rr_index = 0;
        }

        let requeued = session.pending.len();
        for id in &session.pending {
            self.queue.push(*id);
        }
        self.stats.requeued += requeued as u64;
        info!(consumer = %session.name, requeued, "consumer disconnected");
        self.departed_consumers.push(ConsumerStatus {
            id: session.name,
            connected: false,
            pending: 0,
            messages_received: session.delivered,
        });
    }

    /// One dispatch pass: round-robin over consumers with window space,
    /// each consumer considered at most once per pass; a successful send
    /// starts a fresh pass. Stale and already-acked head ids are discarded
    /// on the way.
    fn dispatch(&mut self) {
        let mut checked = 0;
        while checked < self.consumer_order.len() && !self.queue.is_empty() {
            let count = self.consumer_order.len();
            if self.rr_index >= count {
                self.rr_index = 0;
            }
            let conn = self.consumer_order[self.rr_index];
            let Some(session) = self.consumers.get_mut(&conn) else {
                self.rr_index = (self.rr_index + 1) % count;
                checked += 1;
                continue;
            };

            if session.pending.len() >= self.config.window {
                self.rr_index = (self.rr_index + 1) % count;
                checked += 1;
                continue;
            }

            // Resolve the queue head to a live record.
            let (id, payload) = loop {
                let Some(id) = self.queue.front() else {
                    return;
                };
                match self.registry.get(id) {
                    Some(record) if !record.acked => break (id, record.payload.clone()),
                    _ => {
                        self.queue.pop();
                    }
                }
            };

            match session.outbound.try_send(payload) {
                Ok(()) => {
                    self.queue.pop();
                    session.pending.push_back(id);
                    session.delivered += 1;
                    self.stats.dispatched += 1;
                    self.rr_index = (self.rr_index + 1) % count;
                    checked = 0;
                }
                Err(TrySendError::Full(_)) => {
                    // Socket writer is saturated; skip this consumer for
                    // the rest of the pass.
                    self.rr_index = (self.rr_index + 1) % count;
                    checked += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    // Socket died; the reader task will deliver the
                    // disconnect that requeues this session's pending ids.
                    return;
                }
            }
        }
    }

    fn in_flight(&self) -> usize {
        self.consumers.values().map(|s| s.pending.len()).sum()
    }

    fn snapshot(&self) -> StatusSnapshot {
        let mut producers: Vec<ProducerStatus> = self
            .producers
            .values()
            .map(|s| ProducerStatus {
                id: s.name.clone(),
                connected: true,
                messages_sent: s.ingested,
            })
            .collect();
        producers.extend(self.departed_producers.iter().cloned());
        producers.sort_by(|a, b| a.id.cmp(&b.id));

        let mut consumers: Vec<ConsumerStatus> = self
            .consumers
            .values()
            .map(|s| ConsumerStatus {
                id: s.name.clone(),
                connected: true,
                pending: s.pending.len(),
                messages_received: s.delivered,
            })
            .collect();
        consumers.extend(self.departed_consumers.iter().cloned());
        consumers.sort_by(|a, b| a.id.cmp(&b.id));

        StatusSnapshot {
            broker: BrokerStatus {
                active: true,
                total_messages: self.registry.next_id() - 1,
            },
            producers,
            consumers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal;
    use tempfile::tempdir;

    fn core_with(window: usize, dir: &tempfile::TempDir) -> EventCore {
        let path = dir.path().join("broker_log.txt");
        let config = BrokerConfig {
            window,
            journal_path: path.display().to_string(),
            ..Default::default()
        };
        let recovery = journal::recover(&path).unwrap();
        let journal = Journal::open(&path).unwrap();
        EventCore::new(config, journal, recovery)
    }

    fn join_consumer(core: &mut EventCore, conn: u64, buffer: usize) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(buffer);
        core.handle_event(Event::ConsumerJoined {
            conn,
            name: format!("c{conn}"),
            outbound: tx,
        });
        rx
    }

    fn ingest_lines(core: &mut EventCore, lines: &[&str]) {
        core.handle_event(Event::ProducerJoined {
            conn: 1,
            name: "p1".to_string(),
        });
        for line in lines {
            core.handle_event(Event::ProducerLine {
                conn: 1,
                line: line.to_string(),
            });
        }
    }

    #[tokio::test]
    async fn round_robin_alternates_between_consumers() {
        let dir = tempdir().unwrap();
        let mut core = core_with(10, &dir);
        let mut rx1 = join_consumer(&mut core, 1, 16);
        let mut rx2 = join_consumer(&mut core, 2, 16);

        ingest_lines(&mut core, &["m1", "m2", "m3", "m4", "m5", "m6"]);
        core.dispatch();

        let mut got1 = Vec::new();
        while let Ok(line) = rx1.try_recv() {
            got1.push(line);
        }
        let mut got2 = Vec::new();
        while let Ok(line) = rx2.try_recv() {
            got2.push(line);
        }
        assert_eq!(got1, vec!["m1", "m3", "m5"]);
        assert_eq!(got2, vec!["m2", "m4", "m6"]);
    }

    #[tokio::test]
    async fn window_bounds_in_flight_records() {
        let dir = tempdir().unwrap();
        let mut core = core_with(3, &dir);
        let mut rx = join_consumer(&mut core, 1, 16);

        ingest_lines(&mut core, &["a", "b", "c", "d", "e"]);
        core.dispatch();

        let mut got = Vec::new();
        while let Ok(line) = rx.try_recv() {
            got.push(line);
        }
        assert_eq!(got, vec!["a", "b", "c"]);
        assert_eq!(core.queue.len(), 2);

        // one verdict frees one window slot
        core.handle_event(Event::ConsumerLine {
            conn: 1,
            line: "ACK".to_string(),
        });
        core.dispatch();
        assert_eq!(rx.try_recv().unwrap(), "d");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn consumer_loss_requeues_pending_in_order() {
        let dir = tempdir().unwrap();
        let mut core = core_with(10, &dir);
        let _rx1 = join_consumer(&mut core, 1, 16);

        ingest_lines(&mut core, &["a", "b", "c"]);
        core.dispatch();
        core.handle_event(Event::ConsumerLeft { conn: 1 });

        let mut rx2 = join_consumer(&mut core, 2, 16);
        core.dispatch();
        let mut got = Vec::new();
        while let Ok(line) = rx2.try_recv() {
            got.push(line);
        }
        assert_eq!(got, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn err_verdict_consumes_the_record() {
        let dir = tempdir().unwrap();
        let mut core = core_with(10, &dir);
        let mut rx = join_consumer(&mut core, 1, 16);

        ingest_lines(&mut core, &["bad"]);
        core.dispatch();
        assert_eq!(rx.try_recv().unwrap(), "bad");

        core.handle_event(Event::ConsumerLine {
            conn: 1,
            line: "ERR".to_string(),
        });
        assert!(core.registry.is_empty());
        assert_eq!(core.stats.acked, 1);
    }

    #[tokio::test]
    async fn unrecognized_consumer_lines_are_ignored() {
        let dir = tempdir().unwrap();
        let mut core = core_with(10, &dir);
        let mut rx = join_consumer(&mut core, 1, 16);

        ingest_lines(&mut core, &["x"]);
        core.dispatch();
        assert_eq!(rx.try_recv().unwrap(), "x");

        core.handle_event(Event::ConsumerLine {
            conn: 1,
            line: "HELLO".to_string(),
        });
        let session = core.consumers.get(&1).unwrap();
        assert_eq!(session.pending.len(), 1);
    }

    #[tokio::test]
    async fn verdict_with_nothing_pending_is_ignored() {
        let dir = tempdir().unwrap();
        let mut core = core_with(10, &dir);
        let _rx = join_consumer(&mut core, 1, 16);

        core.handle_event(Event::ConsumerLine {
            conn: 1,
            line: "ACK".to_string(),
        });
        assert_eq!(core.stats.acked, 0);
    }

    #[tokio::test]
    async fn snapshot_reports_live_pending_and_totals() {
        let dir = tempdir().unwrap();
        let mut core = core_with(10, &dir);
        let _rx = join_consumer(&mut core, 1, 16);

        ingest_lines(&mut core, &["a", "b"]);
        core.dispatch();

        let snapshot = core.snapshot();
        assert_eq!(snapshot.broker.total_messages, 2);
        assert_eq!(snapshot.producers.len(), 1);
        assert_eq!(snapshot.producers[0].messages_sent, 2);
        assert_eq!(snapshot.consumers[0].pending, 2);
        assert_eq!(snapshot.consumers[0].messages_received, 2);
    }

    #[tokio::test]
    async fn full_outbound_channel_defers_dispatch() {
        let dir = tempdir().unwrap();
        let mut core = core_with(10, &dir);
        let mut rx = join_consumer(&mut core, 1, 2);

        ingest_lines(&mut core, &["a", "b", "c"]);
        core.dispatch();

        // channel capacity 2: third record stays queued
        assert_eq!(core.queue.len(), 1);
        assert_eq!(rx.try_recv().unwrap(), "a");
        assert_eq!(rx.try_recv().unwrap(), "b");

        // draining the channel lets the next pass make progress
        core.dispatch();
        assert_eq!(rx.try_recv().unwrap(), "c");
        assert!(core.queue.is_empty());
    }
}
