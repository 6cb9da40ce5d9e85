//! Broker routing engine
//!
//! Sans-I/O core of the broker. Inbound messages (sender identity first)
//! go in through [`Broker::handle_message`], timer ticks through
//! [`Broker::on_tick`], and every message the broker wants to send lands in
//! an outbox that the socket loop drains.
//!
//! All state (worker table, service registry, heartbeat deadline) is owned
//! by one `Broker` value and mutated only from the caller's loop.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::{ProtocolError, Result};
use crate::protocol::constants::*;
use crate::protocol::{Address, Command, Envelope};
use crate::registry::{Assignment, ServiceRegistry, WorkerEntry};
use crate::stats::{BrokerCounters, BrokerStats};

use super::config::BrokerConfig;
use super::state::{transition, WorkerAction, WorkerState};

/// Routing and dispatch engine
#[derive(Debug)]
pub struct Broker {
    heartbeat_interval: Duration,
    heartbeat_expiry: Duration,
    heartbeat_at: Instant,
    workers: HashMap<Address, WorkerEntry>,
    registry: ServiceRegistry,
    outbox: VecDeque<Envelope>,
    counters: BrokerCounters,
}

impl Broker {
    /// Create a broker whose first heartbeat is one interval after `now`
    pub fn new(config: &BrokerConfig, now: Instant) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval,
            heartbeat_expiry: config.heartbeat_expiry(),
            heartbeat_at: now + config.heartbeat_interval,
            workers: HashMap::new(),
            registry: ServiceRegistry::new(),
            outbox: VecDeque::new(),
            counters: BrokerCounters::default(),
        }
    }

    /// Handle one message received on the router socket
    ///
    /// Expects `[sender][""][header][...]`. Malformed messages are logged
    /// and dropped.
    pub fn handle_message(&mut self, message: Envelope, now: Instant) {
        if let Err(e) = self.route_message(message, now) {
            self.counters.protocol_violations += 1;
            tracing::warn!(error = %e, "Discarding message");
        }
    }

    fn route_message(&mut self, mut message: Envelope, now: Instant) -> Result<()> {
        let sender = Address::new(message.pop_front()?);
        let _delimiter = message.pop_front()?;
        let header = message.pop_front()?;

        match &header[..] {
            MDPC_CLIENT => self.client_process(sender, message, now),
            MDPW_WORKER => self.worker_process(sender, message, now),
            _ => Err(ProtocolError::InvalidHeader(header).into()),
        }
    }

    /// Handle a client request: `[service][body...]`
    pub fn client_process(&mut self, sender: Address, mut message: Envelope, now: Instant) -> Result<()> {
        let service_frame = message
            .pop_front()
            .map_err(|_| ProtocolError::MissingFrame("service"))?;
        let service = String::from_utf8_lossy(&service_frame).into_owned();

        tracing::debug!(client = %sender, service = %service, "Client request");

        message.wrap(sender.to_frame(), true);

        if is_internal(service.as_bytes()) {
            self.service_internal(&service, message)
        } else {
            self.registry.enqueue_request(&service, message);
            self.dispatch(&service, now);
            Ok(())
        }
    }

    /// Answer an `mmi.*` request; `message` is `[client][""][body...]`
    fn service_internal(&mut self, service: &str, mut message: Envelope) -> Result<()> {
        let client = message.unwrap()?;

        let status = if service == MMI_SERVICE {
            let target = message
                .body()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            let has_workers = self
                .registry
                .get(&target)
                .is_some_and(|s| s.has_workers());
            if has_workers {
                MMI_STATUS_OK
            } else {
                MMI_STATUS_NOT_FOUND
            }
        } else {
            tracing::warn!(service = %service, "Internal service not implemented");
            MMI_STATUS_NOT_IMPLEMENTED
        };

        message.set_body(Bytes::from_static(status.as_bytes()));
        tracing::debug!(client = %client, service = %service, status = status, "Internal service reply");
        self.send_to_client(&client, service, message);
        Ok(())
    }

    /// Handle a worker message: `[command][payload...]`
    pub fn worker_process(&mut self, sender: Address, mut message: Envelope, now: Instant) -> Result<()> {
        let command_frame = message
            .pop_front()
            .map_err(|_| ProtocolError::MissingFrame("command"))?;
        let command = match Command::from_frame(&command_frame) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(worker = %sender, error = %e, "Ignoring worker message");
                return Ok(());
            }
        };

        let state = if self.workers.contains_key(&sender) {
            WorkerState::Known
        } else {
            WorkerState::Unknown
        };

        match transition(state, command, sender.is_internal()) {
            WorkerAction::Register => self.register_worker(sender, message, now),
            WorkerAction::RouteReply => self.route_reply(sender, message, now),
            WorkerAction::Refresh => {
                if let Some(worker) = self.workers.get_mut(&sender) {
                    worker.refresh(now, self.heartbeat_expiry);
                }
            }
            WorkerAction::Reject => {
                self.counters.protocol_violations += 1;
                tracing::warn!(worker = %sender, command = %command, state = ?state, "Worker protocol violation");
                self.delete_worker(&sender, true);
            }
            WorkerAction::Remove => self.delete_worker(&sender, false),
            WorkerAction::Ignore => {
                tracing::warn!(worker = %sender, command = %command, "Unexpected command from worker");
            }
        }

        Ok(())
    }

    fn register_worker(&mut self, sender: Address, mut message: Envelope, now: Instant) {
        let service = match message.pop_front() {
            Ok(frame) if !frame.is_empty() && !is_internal(&frame) => {
                String::from_utf8_lossy(&frame).into_owned()
            }
            _ => {
                self.counters.protocol_violations += 1;
                tracing::warn!(worker = %sender, "READY without a usable service name");
                self.delete_worker(&sender, true);
                return;
            }
        };

        let mut worker = WorkerEntry::new(sender.clone(), now, self.heartbeat_expiry);
        worker.service = Some(service.clone());
        self.workers.insert(sender.clone(), worker);
        self.registry.register_worker(&service, sender.clone());

        tracing::debug!(worker = %sender, service = %service, workers = self.workers.len(), "New worker");
        self.worker_waiting(&sender, now);
    }

    fn route_reply(&mut self, sender: Address, mut message: Envelope, now: Instant) {
        let client = match message.unwrap() {
            Ok(client) => client,
            Err(e) => {
                self.counters.protocol_violations += 1;
                tracing::warn!(worker = %sender, error = %e, "REPLY without a client address");
                self.delete_worker(&sender, true);
                return;
            }
        };

        let service = self
            .workers
            .get(&sender)
            .and_then(|w| w.service.clone())
            .unwrap_or_default();

        self.send_to_client(&client, &service, message);
        self.counters.replies_routed += 1;
        self.worker_waiting(&sender, now);
    }

    /// Refresh a worker's expiry, queue it as idle and dispatch its service
    fn worker_waiting(&mut self, address: &Address, now: Instant) {
        let Some(worker) = self.workers.get_mut(address) else {
            return;
        };
        worker.refresh(now, self.heartbeat_expiry);
        let expires_at = worker.expires_at;
        let Some(service) = worker.service.clone() else {
            return;
        };

        self.purge_workers(now);
        let assignments = self.registry.mark_idle(&service, address.clone(), expires_at);
        self.send_requests(assignments);
    }

    /// Purge dead workers, then pair idle workers with queued requests
    fn dispatch(&mut self, service: &str, now: Instant) {
        self.purge_workers(now);
        let assignments = self.registry.dispatch(service);
        self.send_requests(assignments);
    }

    fn send_requests(&mut self, assignments: Vec<Assignment>) {
        for Assignment { worker, request } in assignments {
            self.counters.requests_dispatched += 1;
            self.worker_send(&worker, Command::Request, None, Some(request));
        }
    }

    /// Delete every worker whose expiry has passed
    ///
    /// Purged workers get no DISCONNECT. Returns the number removed.
    pub fn purge_workers(&mut self, now: Instant) -> usize {
        let expired: Vec<Address> = self
            .workers
            .values()
            .filter(|w| w.is_expired(now))
            .map(|w| w.address.clone())
            .collect();

        for address in &expired {
            tracing::debug!(worker = %address, "Purging expired worker");
            self.delete_worker(address, false);
        }

        self.counters.workers_purged += expired.len() as u64;
        expired.len()
    }

    /// Remove a worker everywhere, optionally telling it to reconnect
    fn delete_worker(&mut self, address: &Address, disconnect: bool) {
        if disconnect {
            self.worker_send(address, Command::Disconnect, None, None);
        }

        if let Some(worker) = self.workers.remove(address) {
            if let Some(service) = &worker.service {
                self.registry.remove_worker(service, address);
            }
            tracing::debug!(
                worker = %address,
                disconnect = disconnect,
                workers = self.workers.len(),
                "Deleted worker"
            );
        }
    }

    /// Queue `[worker][""][MDPW01][command][option?][message...]`
    pub fn worker_send(
        &mut self,
        address: &Address,
        command: Command,
        option: Option<Bytes>,
        message: Option<Envelope>,
    ) {
        let mut message = message.unwrap_or_default();
        if let Some(option) = option {
            message.push_front(option);
        }

        if command != Command::Heartbeat {
            tracing::debug!(worker = %address, command = %command, "Sending to worker");
        }

        message.push_front(command.to_frame());
        message.push_front(Bytes::from_static(MDPW_WORKER));
        message.wrap(address.to_frame(), true);
        self.outbox.push_back(message);
    }

    /// Queue `[client][""][MDPC01][service][body...]`
    fn send_to_client(&mut self, client: &Address, service: &str, mut message: Envelope) {
        message.push_front(Bytes::copy_from_slice(service.as_bytes()));
        message.push_front(Bytes::from_static(MDPC_CLIENT));
        message.wrap(client.to_frame(), true);
        self.outbox.push_back(message);
    }

    /// Run the heartbeat round if its deadline has passed
    ///
    /// Purges expired workers and heartbeats every remaining worker, busy or
    /// idle. Returns true if a round ran.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        if now < self.heartbeat_at {
            return false;
        }

        self.purge_workers(now);

        let addresses: Vec<Address> = self.workers.keys().cloned().collect();
        for address in &addresses {
            self.worker_send(address, Command::Heartbeat, None, None);
        }
        tracing::trace!(workers = addresses.len(), "Heartbeat round");

        self.counters.heartbeats_sent += 1;
        self.heartbeat_at = now + self.heartbeat_interval;
        true
    }

    /// Time left until the next heartbeat round
    pub fn time_until_heartbeat(&self, now: Instant) -> Duration {
        self.heartbeat_at.saturating_duration_since(now)
    }

    /// Take all queued outbound messages
    pub fn drain_outbox(&mut self) -> impl Iterator<Item = Envelope> + '_ {
        self.outbox.drain(..)
    }

    /// Look up a worker
    pub fn worker(&self, address: &Address) -> Option<&WorkerEntry> {
        self.workers.get(address)
    }

    /// Number of known workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Service registry
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Snapshot of broker state
    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            workers: self.workers.len(),
            services: self.registry.len(),
            idle_workers: self.registry.idle_workers(),
            pending_requests: self.registry.pending_requests(),
            counters: self.counters,
            per_service: self.registry.service_stats(),
        }
    }
}
