//! Service registry implementation
//!
//! Holds every service the broker has seen, with its bound workers, idle
//! queue and pending requests. The registry never performs I/O: dispatch
//! returns the (worker, request) pairs it selected and the broker turns
//! them into REQUEST messages.

use std::collections::HashMap;
use std::time::Instant;

use crate::protocol::{Address, Envelope};

use super::entry::{ServiceEntry, ServiceStats};

/// A request handed to a specific worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Worker selected for the request
    pub worker: Address,
    /// Client request, already wrapped with the client's reply address
    pub request: Envelope,
}

/// Registry of all services, keyed by name
///
/// Services are created on first reference and kept when empty.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, ServiceEntry>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a service, creating it if needed
    pub fn get_or_create(&mut self, name: &str) -> &mut ServiceEntry {
        self.services.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(service = %name, "New service");
            ServiceEntry::new(name)
        })
    }

    /// Look up a service without creating it
    pub fn get(&self, name: &str) -> Option<&ServiceEntry> {
        self.services.get(name)
    }

    /// Queue a client request
    pub fn enqueue_request(&mut self, name: &str, request: Envelope) {
        self.get_or_create(name).requests.push_back(request);
    }

    /// Bind a worker to a service
    ///
    /// The worker is not idle until [`mark_idle`](Self::mark_idle).
    pub fn register_worker(&mut self, name: &str, worker: Address) {
        self.get_or_create(name).workers.insert(worker);
    }

    /// Put a worker in the idle queue and dispatch
    pub fn mark_idle(&mut self, name: &str, worker: Address, expires_at: Instant) -> Vec<Assignment> {
        self.get_or_create(name).waiting.insert(worker, expires_at);
        self.dispatch(name)
    }

    /// Pair idle workers with pending requests
    ///
    /// Workers are taken earliest-expiry first and requests oldest first.
    /// A selected worker leaves the idle queue and does not return until it
    /// is marked idle again.
    pub fn dispatch(&mut self, name: &str) -> Vec<Assignment> {
        let Some(service) = self.services.get_mut(name) else {
            return Vec::new();
        };

        let mut assignments = Vec::new();
        while !service.waiting.is_empty() && !service.requests.is_empty() {
            let (Some(worker), Some(request)) =
                (service.waiting.extract_min(), service.requests.pop_front())
            else {
                break;
            };
            assignments.push(Assignment { worker, request });
        }

        if !assignments.is_empty() {
            tracing::debug!(
                service = %name,
                dispatched = assignments.len(),
                idle = service.waiting.len(),
                pending = service.requests.len(),
                "Service dispatched"
            );
        }

        assignments
    }

    /// Unbind a worker, removing it from the idle queue too
    pub fn remove_worker(&mut self, name: &str, worker: &Address) {
        if let Some(service) = self.services.get_mut(name) {
            service.workers.remove(worker);
            service.waiting.remove(worker);
        }
    }

    /// Number of services
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no service exists
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Idle workers across all services
    pub fn idle_workers(&self) -> usize {
        self.services.values().map(ServiceEntry::idle_count).sum()
    }

    /// Pending requests across all services
    pub fn pending_requests(&self) -> usize {
        self.services.values().map(ServiceEntry::pending_count).sum()
    }

    /// Per-service snapshots, sorted by name
    pub fn service_stats(&self) -> Vec<ServiceStats> {
        let mut stats: Vec<ServiceStats> = self.services.values().map(ServiceStats::from).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn request(body: &'static str) -> Envelope {
        let mut env = Envelope::with_body(body);
        env.wrap("client", true);
        env
    }

    #[test]
    fn test_get_or_create_is_lazy() {
        let mut registry = ServiceRegistry::new();
        assert!(registry.get("echo").is_none());

        registry.get_or_create("echo");
        registry.get_or_create("echo");
        assert_eq!(registry.len(), 1);
        assert!(!registry.get("echo").unwrap().has_workers());
    }

    #[test]
    fn test_request_waits_for_worker() {
        let mut registry = ServiceRegistry::new();
        registry.enqueue_request("echo", request("r1"));
        assert!(registry.dispatch("echo").is_empty());
        assert_eq!(registry.pending_requests(), 1);

        let worker = Address::from("w1");
        registry.register_worker("echo", worker.clone());
        let assigned = registry.mark_idle("echo", worker.clone(), Instant::now());

        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].worker, worker);
        assert_eq!(assigned[0].request.body().unwrap(), "r1");
        assert_eq!(registry.pending_requests(), 0);
    }

    #[test]
    fn test_fifo_per_service() {
        let mut registry = ServiceRegistry::new();
        let worker = Address::from("w1");
        registry.register_worker("echo", worker.clone());

        registry.enqueue_request("echo", request("r1"));
        registry.enqueue_request("echo", request("r2"));
        registry.enqueue_request("echo", request("r3"));

        let mut order = Vec::new();
        let now = Instant::now();
        for i in 0..3 {
            let assigned = registry.mark_idle("echo", worker.clone(), now + Duration::from_secs(i));
            assert_eq!(assigned.len(), 1);
            order.push(assigned[0].request.body().unwrap().clone());
        }

        assert_eq!(order, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_worker_selected_at_most_once() {
        let mut registry = ServiceRegistry::new();
        let worker = Address::from("w1");
        registry.register_worker("echo", worker.clone());
        registry.mark_idle("echo", worker.clone(), Instant::now());

        registry.enqueue_request("echo", request("r1"));
        registry.enqueue_request("echo", request("r2"));

        let assigned = registry.dispatch("echo");
        assert_eq!(assigned.len(), 1);
        assert!(!registry.get("echo").unwrap().is_idle(&worker));

        // Still busy: the second request stays queued
        assert!(registry.dispatch("echo").is_empty());
        assert_eq!(registry.pending_requests(), 1);
    }

    #[test]
    fn test_earliest_expiry_dispatched_first() {
        let mut registry = ServiceRegistry::new();
        let now = Instant::now();
        let older = Address::from("older");
        let newer = Address::from("newer");

        registry.register_worker("echo", older.clone());
        registry.register_worker("echo", newer.clone());
        registry.mark_idle("echo", newer.clone(), now + Duration::from_secs(2));
        registry.mark_idle("echo", older.clone(), now + Duration::from_secs(1));

        registry.enqueue_request("echo", request("r1"));
        let assigned = registry.dispatch("echo");
        assert_eq!(assigned[0].worker, older);
    }

    #[test]
    fn test_remove_worker() {
        let mut registry = ServiceRegistry::new();
        let worker = Address::from("w1");
        registry.register_worker("echo", worker.clone());
        registry.mark_idle("echo", worker.clone(), Instant::now());

        registry.remove_worker("echo", &worker);

        let service = registry.get("echo").unwrap();
        assert_eq!(service.worker_count(), 0);
        assert_eq!(service.idle_count(), 0);
        // Empty services are kept
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_service_stats_sorted() {
        let mut registry = ServiceRegistry::new();
        registry.get_or_create("zeta");
        registry.enqueue_request("alpha", request("r1"));

        let stats = registry.service_stats();
        assert_eq!(stats[0].name, "alpha");
        assert_eq!(stats[0].pending_requests, 1);
        assert_eq!(stats[1].name, "zeta");
    }
}
