//! Service registry
//!
//! Per-service routing state: which workers serve a name, which of them
//! are idle, and which client requests are waiting.
//!
//! # Architecture
//!
//! ```text
//!                        ServiceRegistry
//!              ┌────────────────────────────────┐
//!              │ services: HashMap<name,        │
//!              │   ServiceEntry {               │
//!              │     workers:  HashSet<Address> │
//!              │     waiting:  ReadyWorkerQueue │
//!              │     requests: VecDeque<Env>    │
//!              │   }                            │
//!              │ >                              │
//!              └───────────────┬────────────────┘
//!                              │ dispatch()
//!                              ▼
//!                 Vec<Assignment { worker, request }>
//! ```
//!
//! Worker liveness lives in [`WorkerEntry`]; the broker owns the table of
//! those and keeps it consistent with the registry.

pub mod entry;
pub mod queue;
pub mod store;
pub mod worker;

pub use entry::{ServiceEntry, ServiceStats};
pub use queue::ReadyWorkerQueue;
pub use store::{Assignment, ServiceRegistry};
pub use worker::WorkerEntry;
