//! Majordomo protocol primitives
//!
//! Frame layouts as they appear on the broker's router socket:
//!
//! ```text
//! client -> broker  [sender][""][MDPC01][service][body...]
//! broker -> client  [client][""][MDPC01][service][body...]
//! worker -> broker  [sender][""][MDPW01][command][payload...]
//! broker -> worker  [worker][""][MDPW01][command][payload...]
//! ```
//!
//! A REQUEST payload is `[client][""][body...]`; the worker hands the same
//! reply address back in front of its REPLY body.

pub mod address;
pub mod command;
pub mod constants;
pub mod envelope;

pub use address::Address;
pub use command::Command;
pub use envelope::Envelope;
