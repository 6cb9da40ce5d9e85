//! Addressable multi-frame transport over TCP
//!
//! A minimal router/dealer pair: the router tags every inbound message
//! with the sender's identity and routes outbound messages by identity.

pub mod codec;
pub mod dealer;
pub mod router;

pub use codec::FrameCodec;
pub use dealer::DealerSocket;
pub use router::RouterSocket;
