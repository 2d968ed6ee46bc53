//! Snapshot replication between an authoritative context and replicas.

pub mod channel;
pub mod receiver;
pub mod sender;
pub mod wire;

pub use receiver::{dispatch, drain_inbox, DispatchStats, Inbox, SnapshotReceiver, StoreReceiver};
pub use sender::SnapshotSender;
