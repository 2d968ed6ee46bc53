pub mod arena;
pub mod config;
pub mod debug;
pub mod ecs;
pub mod error;
pub mod flags;
pub mod net;
pub mod scheduler;
pub mod spatial;
pub mod store;
pub mod util;
