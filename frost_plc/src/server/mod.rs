//! Register server: connection supervisor and per-client sessions.

pub mod session;
pub mod supervisor;

pub use session::{ClientSession, SessionEnd};
pub use supervisor::{ClientCounter, ClientGuard, ConnectionSupervisor};
