//! The convergence engine: the I/O-facing state machine that classifies
//! inbound frames, drives epidemic forwarding, sends ACKs, and runs the
//! discovery and retransmit timers.

mod ack;
mod age;
mod application;
mod config;
mod engine;
mod error;
mod link;
mod message;
mod stats;

pub use application::{Application, ApplicationHandle, Registration, RegistrationStatus};
pub use config::{Config, RouterKind};
pub use engine::{channel, spawn_discovery_ticker, spawn_retransmit_ticker, try_post, Engine};
pub use error::EngineError;
pub use link::{L2Error, LinkLayer};
pub use message::Message;
pub use stats::Stats;
