//! A sample registered application: echoes every payload it receives
//! back to the bundle's source endpoint.
//!
//! Demonstration only — the convergence engine never depends on this
//! crate, only on the `driftmesh_engine::Application` trait it
//! implements; application registration is an external collaborator the
//! engine treats as opaque. An echo service typically recovers the
//! delivered bundle's source/destination and replies by swapping them;
//! here the source is handed to `deliver` directly rather than
//! re-parsed, since this stack's `Application` trait already surfaces
//! it.

use std::sync::OnceLock;

use async_trait::async_trait;
use driftmesh_bundle::Eid;
use driftmesh_engine::{Application, ApplicationHandle, Message, Registration, RegistrationStatus};
use tokio::sync::mpsc;
use tracing::debug;

/// Registers on one service number and, on delivery, posts a fresh
/// [`Message::Send`] back to the payload's source.
///
/// The channel sender is attached after construction via [`EchoApp::attach`]
/// rather than passed to `new`, since the engine's own message channel
/// (which this app posts replies onto) is itself created after the
/// `Application` trait object is handed to `Engine::new` — a two-step
/// "construct, then wire the sink" shape.
pub struct EchoApp {
    service_num: u32,
    tx: OnceLock<mpsc::Sender<Message>>,
}

impl EchoApp {
    pub fn new(service_num: u32) -> Self {
        Self { service_num, tx: OnceLock::new() }
    }

    /// Wires this application to the convergence loop's message channel.
    /// Only the first call takes effect.
    pub fn attach(&self, tx: mpsc::Sender<Message>) {
        let _ = self.tx.set(tx);
    }
}

#[async_trait]
impl Application for EchoApp {
    fn registration(&self, service_num: u32) -> Registration {
        if service_num == self.service_num {
            Registration {
                status: RegistrationStatus::Active,
                handle: ApplicationHandle(self.service_num as u64),
            }
        } else {
            Registration { status: RegistrationStatus::Unregistered, handle: ApplicationHandle(0) }
        }
    }

    async fn deliver(&self, _handle: ApplicationHandle, source: Eid, payload: Vec<u8>) {
        debug!(%source, len = payload.len(), "echoing payload back to source");
        let Some(tx) = self.tx.get() else {
            return;
        };
        let _ = tx
            .send(Message::Send {
                service_num: self.service_num,
                destination: source,
                payload,
                lifetime_s: None,
            })
            .await;
    }
}
