use async_trait::async_trait;
use driftmesh_bundle::Eid;

/// Whether a registered application is currently willing to receive
/// deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Active,
    Passive,
    Unregistered,
}

/// An opaque handle identifying a registered application. The engine
/// never inspects it; it is only round-tripped back to
/// [`Application::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApplicationHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub status: RegistrationStatus,
    pub handle: ApplicationHandle,
}

/// The application registry the convergence engine depends on.
/// Concrete registries (e.g. `driftmesh-echo-app`) are supplied by the
/// binary, not implemented in this crate.
#[async_trait]
pub trait Application: Send + Sync {
    fn registration(&self, service_num: u32) -> Registration;

    /// Delivers a payload to the application, along with the bundle's
    /// source endpoint. The source is passed because a registered
    /// application commonly needs it to reply (e.g. an echo service).
    async fn deliver(&self, handle: ApplicationHandle, source: Eid, payload: Vec<u8>);
}
