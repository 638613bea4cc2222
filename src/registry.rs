//! Registry for managing per-endpoint request gates.
//!
//! One gate models one logical endpoint's backoff state. Clients that talk to
//! several endpoints keep a gate per endpoint; the registry provides named
//! access and control (reset/inspection) over them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::gate::{GateSnapshot, RequestGate};
use tracing::warn;

/// Errors from gate registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The requested endpoint id was not found.
    NotFound {
        /// Identifier that could not be located.
        id: String,
    },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::NotFound { id } => write!(f, "gate '{id}' not found"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Trait for gate registries (injectable into whatever owns the client).
pub trait GateRegistry: Send + Sync + std::fmt::Debug {
    /// Register a gate by endpoint id, overwriting any existing entry.
    ///
    /// Overwrite is deliberate: the last registration wins. Callers should
    /// use unique ids per endpoint and treat overwrites as a replacement, not
    /// a merge of state.
    fn register(&self, id: String, gate: RequestGate);
    /// Get the gate for an endpoint; the returned clone shares its state.
    fn get(&self, id: &str) -> Option<RequestGate>;
    /// Reset an endpoint's gate to its unrestricted state, erroring if missing.
    fn reset(&self, id: &str) -> Result<(), RegistryError>;
    /// Snapshot all gates sorted by id.
    fn snapshot(&self) -> Vec<(String, GateSnapshot)>;
}

/// In-memory implementation backed by an RwLock.
#[derive(Default, Clone, Debug)]
pub struct InMemoryGateRegistry {
    inner: Arc<RwLock<HashMap<String, RequestGate>>>,
}

impl InMemoryGateRegistry {
    /// Get the gate for an endpoint, registering a default one if absent.
    pub fn get_or_register(&self, id: &str) -> RequestGate {
        if let Some(gate) = self.get(id) {
            return gate;
        }
        let mut map = self.inner.write().expect("gate registry poisoned");
        map.entry(id.to_string()).or_insert_with(RequestGate::new).clone()
    }
}

impl GateRegistry for InMemoryGateRegistry {
    fn register(&self, id: String, gate: RequestGate) {
        let mut map = self.inner.write().expect("gate registry poisoned");
        if map.contains_key(&id) {
            warn!(target: "turnstile::registry", id = %id, "gate id replaced; last registration wins");
        }
        map.insert(id, gate);
    }

    fn get(&self, id: &str) -> Option<RequestGate> {
        let guard = self.inner.read().expect("gate registry poisoned");
        guard.get(id).cloned()
    }

    fn reset(&self, id: &str) -> Result<(), RegistryError> {
        let guard = self.inner.read().expect("gate registry poisoned");
        match guard.get(id) {
            Some(gate) => {
                gate.reset();
                Ok(())
            }
            None => Err(RegistryError::NotFound { id: id.to_string() }),
        }
    }

    fn snapshot(&self) -> Vec<(String, GateSnapshot)> {
        let map = self.inner.read().expect("gate registry poisoned");
        let mut entries: Vec<(String, GateSnapshot)> =
            map.iter().map(|(k, v)| (k.clone(), v.snapshot())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
