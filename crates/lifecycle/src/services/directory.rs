//! Customer and supplier directory trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, SupplierId};

use crate::error::LifecycleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyStatus {
    Active,
    Inactive,
}

/// A customer or supplier as the directory knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    pub name: String,
    pub email: String,
    pub status: PartyStatus,
}

impl Party {
    pub fn active(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            status: PartyStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PartyStatus::Active
    }
}

/// Looks up customers and suppliers by id.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn customer(&self, id: CustomerId) -> Result<Option<Party>, LifecycleError>;

    async fn supplier(&self, id: SupplierId) -> Result<Option<Party>, LifecycleError>;
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    customers: HashMap<CustomerId, Party>,
    suppliers: HashMap<SupplierId, Party>,
    unavailable: bool,
}

/// In-memory directory for tests and the demo binary.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_customer(&self, id: CustomerId, party: Party) {
        self.state.write().unwrap().customers.insert(id, party);
    }

    pub fn add_supplier(&self, id: SupplierId, party: Party) {
        self.state.write().unwrap().suppliers.insert(id, party);
    }

    /// Registers an active customer and returns its id.
    pub fn register_customer(&self, name: &str, email: &str) -> CustomerId {
        let id = CustomerId::new();
        self.add_customer(id, Party::active(name, email));
        id
    }

    /// Registers an active supplier and returns its id.
    pub fn register_supplier(&self, name: &str, email: &str) -> SupplierId {
        let id = SupplierId::new();
        self.add_supplier(id, Party::active(name, email));
        id
    }

    pub fn set_customer_status(&self, id: CustomerId, status: PartyStatus) {
        if let Some(party) = self.state.write().unwrap().customers.get_mut(&id) {
            party.status = status;
        }
    }

    pub fn set_supplier_status(&self, id: SupplierId, status: PartyStatus) {
        if let Some(party) = self.state.write().unwrap().suppliers.get_mut(&id) {
            party.status = status;
        }
    }

    /// Configures every lookup to fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn customer(&self, id: CustomerId) -> Result<Option<Party>, LifecycleError> {
        let state = self.state.read().unwrap();
        if state.unavailable {
            return Err(LifecycleError::Directory("directory unavailable".to_string()));
        }
        Ok(state.customers.get(&id).cloned())
    }

    async fn supplier(&self, id: SupplierId) -> Result<Option<Party>, LifecycleError> {
        let state = self.state.read().unwrap();
        if state.unavailable {
            return Err(LifecycleError::Directory("directory unavailable".to_string()));
        }
        Ok(state.suppliers.get(&id).cloned())
    }
}
