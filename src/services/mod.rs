//! Business logic services

pub mod auth;
pub mod gate;
pub mod inventory;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub inventory: inventory::InventoryService,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            inventory: inventory::InventoryService::new(repository),
        }
    }
}
