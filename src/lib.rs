//! Callsheet server - event operations coordination backend

pub mod access;
pub mod api;
pub mod budget;
pub mod delegation;
pub mod error;
pub mod events;
pub mod hierarchy;
pub mod identity;
pub mod models;
pub mod provisioning;
pub mod store;
pub mod templates;

use std::sync::Arc;

use sqlx::SqlitePool;

use access::{AccessControlEngine, RoleCapabilityMatrix};
use budget::BudgetWorkflowEngine;
use delegation::DelegationEngine;
use events::EventBus;
use identity::Identity;
use provisioning::ProvisioningEngine;
use store::Store;
use templates::TemplateApplicationEngine;

/// Application state shared across handlers
pub struct AppState {
    pub store: Store,
    pub identity: Identity,
    pub events: EventBus,
    pub access: AccessControlEngine,
    pub provisioning: ProvisioningEngine,
    pub delegation: DelegationEngine,
    pub budget: BudgetWorkflowEngine,
    pub templates: TemplateApplicationEngine,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Self::with_matrix(pool, Arc::new(RoleCapabilityMatrix::builtin()))
    }

    /// Build the engine stack around an injected role matrix.
    pub fn with_matrix(pool: SqlitePool, matrix: Arc<RoleCapabilityMatrix>) -> Arc<Self> {
        let store = Store::new(pool);
        let events = EventBus::new();
        let access = AccessControlEngine::new(store.clone(), matrix);

        Arc::new(Self {
            identity: Identity::Tokens(store.clone()),
            provisioning: ProvisioningEngine::new(store.clone(), access.clone(), events.clone()),
            delegation: DelegationEngine::new(store.clone(), access.clone(), events.clone()),
            budget: BudgetWorkflowEngine::new(store.clone(), access.clone(), events.clone()),
            templates: TemplateApplicationEngine::new(
                store.clone(),
                access.clone(),
                events.clone(),
            ),
            access,
            events,
            store,
        })
    }
}
