/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 * - Clone is cheap (Arc inside); everything here is immutable after start-up
 */
use std::sync::Arc;

use crate::services::auth::{AuthenticationGatekeeper, LoginService, factory::AuthComponents};

#[derive(Clone, Debug)]
pub struct AppState {
    pub gatekeeper: Arc<AuthenticationGatekeeper>,
    pub login: Arc<LoginService>,
}

impl AppState {
    pub fn new(gatekeeper: Arc<AuthenticationGatekeeper>, login: Arc<LoginService>) -> Self {
        Self { gatekeeper, login }
    }
}

impl From<AuthComponents> for AppState {
    fn from(components: AuthComponents) -> Self {
        Self::new(components.gatekeeper, components.login)
    }
}
