use crate::auth::Authenticator;
use crate::service::StateService;
use std::sync::Arc;

/// Base handler holding the components every request needs.
/// The HTTP layer wraps this.
#[derive(Clone)]
pub struct BaseHandler {
    pub auth: Arc<dyn Authenticator>,
    pub service: StateService,
    /// Realm advertised in `WWW-Authenticate` on 401 responses
    pub realm: String,
}

impl BaseHandler {
    pub fn new(auth: Arc<dyn Authenticator>, service: StateService) -> Self {
        Self {
            auth,
            service,
            realm: "estado".to_string(),
        }
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }
}
