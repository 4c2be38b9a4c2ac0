pub mod actor;
pub mod auth;
pub mod config;
pub mod handler;
pub mod http;
pub mod key;
pub mod lock_info;
pub mod observability;
pub mod server;
pub mod service;
pub mod storage;

pub use auth::{AuthContext, Authenticator};
pub use handler::BaseHandler;
pub use http::StateHttpHandler;
pub use key::ProjectKey;
pub use lock_info::LockInfo;
pub use service::StateService;
pub use storage::BlobStore;
