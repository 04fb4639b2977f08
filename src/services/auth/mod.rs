pub mod context;
pub mod credential_store;
pub mod error;
pub mod factory;
pub mod gatekeeper;
pub mod login;
pub mod password;
pub mod route_classifier;
pub mod token_codec;

pub use context::{AuthenticatedPrincipal, AuthenticationContext};
pub use credential_store::{CredentialStore, InMemoryCredentialStore};
pub use error::AuthError;
pub use factory::build_auth_components;
pub use gatekeeper::AuthenticationGatekeeper;
pub use login::LoginService;
pub use password::PasswordVerifier;
pub use route_classifier::{AccessPolicy, RouteClassifier};
pub use token_codec::TokenCodec;
