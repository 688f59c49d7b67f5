//! Authentication: credential storage, the token gateway, and session flows.

pub mod credentials;
pub mod gateway;
pub mod libsql_store;
pub mod session;

pub use credentials::{CredentialPair, CredentialStore, MemoryCredentialStore};
pub use gateway::TokenAuthGateway;
pub use libsql_store::LibSqlCredentialStore;
pub use session::{RegisterForm, SessionService};
