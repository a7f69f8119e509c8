mod credential;
mod endpoint;
mod manager;
mod presenter;

pub use credential::Credential;
pub use manager::CredentialManager;
