pub mod account;
pub mod account_linking;
pub mod account_repository;
pub mod providers;
pub mod state_manager;
pub mod types;

pub use account::{CreateOAuthAccountParams, OAuthAccount};
pub use account_linking::{AccountLinkingResult, AccountLinkingService};
pub use account_repository::{OAuthAccountRepository, PostgresOAuthAccountRepository};
pub use providers::{OAuthProvider, OAuthResult};
pub use state_manager::OAuthStateManager;
pub use types::{OAuthCallbackParams, OAuthState, OAuthUserInfo, Provider, TokenResponse};
