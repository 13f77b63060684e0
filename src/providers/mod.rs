pub mod amber_auth;
pub mod amber_provider;
pub mod util;

pub use amber_auth::{AuthMode, CredentialManager, TokenPair};
pub use amber_provider::{FetchState, FetcherState, PriceFetcher, RefreshOutcome};
