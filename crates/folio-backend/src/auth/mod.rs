pub(crate) mod navigator;
mod refresh;
pub(crate) mod store;

pub use navigator::{BrowserNavigator, Navigator, NoopNavigator};
pub use refresh::{RefreshCoordinator, TokenCallback, REFRESH_MUTATION};
pub use store::{
    CookieCredentialStore, CredentialPair, CredentialStore, FileTokenStore,
    MemoryCredentialStore, StoreError, StoredCredentials,
};
