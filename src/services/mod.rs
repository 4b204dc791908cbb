pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

pub mod credentials;
pub use credentials::{CredentialError, CredentialStore};

pub mod tokens;
pub use tokens::{AccessClaims, RefreshClaims, TokenError, TokenKind, TokenPair, TokenService};

pub mod notifier;
pub use notifier::{LogNotifier, MemoryNotifier, Notifier};

pub mod validation;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, AuthSession, RegisterInput};
pub use auth_service_impl::SeaOrmAuthService;

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{AccountError, AccountService, Actor};
pub use account_service_impl::SeaOrmAccountService;
