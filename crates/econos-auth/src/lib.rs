//! Domain-separated typed-data authorization signing (C4).

mod error;
mod signer;
mod typed_data;

pub use error::AuthError;
pub use signer::{AuthorizationPayload, AuthorizationSigner, SignedAuthorization};
pub use typed_data::{authorization_domain, Eip712Domain};
