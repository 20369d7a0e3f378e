//! Authentication
//!
//! - `password`: credential hashing and the password acceptance policy
//! - `token`: signed short-lived access tokens
//! - `session`: login, refresh and revocation on top of the store
//! - `gate`: resolving the acting user of a request
//! - `clock`: injectable time source

pub mod clock;
pub mod gate;
pub mod password;
pub mod session;
pub mod token;

pub use clock::{Clock, FixedClock, SystemClock};
pub use gate::{extract_token, Gate, HeaderLookup, API_KEY, AUTHORIZATION, BEARER};
pub use password::{entropy, CredentialManager};
pub use session::{Session, SessionManager};
pub use token::{Claims, TokenSigner};
