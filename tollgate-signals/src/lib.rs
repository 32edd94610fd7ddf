//! # tollgate-signals
//!
//! A receiver for SSF Security Event Tokens.
//!
//! When the upstream identity stack learns that an account changed outside
//! the app (a password reset, an email rewrite, a full purge) it delivers a
//! signed SET here. The receiver verifies the signature against the
//! transmitter's key set, matches the payload against the known event
//! schemas, and applies the consequence to the local user directory:
//! sessions revoked, email rewritten, or the account removed.
//!
//! The receiver endpoint sits behind the bearer authorizer from
//! `tollgate-auth`; only callers holding a valid user-pool access token can
//! deliver events.

pub mod directory;
pub mod error;
pub mod events;
pub mod receiver;
pub mod set;

pub mod prelude {
    pub use crate::directory::{DirectoryUser, MemoryUserDirectory, UserDirectory};
    pub use crate::error::{Error, Result};
    pub use crate::events::{
        AccountPurgedEvent, ChangeType, CredentialChangeEvent, CredentialType, SubjectIdentifier,
    };
    pub use crate::receiver::{SignalsReceiver, SignalsReceiverBuilder};
    pub use crate::set::{SetConfig, SetVerifier};
}

pub use error::{Error, Result};
