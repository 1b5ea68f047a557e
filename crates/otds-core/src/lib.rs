//! # otds-core
//!
//! Data model for the Lapis operational-transform document store:
//! - Versioned document snapshots
//! - Operation requests and their wire form
//! - Presence ops and stores
//! - The type provider contract and the registry that resolves it
//! - The error taxonomy shared by every component
//!
//! The algorithms that act on these types live in `otds-engine`.

pub mod clock;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod presence;
pub mod provider;
pub mod registry;
pub mod request;
pub mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{OtError, ProviderError, Result};
pub use presence::{PresenceOp, PresencePath, PresenceStore, ReservedKeyRule, CURSOR_KEY};
pub use provider::{ProviderResult, Side, TypeProvider};
pub use registry::{RegistryBuilder, TypeRegistry};
pub use request::{Action, Hook, Request};
pub use snapshot::{Content, Metadata, Snapshot};
