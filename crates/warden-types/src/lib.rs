//! # warden-types
//!
//! Types shared by every stage of the Warden gating pipeline.
//!
//! - **Identifiers**: `DeviceId` (the calling device) and `IdentityId`
//!   (an enrolled operator identity claimed by authentication evidence)
//! - **Operator/action classes**: `EmotionalStateClass`, `ActionScope`,
//!   `CapabilityFit`
//! - **Clock**: injectable time source so cooldowns, expiries and trailing
//!   windows are testable without sleeping
//! - **ConfigCell**: immutable configuration snapshots swapped atomically
//!   behind a versioned pointer

pub mod cell;
pub mod clock;
pub mod ids;
pub mod operator;

pub use cell::{ConfigCell, Versioned};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use ids::{DeviceId, IdentityId};
pub use operator::{ActionScope, CapabilityFit, EmotionalStateClass};
