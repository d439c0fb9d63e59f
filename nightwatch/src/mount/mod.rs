//! Mount protocol engine (§4.A): component A in the spec's component table.

pub mod lx200;
pub mod onstepx;
pub mod transport;

pub use lx200::{ConnectionState, MountConnection, MountEngine, MountStatus, PierSide, TrackingRate};
pub use onstepx::{DriverFault, OnStepXExtended, PecStatus};
