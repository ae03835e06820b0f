//! PIN authorization with lockout
//!
//! # State Machine
//!
//! ```text
//!            N consecutive failures
//! UNLOCKED ─────────────────────────▶ LOCKED
//!    ▲                                  │
//!    └──── locked_until elapsed ────────┤
//!    └──── admin reset ─────────────────┘
//! ```
//!
//! Validation while LOCKED is rejected without consuming an attempt. A
//! successful validation clears the failure counter.

pub mod record;
pub mod vault;

pub use record::{LockoutPolicy, PinRecord, PinState};
pub use vault::{ArgonPinVault, PinError, PinHashParams, PinVault};
