//! # cl-04-update-bridge
//!
//! Fan-out of ledger updates to live subscribers.
//!
//! ## Shape
//!
//! ```text
//! ┌─────────────┐   ordered feed   ┌──────────────┐
//! │   Ledger    │ ───────────────→ │    Bridge    │
//! └─────────────┘   (one writer)   │    (pump)    │
//!                                  └──────┬───────┘
//!                     ┌───────────────────┼───────────────────┐
//!                     ▼                   ▼                   ▼
//!               subscriber A        subscriber B        subscriber C
//!               (own cursor)        (own cursor)        (own cursor)
//! ```
//!
//! Every subscriber sees every update published after its subscribe call,
//! in commit order, the same order for all subscribers. A subscriber that
//! stops draining loses only its own sequence: its cursor overruns, the
//! stream ends with [`SubscriptionError::Overrun`], and nobody else
//! notices. History is never replayed into the live sequence; a snapshot
//! is a separate one-shot ledger query.

pub mod bridge;
pub mod bus;
pub mod filter;
pub mod subscription;

pub use bridge::LedgerUpdateBridge;
pub use bus::{UpdateBus, UpdatePublisher};
pub use filter::UpdateFilter;
pub use subscription::{SubscriptionError, UpdateStream, UpdateSubscription};

/// Updates buffered per subscriber cursor before an overrun is declared.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 512;
