//! # Courier-Ledger Test Suite
//!
//! Unified test crate containing the cross-subsystem scenarios:
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── protocol.rs       # End-to-end flows: happy path, rejection,
//!     │                     # timeout, cancellation, resume, double spend
//!     └── subscriptions.rs  # Update stream fan-out, ordering, overrun
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cl-tests
//! cargo test -p cl-tests integration::protocol::
//! ```

#![allow(dead_code)]

pub mod integration;
