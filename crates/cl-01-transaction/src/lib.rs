//! # cl-01-transaction
//!
//! Transaction construction and contract validation.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Transaction Builder**: assembles an unsigned `Send` transaction from
//!   a message record and the notary identity. Pure assembly, never fails.
//! - **Message Contract**: deterministic structural validation re-run by
//!   every party that signs, so it depends on nothing local.
//!
//! ```text
//! MessageRecord ──build()──→ UnsignedTransaction ──validate()──→ Ok | ContractViolation
//! ```

pub mod builder;
pub mod contract;
pub mod error;

pub use builder::TransactionBuilder;
pub use contract::MessageContract;
pub use error::ContractViolation;
