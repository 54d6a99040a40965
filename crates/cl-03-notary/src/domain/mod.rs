//! Domain logic of the ordering authority.

pub mod authority;
