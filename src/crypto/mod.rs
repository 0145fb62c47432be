//! Cryptographic primitives for request signing.

pub mod digest;
pub mod signing;
