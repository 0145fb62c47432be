//! HTTP layer: credential issuance and request dispatch.

pub mod dispatcher;
pub mod issuer;
