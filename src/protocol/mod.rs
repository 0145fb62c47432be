//! Wire models exchanged with the ELS API.

pub mod credential;
