//! Domain-level client features and their shared logic. Routes import these
//! modules to keep navigation focused while security and API handling live in
//! dedicated feature areas.

pub mod auth;
