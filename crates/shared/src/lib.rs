//! Domain model shared by the forecast map server, web client and tools.

pub mod districts;
pub mod feature;
pub mod models;
pub mod session;
pub mod style;
pub mod verify;
