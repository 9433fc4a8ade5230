//! Event types broadcast by the controller to status / notification sinks.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` so hosts can
//! forward them over whatever bus drives their UI.

pub mod events;
