// readlist shared type definitions
// Each submodule defines types used across the engine.

pub mod bookmark;
pub mod change;
pub mod errors;
