// readlist services
// Services provide stateless functionality: view projection, metadata
// derivation, and the collaborator contracts for persistence and push.

pub mod metadata;
pub mod persistence;
pub mod projection_engine;
