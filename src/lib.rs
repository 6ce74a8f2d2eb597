//! readlist — client-side bookmark and reading-list state engine.
//!
//! Maintains a consistent in-memory view of a user's bookmark collection
//! under concurrent local edits, optimistic updates, and asynchronous backend
//! synchronization, and derives filtered/sorted/aggregated views from it.
//! Rendering, routing, auth and the backend storage engine live elsewhere;
//! this crate only depends on the collaborator traits in
//! [`services::persistence`].

pub mod managers;
pub mod services;
pub mod types;
