// readlist state managers
// Managers handle stateful operations: the record snapshot, optimistic
// mutations against the backend, and live push updates.

pub mod live_update_listener;
pub mod mutation_coordinator;
pub mod record_store;
