pub mod reconcile;
pub mod sync;
pub mod tracker;

pub use reconcile::reconcile_selection;
pub use sync::{JobSync, TickOutcome};
pub use tracker::{StalePolicy, TrackedJob};
