pub mod reconcile;
pub mod regions;
