pub mod engine;
pub mod matcher;
pub mod normalizer;
pub mod numeric;
pub mod registry;

pub use engine::{reconcile, reconcile_batch, Reconciliation, ReconcileJob, ReconciliationEngine};
pub use matcher::{MatchSettings, Matcher};
pub use registry::{ReconTool, RunContext, ToolInput, ToolOutput, ToolRegistry, VendorProfile};
