//! Adapter-agnostic trading primitives.3-§4.5.

pub mod params;
pub mod setup_guard;
pub mod submit;
pub mod traits;

pub use params::{Operation, OperationTask};
pub use setup_guard::TokenSetupGuard;
pub use traits::{DexAdapter, ExecutionOutcome};
