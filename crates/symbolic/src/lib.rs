//! Exact symbolic equivalence checking on a pool of worker processes.
//!
//! Equivalence checks are CPU-bound, so they run in `symbolic-worker`
//! child processes behind a semaphore-limited [`SymbolicPool`]. A slow or
//! crashing check only costs its own worker: timeouts recycle the
//! process and every failure degrades to "not proven equal".
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use symbolic::{SymbolicPool, SymbolicPoolConfig, SymbolicVerifier};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = SymbolicPool::new(SymbolicPoolConfig::default()).await?;
//! let verifier = SymbolicVerifier::new(Arc::new(pool));
//!
//! assert!(verifier.verify_equation("(a+b)*(a-b)", "a**2 - b**2").await);
//! assert!(!verifier.verify_equation("x+1", "x+2").await);
//! verifier.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod cas;
pub mod pool;
pub mod protocol;
pub mod types;
pub mod verifier;
pub mod worker;

pub use pool::{SymbolicPool, WorkerGuard};
pub use protocol::{WorkerCommand, WorkerFault, WorkerReply};
pub use types::{discover_worker, Domain, Equation, ProofStep, SymbolicError, SymbolicPoolConfig};
pub use verifier::{
    parse_expression, EquivalenceVerdict, ParsedExpr, StepCheck, StepsReport, SymbolicVerifier,
};
pub use worker::SymbolicWorker;
