//! Apply-time half of the engine: input resolution against recorded
//! outputs, secret preflight and isolation, and the tier-by-tier executor.
//!
//! Everything structural lives in `strata-core`; this crate only runs a
//! plan that already validated and tiered cleanly.

#![forbid(unsafe_code)]

pub mod executor;
pub mod resolve;
pub mod secrets;
pub mod vars;

pub use executor::{
    ApplyError, ApplyExecutor, ApplyRequest, CancelFlag, CompositeEventSink, EchoExecutor, Event,
    EventSink, ExecutionResult, Executor, ExecutorConfig, InstanceKey, NodeStatus, NoOpEventSink,
    RunError, StdoutEventSink,
};
pub use resolve::{NodeOutputs, Resolved, ResolveError};
pub use secrets::{EnvSecrets, SecretSource, SecretValue, StaticSecrets};
pub use vars::{ChainedVars, EnvVars, MemoizedVars, StaticVars, VariableSource};
