//! The analysis pipeline: admission control and the per-run stages.
//!
//! A trigger admitted by [`RunGuard`] flows through the stages in strict
//! order:
//!
//! 1. [`JobInvoker`] runs the external analysis job to completion
//! 2. [`select_newest`] picks the newest candidate result in the working dir
//! 3. [`publish`] atomically replaces the published artifact with its bytes
//! 4. [`reap`] removes superseded outputs from both directories
//!
//! No two runs' stages ever interleave; triggers that arrive while a run is
//! in flight are dropped by the guard.

pub mod guard;
pub mod invoker;
pub mod publisher;
pub mod reaper;
pub mod selector;

pub use guard::{RunGuard, RunPermit};
pub use invoker::{ExitOutcome, JobInvoker};
pub use publisher::publish;
pub use reaper::{reap, ReapStats};
pub use selector::{select_newest, CandidateResult};
