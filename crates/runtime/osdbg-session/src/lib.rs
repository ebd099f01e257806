//! # osdbg-session
//!
//! Runs the boundary state machine of [`osdbg_core`] against a live
//! debugger: stop events drive the machine, the [`ActionExecutor`] probes
//! the target, and crossings switch the active breakpoint group.
//!
//! ```rust,ignore
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut session = Session::new(&config, channel, Arc::new(LogOutput))?;
//! tokio::spawn(async move { session.run(rx).await });
//! tx.send(SessionInput::Event(DebuggerEvent::DebugReady))?;
//! ```

pub mod executor;
pub mod request;
pub mod session;

pub use executor::{ActionExecutor, ExecutionContext};
pub use request::{CustomRequest, RequestOutcome};
pub use session::{Session, SessionFlow, SessionInput};
