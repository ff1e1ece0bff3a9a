//! Scripting module — the shared Rhai runtime
//!
//! Native features implement [`EngineBinding`] to inject callables into the
//! engine namespace; user-editable macros are wrapped by [`ScriptMethod`].

mod engine;
mod method;

pub use engine::{EngineBinding, ScriptEngine};
pub use method::ScriptMethod;

use thiserror::Error;

/// Script-side failure surfaced by the engine.
///
/// Both variants are delivered to the engine's error handler as a message
/// string; the host process is never terminated by script failures.
#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    #[error("script parse error: {0}")]
    Parse(String),
    #[error("script error: {0}")]
    Runtime(String),
}
