//! Named, user-editable script functions
//!
//! A `ScriptMethod` owns one macro body. The source must be a function
//! literal (a Rhai closure); it is bound into the engine namespace as
//! `let <key> = <source>;` and the resulting handle is cached for
//! invocation.

use rhai::{Dynamic, FnPtr};

use super::ScriptEngine;

pub struct ScriptMethod {
    key: String,
    source: String,
    handle: Option<FnPtr>,
}

impl ScriptMethod {
    /// Create a method and compile its initial source.
    pub fn new(
        engine: &mut ScriptEngine,
        source: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let mut method = Self {
            key: key.into(),
            source: String::new(),
            handle: None,
        };
        method.set_source(engine, source);
        method
    }

    /// The name of this method in the engine namespace.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether a compiled handle is available to invoke.
    pub fn is_ready(&self) -> bool {
        self.handle.is_some()
    }

    /// Replace the source text and recompile immediately.
    ///
    /// A source that fails to compile leaves the previous handle in place,
    /// so a broken edit does not destroy a working method; the failure is
    /// surfaced through the engine's error handler.
    pub fn set_source(&mut self, engine: &mut ScriptEngine, source: impl Into<String>) {
        self.source = source.into();
        self.compile(engine);
    }

    fn compile(&mut self, engine: &mut ScriptEngine) {
        let binding = format!("let {} = {};", self.key, self.source);
        if engine.evaluate(&binding).is_ok() {
            self.handle = engine.lookup(&self.key);
        }
    }

    /// Invoke the compiled function with positional arguments.
    ///
    /// Returns `None` when the method has no valid compile yet, or when the
    /// call raises a script error (which is reported through the engine's
    /// error handler). Argument arity is not validated.
    pub fn invoke(&self, engine: &mut ScriptEngine, args: Vec<Dynamic>) -> Option<Dynamic> {
        let handle = self.handle.as_ref()?;
        engine.call(handle, args).ok()
    }
}
