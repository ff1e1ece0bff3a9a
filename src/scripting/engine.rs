//! The shared Rhai scripting engine
//!
//! One engine backs every macro and every native binding. Script-declared
//! globals live in a persistent scope, so a function bound by one evaluation
//! stays callable for the rest of the process.

use rhai::{AST, Dynamic, Engine, FnPtr, FuncArgs, Scope};

use rand::Rng;
use tracing::{debug, warn};

use super::ScriptError;

/// Implemented by native features that expose callables into the script
/// namespace. Keeps the engine free of feature-specific knowledge.
pub trait EngineBinding {
    fn expose_to(&self, engine: &mut ScriptEngine);
}

/// Receives a human-readable message whenever evaluated script fails.
pub type ErrorHandler = Box<dyn FnMut(&str)>;

/// Wrapper around one `rhai::Engine` plus the mutable state evaluation
/// needs: the global scope, the accumulated function library, and the
/// error channel.
pub struct ScriptEngine {
    engine: Engine,
    scope: Scope<'static>,
    lib: AST,
    error_handler: Option<ErrorHandler>,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self {
            engine: Self::create_engine(),
            scope: Scope::new(),
            lib: AST::empty(),
            error_handler: None,
        }
    }

    fn create_engine() -> Engine {
        let mut engine = Engine::new();

        // Safety limits
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);

        engine.on_print(|msg| debug!("script print: {msg}"));

        // Uniform random in [0, 1); the perturbation macros call this
        engine.register_fn("random", || -> f64 {
            rand::thread_rng().gen_range(0.0..1.0)
        });

        engine
    }

    /// Access to the underlying engine for native-callable registration.
    /// Registering a name twice replaces the prior binding.
    pub fn namespace(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Ask a native feature to register its callables.
    pub fn add_binding(&mut self, binding: &dyn EngineBinding) {
        binding.expose_to(self);
    }

    /// Install the error handler. Only the most recently installed handler
    /// is active; without one, failures are logged at `warn`.
    pub fn set_error_handler(&mut self, handler: impl FnMut(&str) + 'static) {
        self.error_handler = Some(Box::new(handler));
    }

    /// Evaluate a script string in the shared scope.
    ///
    /// A failure never panics the host: the error handler fires once with a
    /// descriptive message and the result is an `Err`. Top-level `let`
    /// declarations persist in the scope across calls, and function
    /// definitions from successful evaluations are retained so handles to
    /// them stay callable.
    pub fn evaluate(&mut self, source: &str) -> Result<Dynamic, ScriptError> {
        let ast = match self.engine.compile(source) {
            Ok(ast) => ast,
            Err(e) => return Err(self.report(ScriptError::Parse(e.to_string()))),
        };

        match self.engine.eval_ast_with_scope::<Dynamic>(&mut self.scope, &ast) {
            Ok(value) => {
                self.lib = self.lib.merge(&ast.clone_functions_only());
                Ok(value)
            }
            Err(e) => Err(self.report(ScriptError::Runtime(e.to_string()))),
        }
    }

    /// Fetch a callable handle for a function-valued global. `None` when
    /// the name is unbound, or bound to something that is not a function.
    pub fn lookup(&self, name: &str) -> Option<FnPtr> {
        self.scope.get_value::<FnPtr>(name)
    }

    /// Call a handle obtained from `lookup` with positional arguments.
    /// Script errors are routed to the error handler, like `evaluate`.
    pub fn call(&mut self, target: &FnPtr, args: impl FuncArgs) -> Result<Dynamic, ScriptError> {
        match target.call::<Dynamic>(&self.engine, &self.lib, args) {
            Ok(value) => Ok(value),
            Err(e) => Err(self.report(ScriptError::Runtime(e.to_string()))),
        }
    }

    fn report(&mut self, error: ScriptError) -> ScriptError {
        match self.error_handler.as_mut() {
            Some(handler) => handler(&error.to_string()),
            None => warn!("unhandled script error: {error}"),
        }
        error
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}
