//! Native progress state exposed to scripts
//!
//! Three ring values clamped to [0, 10]. Mutations from either side of the
//! script boundary go through the same clamp and observer path.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::scripting::{EngineBinding, ScriptEngine};

pub const PROGRESS_MIN: f64 = 0.0;
pub const PROGRESS_MAX: f64 = 10.0;

/// Notified with the post-clamp value after each stored mutation.
pub trait ProgressObserver {
    fn inner_progress_update(&self, progress: f64);
    fn middle_progress_update(&self, progress: f64);
    fn outer_progress_update(&self, progress: f64);
}

#[derive(Debug, Clone, Copy, Default)]
struct ProgressValues {
    inner: f64,
    middle: f64,
    outer: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ring {
    Inner,
    Middle,
    Outer,
}

/// Shared store for the three ring values.
///
/// Clones are handles onto the same state, so the copies captured by script
/// callables observe every change. At most one observer is registered at a
/// time; installing another replaces it.
#[derive(Clone, Default)]
pub struct ProgressStore {
    values: Arc<RwLock<ProgressValues>>,
    observer: Arc<RwLock<Option<Arc<dyn ProgressObserver>>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the observer. The last registration wins; there is no
    /// multicast list.
    pub fn set_observer(&self, observer: Arc<dyn ProgressObserver>) {
        if let Ok(mut slot) = self.observer.write() {
            *slot = Some(observer);
        }
    }

    pub fn inner(&self) -> f64 {
        self.read(Ring::Inner)
    }

    pub fn middle(&self) -> f64 {
        self.read(Ring::Middle)
    }

    pub fn outer(&self) -> f64 {
        self.read(Ring::Outer)
    }

    pub fn set_inner(&self, value: f64) {
        self.store(Ring::Inner, value);
    }

    pub fn set_middle(&self, value: f64) {
        self.store(Ring::Middle, value);
    }

    pub fn set_outer(&self, value: f64) {
        self.store(Ring::Outer, value);
    }

    fn read(&self, ring: Ring) -> f64 {
        let values = match self.values.read() {
            Ok(values) => *values,
            Err(_) => return PROGRESS_MIN,
        };
        match ring {
            Ring::Inner => values.inner,
            Ring::Middle => values.middle,
            Ring::Outer => values.outer,
        }
    }

    fn store(&self, ring: Ring, value: f64) {
        // NaN and infinities are rejected rather than clamped
        if !value.is_finite() {
            debug!("non-finite progress value {value} ignored");
            return;
        }
        let clamped = value.clamp(PROGRESS_MIN, PROGRESS_MAX);

        if let Ok(mut values) = self.values.write() {
            match ring {
                Ring::Inner => values.inner = clamped,
                Ring::Middle => values.middle = clamped,
                Ring::Outer => values.outer = clamped,
            }
        }

        // Locks are released before notifying, so an observer that mutates
        // the store recurses instead of deadlocking
        let observer = match self.observer.read() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        if let Some(observer) = observer {
            match ring {
                Ring::Inner => observer.inner_progress_update(clamped),
                Ring::Middle => observer.middle_progress_update(clamped),
                Ring::Outer => observer.outer_progress_update(clamped),
            }
        }
    }
}

impl EngineBinding for ProgressStore {
    fn expose_to(&self, engine: &mut ScriptEngine) {
        let ns = engine.namespace();

        // Rhai will not coerce an i64 call site onto an f64 parameter, so
        // each setter is registered under both signatures.
        {
            let store = self.clone();
            ns.register_fn("getInnerProgress", move || store.inner());
        }
        {
            let store = self.clone();
            ns.register_fn("setInnerProgress", move |value: f64| store.set_inner(value));
        }
        {
            let store = self.clone();
            ns.register_fn("setInnerProgress", move |value: i64| {
                store.set_inner(value as f64)
            });
        }

        {
            let store = self.clone();
            ns.register_fn("getMiddleProgress", move || store.middle());
        }
        {
            let store = self.clone();
            ns.register_fn("setMiddleProgress", move |value: f64| store.set_middle(value));
        }
        {
            let store = self.clone();
            ns.register_fn("setMiddleProgress", move |value: i64| {
                store.set_middle(value as f64)
            });
        }

        {
            let store = self.clone();
            ns.register_fn("getOuterProgress", move || store.outer());
        }
        {
            let store = self.clone();
            ns.register_fn("setOuterProgress", move |value: f64| store.set_outer(value));
        }
        {
            let store = self.clone();
            ns.register_fn("setOuterProgress", move |value: i64| {
                store.set_outer(value as f64)
            });
        }
    }
}
