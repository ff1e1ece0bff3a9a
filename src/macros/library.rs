//! The macro library — titled, user-editable macro slots
//!
//! Four perturbation macros ship compiled in ("Decrease a lot" through
//! "Increase a lot"); a user can shadow the whole set by dropping a
//! `macros.json` manifest and script files into the user macro directory.

use std::fs;
use std::path::{Path, PathBuf};

use rhai::Dynamic;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::scripting::{ScriptEngine, ScriptMethod};

const MANIFEST_FILE: &str = "macros.json";

/// Bundled defaults, compiled in so the binary runs without any files on
/// disk.
const BUILTIN: &[(&str, &str, &str)] = &[
    (
        "decreaseALot",
        "Decrease a lot",
        include_str!("../../scripts/decrease_a_lot.rhai"),
    ),
    (
        "decreaseALittle",
        "Decrease a little",
        include_str!("../../scripts/decrease_a_little.rhai"),
    ),
    (
        "increaseALittle",
        "Increase a little",
        include_str!("../../scripts/increase_a_little.rhai"),
    ),
    (
        "increaseALot",
        "Increase a lot",
        include_str!("../../scripts/increase_a_lot.rhai"),
    ),
];

/// One manifest row: `[{ "key": …, "title": …, "file": … }]`.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub key: String,
    pub title: String,
    pub file: String,
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid macro manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub struct MacroSlot {
    pub title: String,
    pub method: ScriptMethod,
}

/// Ordered collection of macros, addressed by slot index.
pub struct MacroLibrary {
    slots: Vec<MacroSlot>,
}

impl MacroLibrary {
    /// Load the compiled-in default macros.
    pub fn load_builtin(engine: &mut ScriptEngine) -> Self {
        let slots = BUILTIN
            .iter()
            .map(|(key, title, source)| MacroSlot {
                title: (*title).to_string(),
                method: ScriptMethod::new(engine, source.trim_end(), *key),
            })
            .collect();
        Self { slots }
    }

    /// Load a macro directory: a `macros.json` manifest next to the script
    /// files it names.
    pub fn load_dir(engine: &mut ScriptEngine, dir: &Path) -> Result<Self, LibraryError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = fs::read_to_string(&manifest_path).map_err(|source| LibraryError::Io {
            path: manifest_path,
            source,
        })?;
        let entries: Vec<ManifestEntry> = serde_json::from_str(&manifest)?;

        let mut slots = Vec::with_capacity(entries.len());
        for entry in entries {
            let path = dir.join(&entry.file);
            let source =
                fs::read_to_string(&path).map_err(|source| LibraryError::Io { path, source })?;
            debug!("loaded macro {}", entry.key);
            slots.push(MacroSlot {
                title: entry.title,
                method: ScriptMethod::new(engine, source.trim_end(), entry.key),
            });
        }
        Ok(Self { slots })
    }

    /// The user macro directory, `~/.config/rondel/macros`.
    pub fn user_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("rondel").join("macros"))
    }

    /// Load the user macros if a manifest exists, the builtins otherwise.
    pub fn load_default(engine: &mut ScriptEngine) -> Self {
        if let Some(dir) = Self::user_dir() {
            if dir.join(MANIFEST_FILE).exists() {
                match Self::load_dir(engine, &dir) {
                    Ok(library) => return library,
                    Err(e) => warn!("user macro directory ignored: {e}"),
                }
            }
        }
        Self::load_builtin(engine)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MacroSlot> {
        self.slots.get(index)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.title.as_str())
    }

    /// Run a macro by slot index with no arguments.
    pub fn run(&self, engine: &mut ScriptEngine, index: usize) -> Option<Dynamic> {
        self.slots.get(index)?.method.invoke(engine, Vec::new())
    }

    /// Replace a macro's source, recompiling it immediately. Returns false
    /// for an out-of-range slot.
    pub fn set_source(
        &mut self,
        engine: &mut ScriptEngine,
        index: usize,
        source: impl Into<String>,
    ) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.method.set_source(engine, source);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ProgressObserver, ProgressStore};
    use std::cell::RefCell;
    use std::sync::Arc;

    fn engine_with_store() -> (ScriptEngine, ProgressStore) {
        let mut engine = ScriptEngine::new();
        let store = ProgressStore::new();
        engine.add_binding(&store);
        (engine, store)
    }

    fn set_all(store: &ProgressStore, value: f64) {
        store.set_inner(value);
        store.set_middle(value);
        store.set_outer(value);
    }

    #[test]
    fn builtin_library_has_four_ready_macros() {
        let (mut engine, _store) = engine_with_store();
        let library = MacroLibrary::load_builtin(&mut engine);

        assert_eq!(library.len(), 4);
        for index in 0..library.len() {
            assert!(library.get(index).unwrap().method.is_ready());
        }
    }

    #[test]
    fn bundled_manifest_matches_builtin_slots() {
        let entries: Vec<ManifestEntry> =
            serde_json::from_str(include_str!("../../scripts/macros.json")).unwrap();

        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        let builtin: Vec<&str> = BUILTIN.iter().map(|(key, _, _)| *key).collect();
        assert_eq!(keys, builtin);
    }

    #[test]
    fn decrease_macros_never_raise_values() {
        let (mut engine, store) = engine_with_store();
        let library = MacroLibrary::load_builtin(&mut engine);

        for index in [0, 1] {
            set_all(&store, 5.0);
            library.run(&mut engine, index);
            for value in [store.inner(), store.middle(), store.outer()] {
                assert!(value < 5.0, "slot {index} raised a value to {value}");
                assert!(value >= 0.0);
            }
        }
    }

    #[test]
    fn increase_macros_never_lower_values() {
        let (mut engine, store) = engine_with_store();
        let library = MacroLibrary::load_builtin(&mut engine);

        for index in [2, 3] {
            set_all(&store, 5.0);
            library.run(&mut engine, index);
            for value in [store.inner(), store.middle(), store.outer()] {
                assert!(value > 5.0, "slot {index} lowered a value to {value}");
                assert!(value <= 10.0);
            }
        }
    }

    #[test]
    fn macros_clamp_at_bounds() {
        let (mut engine, store) = engine_with_store();
        let library = MacroLibrary::load_builtin(&mut engine);

        set_all(&store, 0.0);
        library.run(&mut engine, 0);
        library.run(&mut engine, 0);
        assert_eq!(store.inner(), 0.0);
        assert_eq!(store.middle(), 0.0);
        assert_eq!(store.outer(), 0.0);
    }

    #[derive(Default)]
    struct Recorder {
        values: RefCell<Vec<f64>>,
    }

    impl ProgressObserver for Recorder {
        fn inner_progress_update(&self, progress: f64) {
            self.values.borrow_mut().push(progress);
        }

        fn middle_progress_update(&self, progress: f64) {
            self.values.borrow_mut().push(progress);
        }

        fn outer_progress_update(&self, progress: f64) {
            self.values.borrow_mut().push(progress);
        }
    }

    #[test]
    fn observer_sees_post_clamp_values() {
        let (mut engine, store) = engine_with_store();
        let library = MacroLibrary::load_builtin(&mut engine);

        set_all(&store, 9.5);
        let recorder = Arc::new(Recorder::default());
        store.set_observer(recorder.clone());

        // "Increase a lot" adds at least 1.5, so every ring saturates
        library.run(&mut engine, 3);
        let values = recorder.values.borrow();
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| *v == 10.0));
    }

    #[test]
    fn edited_macro_runs_new_source() {
        let (mut engine, store) = engine_with_store();
        let mut library = MacroLibrary::load_builtin(&mut engine);

        assert!(library.set_source(&mut engine, 0, "|| setInnerProgress(9.9)"));
        library.run(&mut engine, 0);
        assert_eq!(store.inner(), 9.9);
    }

    #[test]
    fn failed_edit_keeps_macro_runnable() {
        let (mut engine, store) = engine_with_store();
        let mut library = MacroLibrary::load_builtin(&mut engine);

        set_all(&store, 5.0);
        assert!(library.set_source(&mut engine, 0, "|| setInnerProgress("));
        assert!(library.get(0).unwrap().method.is_ready());

        library.run(&mut engine, 0);
        assert!(store.inner() < 5.0);
    }

    #[test]
    fn set_source_out_of_range_is_rejected() {
        let (mut engine, _store) = engine_with_store();
        let mut library = MacroLibrary::load_builtin(&mut engine);
        assert!(!library.set_source(&mut engine, 99, "|| 1"));
    }

    #[test]
    fn load_dir_reads_manifest_and_sources() {
        let dir = std::env::temp_dir().join(format!("rondel-macros-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            r#"[{ "key": "nudge", "title": "Nudge", "file": "nudge.rhai" }]"#,
        )
        .unwrap();
        fs::write(dir.join("nudge.rhai"), "|| setInnerProgress(1.5)\n").unwrap();

        let (mut engine, store) = engine_with_store();
        let library = MacroLibrary::load_dir(&mut engine, &dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(library.len(), 1);
        assert_eq!(library.titles().collect::<Vec<_>>(), vec!["Nudge"]);
        library.run(&mut engine, 0);
        assert_eq!(store.inner(), 1.5);
    }

    #[test]
    fn load_dir_without_manifest_errors() {
        let dir = std::env::temp_dir().join(format!("rondel-missing-{}", std::process::id()));
        let (mut engine, _store) = engine_with_store();
        let result = MacroLibrary::load_dir(&mut engine, &dir);
        assert!(matches!(result, Err(LibraryError::Io { .. })));
    }
}
