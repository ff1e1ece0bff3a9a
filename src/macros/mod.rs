mod library;

pub use library::{LibraryError, MacroLibrary, MacroSlot, ManifestEntry};
