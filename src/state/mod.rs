mod progress;

pub use progress::{PROGRESS_MAX, PROGRESS_MIN, ProgressObserver, ProgressStore};
