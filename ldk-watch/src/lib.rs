pub mod filter;
pub mod watcher;

pub mod prelude {
    pub use crate::filter::GlobFilter;
    pub use crate::watcher::{FileWatcher, DEFAULT_DEBOUNCE};
}
