//! Importing an export document into a settings store.

mod apply;
mod selection;
mod session;

pub use apply::{ImportOutcome, Importer};
pub use selection::{resolve_selection, sanitize_setting_name, SelectionMode, SelectionPolicy};
pub use session::{ImportReport, ImportSession, PendingImport, PreviewRow};
