//! Widgets shared by the portals' screens.
//!
//! Each component wraps the locators for one kind of widget and the polling
//! and escalation rules that make interacting with it reliable. Queries
//! ("is the modal open?") return plain values; actions that must happen
//! return `ProbeResult`.

pub mod dialog;
pub mod dropdown;
pub mod form;
pub mod modal;
pub mod table;
pub mod toast;

pub use dialog::{AddDialog, AddOutcome};
pub use dropdown::Dropdown;
pub use form::{FieldKind, Form, FormField, FormPayload};
pub use modal::Modal;
pub use table::{DataTable, TableProbe};
pub use toast::Toast;
