//! SQLite persistence for forms and the primitive class catalog.
//!
//! The whole form graph is relational: forms own points, parameters,
//! steps, tracks, and primitive objects; classes and their argument and
//! slot declarations are shared across forms. Argument values stay
//! textual in storage, exactly as they are in the model. Saves are
//! transactional, so a half-written form never exists.

pub mod error;
mod sqlite;
pub mod traits;

pub use error::{Result, StorageError};
pub use sqlite::SqliteStore;
pub use traits::{FormStore, FormSummary};

use sigform_core::form::Form;
use sigform_core::registry::Registry;

impl FormStore for SqliteStore {
    fn save_form(&self, form: &Form, registry: &Registry) -> Result<i64> {
        self.save_form_impl(form, registry)
    }

    fn load_form(&self, id: i64, registry: &Registry) -> Result<Form> {
        self.load_form_impl(id, registry)
    }

    fn load_form_by_name(&self, name: &str, registry: &Registry) -> Result<Form> {
        self.load_form_by_name_impl(name, registry)
    }

    fn delete_form(&self, id: i64) -> Result<()> {
        self.delete_form_impl(id)
    }

    fn list_forms(&self) -> Result<Vec<FormSummary>> {
        self.list_forms_impl()
    }
}
