//! The [`FormStore`] trait.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sigform_core::form::Form;
use sigform_core::registry::Registry;

use crate::error::Result;

/// One row of a form listing.
#[derive(Debug, Clone, Serialize)]
pub struct FormSummary {
    pub id: i64,
    pub name: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub points: usize,
    pub parameters: usize,
    pub steps: usize,
}

/// Storage backend for forms and the primitive class catalog.
///
/// Saves are atomic: either the whole form graph lands, or nothing
/// does. The registry is passed in because stored objects only make
/// sense against the classes that can instantiate them.
pub trait FormStore: Send + Sync {
    /// Saves a form, inserting it when `form.id` is `None` and
    /// rewriting the stored graph otherwise. Returns the form's
    /// database id.
    fn save_form(&self, form: &Form, registry: &Registry) -> Result<i64>;

    /// Loads a form by database id.
    fn load_form(&self, id: i64, registry: &Registry) -> Result<Form>;

    /// Loads a form by its unique name.
    fn load_form_by_name(&self, name: &str, registry: &Registry) -> Result<Form>;

    /// Deletes a form and everything it owns.
    fn delete_form(&self, id: i64) -> Result<()>;

    /// Lists stored forms, ordered by name.
    fn list_forms(&self) -> Result<Vec<FormSummary>>;
}
