//! Capability traits that record types implement.

use crate::types::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Exposes and assigns a record's ID.
///
/// A record without an ID has never been inserted.
pub trait Identify {
    /// Returns the record's ID, or `None` if it has not been inserted yet.
    fn id(&self) -> Option<RecordId>;

    /// Assigns the record's ID.
    ///
    /// Called by the store on insert, and after decoding a body so that the
    /// ID always matches the file the record was read from.
    fn set_id(&mut self, id: RecordId);

    /// Forgets the record's ID.
    ///
    /// Called when an insert fails after the ID was assigned, so the value
    /// can be inserted again.
    fn clear_id(&mut self);
}

/// Projects named fields to their string form.
///
/// Projections feed index keys and included (covering) columns. They must
/// be deterministic: the same record must always project the same values.
pub trait Project {
    /// Returns the string form of `field`, or `None` if the type has no such
    /// field.
    ///
    /// Absent optional values should project to the empty string so that
    /// they remain queryable (for example, pages without a parent are listed
    /// under `ParentID = ""`).
    fn project(&self, field: &str) -> Option<String>;
}

/// A value that can be stored in a [`crate::Store`].
///
/// This is implemented automatically for every type with the required
/// capabilities.
///
/// # Example
///
/// ```rust
/// use filedb_core::{Identify, Project, RecordId};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     id: Option<RecordId>,
///     user_name: String,
///     email: String,
/// }
///
/// impl Identify for User {
///     fn id(&self) -> Option<RecordId> {
///         self.id
///     }
///
///     fn set_id(&mut self, id: RecordId) {
///         self.id = Some(id);
///     }
///
///     fn clear_id(&mut self) {
///         self.id = None;
///     }
/// }
///
/// impl Project for User {
///     fn project(&self, field: &str) -> Option<String> {
///         match field {
///             "UserName" => Some(self.user_name.clone()),
///             "Email" => Some(self.email.clone()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Record: Identify + Project + Serialize + DeserializeOwned + Send + Sync {}

impl<T> Record for T where T: Identify + Project + Serialize + DeserializeOwned + Send + Sync {}
