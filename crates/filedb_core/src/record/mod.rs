//! Records and their on-disk bodies.
//!
//! Record types plug into the store through two capabilities:
//! [`Identify`] (read and assign the ID) and [`Project`] (turn a named field
//! into the string used by indexes). Bodies are serialized with serde in the
//! store's [`crate::BodyFormat`].

mod codec;
mod dynamic;
mod store;
mod traits;

pub use dynamic::DynamicRecord;
pub use store::{RecordStore, ScanAll};
pub use traits::{Identify, Project, Record};
