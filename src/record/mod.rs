//! Record layer of the value runtime
//!
//! Schemas, typed attribute values, and the fixed binary image used when records are
//! written to table pages and spill pages.

mod errors;
mod record;
mod schema;
mod types;
mod value;

pub use errors::{RecordError, RecordResult};
pub use record::Record;
pub use schema::{Attribute, Schema};
pub use types::AttType;
pub use value::AttValue;
