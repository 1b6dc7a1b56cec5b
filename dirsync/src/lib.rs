pub mod bigquery;
pub mod error;
mod macros;
pub mod pipeline;
pub mod rows;
pub mod scim;
