//! Assessment subdomain: specialist roles and the fan-out result types.

pub mod role;
pub mod value_objects;
