#![allow(dead_code)]

pub mod bigquery;
pub mod scim;
