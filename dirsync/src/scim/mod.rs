mod client;

pub use client::{ScimClient, UserListPage};
