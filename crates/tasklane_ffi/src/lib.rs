//! Flutter-facing bindings for the Tasklane core.

pub mod api;
