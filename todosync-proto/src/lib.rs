//! Shared data model for the `todosync` client and mock backend.

pub mod codec;
pub mod collection;
pub mod mutation;
pub mod task;
