//! In-process implementations of the collaborator ports, used by the CLI and the tests.

pub mod debug;
pub mod fixture;
pub mod in_memory;
