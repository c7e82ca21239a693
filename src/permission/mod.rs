// ABOUTME: Permission module - confirmation before a command runs on the local machine.
// ABOUTME: Terminal prompt plus fixed handlers for tests and non-interactive use.

mod handler;

pub use handler::*;
