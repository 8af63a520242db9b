// Library root: re-exports all modules so integration tests and the binary
// share the same public API.

pub mod config;
pub mod output;
pub mod pages;
pub mod roster;
pub mod run;
