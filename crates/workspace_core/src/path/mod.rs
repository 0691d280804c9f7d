//! Path validation against a fixed workspace root.

mod validator;

pub use validator::{PathValidator, ValidatedPath};
