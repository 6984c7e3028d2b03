//! shelf application library
//!
//! Application modules mounted by the `shelf-app` binary.

pub mod modules;

pub use modules::register_all;
