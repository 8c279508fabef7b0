//! Utility modules

pub mod text;

pub use text::{char_len, char_slice, chars_before, chars_from, head, splice, tail};
