//! Text nodes

mod concat;

pub use concat::{concat_parts, TextConcatTask};
