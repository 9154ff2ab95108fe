//! Side effects that run after a response is displayed, plus the context
//! document loaded before the first turn.

pub mod audio;
pub mod code_save;
pub mod context;
