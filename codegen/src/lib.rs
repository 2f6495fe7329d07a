pub mod compiler;
pub mod document;
pub mod emitter;

pub use compiler::{CompileOptions, Compiled, Compiler, compile_program_with, compile_source};
pub use document::{Assembler, DEFAULT_STYLESHEET, assemble};
pub use emitter::{Emitted, emit};
