use tasse::Program;
use tasse::ident::IdGenerator;
use tasse::parser::{ParseError, ParseOptions, Parser};

use crate::document::{Assembler, DEFAULT_STYLESHEET};
use crate::emitter::emit;

/// Settings for a whole compilation (parse through assembly).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub parse: ParseOptions,
    pub stylesheet: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            parse: ParseOptions::default(),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
        }
    }
}

/// A finished document.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub html: String,
    pub element_count: usize,
    pub warnings: Vec<ParseError>,
}

/// Runs the pipeline and owns the identifier generator across runs.
///
/// The generator is reset at the start of every [`Compiler::compile`], so
/// recompiling the same text always yields the same identifiers.
#[derive(Debug, Default)]
pub struct Compiler {
    ids: IdGenerator,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Compiler {
            ids: IdGenerator::new(),
            options,
        }
    }

    /// Compile one source text. A parse error yields no HTML at all.
    pub fn compile(&mut self, source: &str, file_id: usize) -> Result<Compiled, ParseError> {
        let program = Parser::new(source.to_string(), file_id)
            .with_options(self.options.parse.clone())
            .parse_with(&mut self.ids)?;

        let assembler = Assembler::with_stylesheet(self.options.stylesheet.as_str());
        let html = compile_program_with(&program, &assembler);

        Ok(Compiled {
            html,
            element_count: program.element_count(),
            warnings: program.warnings,
        })
    }
}

/// Emit and assemble an already parsed program.
pub fn compile_program_with(program: &Program, assembler: &Assembler) -> String {
    let (body, script) = emit(&program.root).into_parts();
    assembler.assemble(&body, &script)
}

/// Parse, emit and assemble `source` with default options.
pub fn compile_source(source: &str) -> Result<String, ParseError> {
    Compiler::default()
        .compile(source, 0)
        .map(|compiled| compiled.html)
}
