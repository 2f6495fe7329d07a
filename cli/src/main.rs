mod config;
mod logging;
mod test_runner;
mod watch;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use codegen::{Assembler, Compiler, compile_program_with};
use tasse::parser::{ParseError, TrimMode};

use crate::config::Config;
use crate::logging::{LoggingConfig, init_logging};
use crate::watch::Watcher;

const SUBCOMMANDS: &[&str] = &["build", "watch", "test", "help"];
/// Global flags that take a separate value.
const VALUE_FLAGS: &[&str] = &["--config", "--log-level"];

#[derive(Parser)]
#[command(name = "tasse", version, about = "Compile tasse markup into HTML")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Project file (defaults to ./tasse.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "tasse=trace" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a document once
    Build(BuildArgs),

    /// Compile, then recompile whenever the source directory changes
    Watch(WatchArgs),

    /// Run .test.tasse fixture files
    Test(TestArgs),
}

/// Settings shared by `build` and `watch`; each overrides tasse.toml.
#[derive(clap::Args)]
struct SourceArgs {
    /// Source document
    file: Option<PathBuf>,

    /// Output HTML file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stylesheet linked from the document head
    #[arg(long)]
    stylesheet: Option<String>,

    /// How block delimiters are stripped: legacy or delimited
    #[arg(long)]
    trim: Option<TrimMode>,
}

#[derive(clap::Args)]
struct BuildArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Parse only, don't write output (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the parsed element tree
    #[arg(long)]
    ast: bool,

    /// Print the HTML instead of writing the output file
    #[arg(long)]
    stdout: bool,
}

#[derive(clap::Args)]
struct WatchArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Quiet period in milliseconds before a burst of changes triggers a rebuild
    #[arg(long)]
    debounce_ms: Option<u64>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.tasse file or a directory containing them
    path: PathBuf,

    /// Run only fixtures in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `tasse page.tasse` is shorthand for `tasse build page.tasse`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = first_positional(&args) {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "build".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(LoggingConfig::new(cli.log_level.clone(), cli.no_color));

    let code = match cli.command {
        Command::Build(build_args) => {
            let config = load_config(cli.config.as_deref(), &build_args.source);
            do_build(&config, &build_args, cli.no_color)
        }
        Command::Watch(watch_args) => {
            let mut config = load_config(cli.config.as_deref(), &watch_args.source);
            if let Some(ms) = watch_args.debounce_ms {
                config.debounce = std::time::Duration::from_millis(ms);
            }
            do_watch(&config, cli.no_color)
        }
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                0
            } else {
                test_runner::run_fixtures(&test_args.path, cli.no_color, &test_args.category)
            }
        }
    };
    process::exit(code);
}

/// Index of the first argument that is neither a flag nor a flag's value.
fn first_positional(args: &[String]) -> Option<usize> {
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if VALUE_FLAGS.contains(&arg) {
            i += 2;
        } else if arg.starts_with('-') {
            i += 1;
        } else {
            return Some(i);
        }
    }
    None
}

/// Load tasse.toml and apply command line overrides. Exits on error.
fn load_config(explicit: Option<&Path>, args: &SourceArgs) -> Config {
    let mut config = match Config::load(explicit) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    if let Some(file) = &args.file {
        config.source = file.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(stylesheet) = &args.stylesheet {
        config.stylesheet = stylesheet.clone();
    }
    if let Some(trim) = args.trim {
        config.trim = trim;
    }
    config
}

fn color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn do_build(config: &Config, args: &BuildArgs, no_color: bool) -> i32 {
    let source = match read_source(&config.source) {
        Some(s) => s,
        None => return 1,
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(config.source.display().to_string(), source.clone());

    let parser = tasse::parser::Parser::new(source, file_id).with_options(config.parse_options());
    let program = match parser.parse() {
        Ok(p) => p,
        Err(error) => {
            emit_diagnostics(&files, std::slice::from_ref(&error), no_color);
            return 1;
        }
    };
    emit_diagnostics(&files, &program.warnings, no_color);

    // --check: parse succeeded, exit
    if args.check {
        eprintln!("ok: {} parsed successfully", config.source.display());
        return 0;
    }

    // --ast: dump the element tree
    if args.ast {
        println!("{:#?}", program.root);
        return 0;
    }

    let html = compile_program_with(&program, &Assembler::with_stylesheet(config.stylesheet.as_str()));

    if args.stdout {
        println!("{}", html);
        return 0;
    }

    match write_output(&config.output, &html) {
        Ok(()) => {
            log::info!(
                "compiled {} -> {} ({} elements)",
                config.source.display(),
                config.output.display(),
                program.element_count()
            );
            0
        }
        Err(e) => {
            eprintln!("error: cannot write '{}': {}", config.output.display(), e);
            1
        }
    }
}

fn do_watch(config: &Config, no_color: bool) -> i32 {
    let mut compiler = Compiler::new(config.compile_options());
    rebuild(&mut compiler, config, no_color);

    let mut watcher = match open_watcher(config) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("error: cannot watch '{}': {}", source_dir(config).display(), e);
            return 1;
        }
    };
    log::info!("watching {} for changes", watcher.dir().display());

    loop {
        match watcher.wait_for_change() {
            Ok(changed) => {
                for path in &changed {
                    log::info!("{} changed. Recompiling...", path.display());
                }
                rebuild(&mut compiler, config, no_color);
            }
            Err(e) => {
                eprintln!("error: watching '{}' failed: {}", watcher.dir().display(), e);
                return 1;
            }
        }
    }
}

fn source_dir(config: &Config) -> &Path {
    config
        .source
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Watch the source directory. Our own output landing there is not a change.
fn open_watcher(config: &Config) -> notify::Result<Watcher> {
    let mut watcher = Watcher::new(source_dir(config), config.debounce)?;
    watcher.ignore(&config.output);
    Ok(watcher)
}

/// One watch-mode compilation. Failures are reported and the previous
/// output file is left in place.
fn rebuild(compiler: &mut Compiler, config: &Config, no_color: bool) -> bool {
    let Some(source) = read_source(&config.source) else {
        return false;
    };
    let mut files = SimpleFiles::new();
    let file_id = files.add(config.source.display().to_string(), source.clone());

    match compiler.compile(&source, file_id) {
        Ok(compiled) => {
            emit_diagnostics(&files, &compiled.warnings, no_color);
            if let Err(e) = write_output(&config.output, &compiled.html) {
                log::error!("cannot write '{}': {}", config.output.display(), e);
                return false;
            }
            log::info!(
                "wrote {} ({} elements)",
                config.output.display(),
                compiled.element_count
            );
            true
        }
        Err(error) => {
            emit_diagnostics(&files, std::slice::from_ref(&error), no_color);
            log::warn!("{} left unchanged", config.output.display());
            false
        }
    }
}

fn read_source(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            None
        }
    }
}

fn write_output(path: &Path, html: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
}

fn emit_diagnostics(files: &SimpleFiles<String, String>, errors: &[ParseError], no_color: bool) {
    if errors.is_empty() {
        return;
    }
    let writer = StandardStream::stderr(color_choice(no_color));
    let config = term::Config::default();
    for error in errors {
        let diagnostic = error.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn first_positional_skips_flag_values() {
        assert_eq!(first_positional(&argv(&["tasse", "page.tasse"])), Some(1));
        assert_eq!(
            first_positional(&argv(&["tasse", "--config", "x.toml", "--no-color", "build"])),
            Some(4)
        );
        assert_eq!(first_positional(&argv(&["tasse", "--no-color"])), None);
    }

    #[test]
    fn write_output_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist/nested/out.html");
        write_output(&out, "<html></html>").unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "<html></html>");
    }

    #[test]
    fn rebuild_keeps_previous_output_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            source: dir.path().join("page.tasse"),
            output: dir.path().join("dist/out.html"),
            ..Config::default()
        };
        let mut compiler = Compiler::new(config.compile_options());

        std::fs::write(&config.source, "((a)(b))").unwrap();
        assert!(rebuild(&mut compiler, &config, true));
        let first = std::fs::read_to_string(&config.output).unwrap();
        assert!(first.contains("id=\"id3\""));

        std::fs::write(&config.source, "((a)").unwrap();
        assert!(!rebuild(&mut compiler, &config, true));
        assert_eq!(std::fs::read_to_string(&config.output).unwrap(), first);
    }

    #[test]
    fn output_next_to_source_does_not_retrigger_watch() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            source: dir.path().join("page.tasse"),
            output: dir.path().join(".").join("out.html"),
            debounce: Duration::from_millis(50),
            ..Config::default()
        };
        std::fs::write(&config.source, "((a)(b))").unwrap();
        let mut watcher = open_watcher(&config).unwrap();
        let mut compiler = Compiler::new(config.compile_options());

        assert!(rebuild(&mut compiler, &config, true));
        assert_eq!(watcher.next_change(Duration::from_millis(300)).unwrap(), None);

        std::fs::write(&config.source, "((a))").unwrap();
        let changed = watcher
            .next_change(Duration::from_secs(5))
            .unwrap()
            .unwrap();
        assert_eq!(changed, vec![watch::normalize(&config.source)]);
    }
}
