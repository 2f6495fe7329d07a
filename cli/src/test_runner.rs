use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use codegen::{CompileOptions, Compiler};
use tasse::parser::{ParseOptions, TrimMode};

/// File suffix of compiler fixtures.
pub const FIXTURE_SUFFIX: &str = ".test.tasse";

/// Expectations declared in a fixture's TOML frontmatter.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixtureConfig {
    /// Human-readable test description.
    pub description: Option<String>,

    /// Trim mode for this fixture ("legacy" or "delimited").
    pub trim: Option<String>,

    /// Exact expected document.
    pub expect_html: Option<String>,

    /// Expected markup between `<body>` and the script block.
    pub expect_body: Option<String>,

    /// Expected concatenated script, without the shared `let el;`.
    pub expect_script: Option<String>,

    /// Substrings that must all appear in the document.
    pub expect_contains: Vec<String>,

    /// If true, compilation must fail.
    pub expect_parse_error: bool,

    /// Compilation must fail with an error whose text contains this.
    pub expect_error: Option<String>,

    /// Exact number of warnings, when given.
    pub expect_warnings: Option<usize>,
}

/// Split a fixture into its frontmatter config and tasse source.
fn split_fixture(content: &str) -> Result<(FixtureConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');
    let rest = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let (frontmatter, after) = match rest.strip_prefix("---") {
        Some(after) => ("", after),
        None => {
            let close = rest
                .find("\n---")
                .ok_or("missing closing --- frontmatter delimiter")?;
            (rest[..close].trim_end_matches('\r'), &rest[close + "\n---".len()..])
        }
    };
    let source = after
        .strip_prefix("\r\n")
        .or_else(|| after.strip_prefix('\n'))
        .unwrap_or(after);

    let config: FixtureConfig =
        toml::from_str(frontmatter).map_err(|e| format!("TOML parse error: {}", e))?;
    Ok((config, source))
}

/// Pull body markup and script text back out of an assembled document.
fn split_document(html: &str) -> Option<(&str, &str)> {
    let body_start = html.find("<body>")? + "<body>".len();
    let script_start = html.rfind("<script>let el;")?;
    let script_end = html.rfind("</script>")?;
    let body = html.get(body_start..script_start)?;
    let script = html.get(script_start + "<script>let el;".len()..script_end)?;
    Some((body, script))
}

pub enum Outcome {
    Pass,
    Fail(String),
}

pub struct FixtureResult {
    pub path: PathBuf,
    pub label: String,
    pub outcome: Outcome,
}

fn label_for(path: &Path, config: Option<&FixtureConfig>) -> String {
    config
        .and_then(|c| c.description.clone())
        .unwrap_or_else(|| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.trim_end_matches(FIXTURE_SUFFIX).to_string())
                .unwrap_or_else(|| "?".to_string())
        })
}

fn run_fixture(path: &Path) -> FixtureResult {
    let fail = |label: String, reason: String| FixtureResult {
        path: path.to_path_buf(),
        label,
        outcome: Outcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(label_for(path, None), format!("cannot read file: {}", e)),
    };
    let (config, source) = match split_fixture(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(label_for(path, None), format!("frontmatter error: {}", e)),
    };
    let label = label_for(path, Some(&config));

    let trim = match config.trim.as_deref().map(str::parse::<TrimMode>) {
        Some(Ok(mode)) => mode,
        Some(Err(e)) => return fail(label, e),
        None => TrimMode::default(),
    };
    let mut compiler = Compiler::new(CompileOptions {
        parse: ParseOptions {
            trim,
            ..ParseOptions::default()
        },
        ..CompileOptions::default()
    });

    let outcome = match (compiler.compile(source, 0), config.wants_error()) {
        (Err(err), true) => match &config.expect_error {
            Some(expected) if !err.to_string().contains(expected.as_str()) => Outcome::Fail(
                format!("expected error containing \"{}\", got: {}", expected, err),
            ),
            _ => Outcome::Pass,
        },
        (Err(err), false) => Outcome::Fail(format!("unexpected parse error: {}", err)),
        (Ok(_), true) => Outcome::Fail("expected a parse error, but compilation succeeded".into()),
        (Ok(compiled), false) => match check_output(&config, &compiled.html, compiled.warnings.len()) {
            Some(reason) => Outcome::Fail(reason),
            None => Outcome::Pass,
        },
    };

    FixtureResult {
        path: path.to_path_buf(),
        label,
        outcome,
    }
}

impl FixtureConfig {
    fn wants_error(&self) -> bool {
        self.expect_parse_error || self.expect_error.is_some()
    }
}

/// Compare a successful compilation against the fixture. `Some(reason)` on mismatch.
fn check_output(config: &FixtureConfig, html: &str, warnings: usize) -> Option<String> {
    if let Some(expected) = &config.expect_html {
        if html != expected.trim() {
            return Some(mismatch("document", expected.trim(), html));
        }
    }

    if config.expect_body.is_some() || config.expect_script.is_some() {
        let Some((body, script)) = split_document(html) else {
            return Some("output is not a complete document".to_string());
        };
        if let Some(expected) = &config.expect_body {
            if body != expected.trim() {
                return Some(mismatch("body", expected.trim(), body));
            }
        }
        if let Some(expected) = &config.expect_script {
            if script != expected.trim() {
                return Some(mismatch("script", expected.trim(), script));
            }
        }
    }

    if let Some(missing) = config.expect_contains.iter().find(|s| !html.contains(s.as_str())) {
        return Some(format!("output does not contain \"{}\"\n  actual: {}", missing, html));
    }

    match config.expect_warnings {
        Some(expected) if expected != warnings => Some(format!(
            "expected {} warning(s), got {}",
            expected, warnings
        )),
        _ => None,
    }
}

fn mismatch(what: &str, expected: &str, actual: &str) -> String {
    format!(
        "{} mismatch\n  expected: {}\n  actual:   {}",
        what, expected, actual
    )
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Fixtures under `root`, grouped by the subdirectory they live in.
/// Fixtures directly in `root` fall under the empty category.
fn discover(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut found: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            log::warn!("cannot read directory {}", dir.display());
            continue;
        };
        for path in entries.flatten().map(|e| e.path()) {
            if path.is_dir() {
                pending.push(path);
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(FIXTURE_SUFFIX))
            {
                let category = dir
                    .strip_prefix(root)
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                found.entry(category).or_default().push(path);
            }
        }
    }
    for paths in found.values_mut() {
        paths.sort();
    }
    found
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// Print the fixture categories found under `path`.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }
    let found = discover(path);
    if found.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }
    eprintln!("available categories:");
    for (category, paths) in &found {
        eprintln!("  {} ({} fixtures)", category_label(category), paths.len());
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

struct Style {
    color: bool,
}

impl Style {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }
}

/// Run every fixture under `path` (or the single fixture `path`), optionally
/// limited to `categories` and their subcategories.
/// Returns the process exit code: 0 when everything passed.
pub fn run_fixtures(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { color: !no_color };

    let selected: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let found = discover(path);
        if found.is_empty() {
            eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
            return 1;
        }
        select_categories(found, categories)
    };

    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<FixtureResult> = Vec::new();

    for (category, paths) in &selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", style.paint("1", category_label(category)));
        }
        for fixture in paths {
            let result = run_fixture(fixture);
            match result.outcome {
                Outcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), result.label);
                }
                Outcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), result.label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let Outcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("31", "FAILED"),
            passed,
            failed,
            passed + failed
        );
        1
    }
}

fn select_categories(
    found: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return found;
    }
    let wanted: Vec<&str> = requested.iter().map(|r| r.trim_matches('/')).collect();
    for req in &wanted {
        let known = found
            .keys()
            .any(|cat| cat == req || cat.starts_with(&format!("{}/", req)));
        if !known {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                found
                    .keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    found
        .into_iter()
        .filter(|(cat, _)| {
            wanted
                .iter()
                .any(|req| cat == req || cat.starts_with(&format!("{}/", req)))
        })
        .collect()
}
