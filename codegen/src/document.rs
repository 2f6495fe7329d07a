/// Stylesheet linked from every document unless configured otherwise.
pub const DEFAULT_STYLESHEET: &str = "example.css";

/// Wraps emitted markup and script into a complete HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembler {
    pub stylesheet: String,
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler {
            stylesheet: DEFAULT_STYLESHEET.to_string(),
        }
    }
}

impl Assembler {
    pub fn with_stylesheet(stylesheet: impl Into<String>) -> Self {
        Assembler {
            stylesheet: stylesheet.into(),
        }
    }

    /// Build the document. Every inline script shares the `el` variable
    /// declared at the top of the script block.
    pub fn assemble(&self, body: &str, script: &str) -> String {
        let mut html = String::with_capacity(body.len() + script.len() + 128);
        html.push_str("<html><head><link rel=\"stylesheet\" href=\"");
        html.push_str(&self.stylesheet);
        html.push_str("\"></head><body>");
        html.push_str(body);
        html.push_str("<script>let el;");
        html.push_str(script);
        html.push_str("</script></body></html>");
        html
    }
}

/// Assemble with the default stylesheet.
pub fn assemble(body: &str, script: &str) -> String {
    Assembler::default().assemble(body, script)
}
