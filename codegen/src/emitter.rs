use tasse::element::Element;

/// Output of one emission pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emitted {
    /// Nested `div` markup for the whole tree.
    pub body: String,
    /// Every element's wrapped script, in document order.
    pub script: String,
}

impl Emitted {
    pub fn into_parts(self) -> (String, String) {
        (self.body, self.script)
    }
}

/// Serialize an element tree depth-first.
///
/// Scripts are collected in the same pre-order as the markup, so a parent's
/// script always precedes its children's.
pub fn emit(root: &Element) -> Emitted {
    let mut out = Emitted::default();
    emit_element(root, &mut out);
    log::debug!(
        "emitted {} bytes of markup and {} bytes of script",
        out.body.len(),
        out.script.len()
    );
    out
}

fn emit_element(element: &Element, out: &mut Emitted) {
    if let Some(script) = &element.script {
        out.script.push_str(script);
    }

    let tag = element.tag.as_str();
    out.body.push_str(&format!("<{} id=\"{}\" class=\"", tag, element.id));
    out.body.push_str(element.style.as_deref().unwrap_or(""));
    out.body.push_str("\">");
    if let Some(text) = &element.text {
        out.body.push_str(text);
    }

    for child in &element.children {
        emit_element(child, out);
    }

    out.body.push_str("</");
    out.body.push_str(tag);
    out.body.push('>');
}
