//
// ─── DIAGNOSIS ─────────────────────────────────────────────────────────────────
//

/// Outcome of an assessment: either free text or a structured payload of
/// labeled fields, depending on what the backend returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    Text(String),
    Structured(Vec<(String, String)>),
}

impl Diagnosis {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Renders the diagnosis as display lines.
    ///
    /// Structured payloads become one `Key: value` line per field. Free text
    /// is split at sentence boundaries; when that yields a single line the
    /// splitter falls back to `";"` and `" - "` separators.
    #[must_use]
    pub fn display_lines(&self) -> Vec<String> {
        match self {
            Diagnosis::Structured(fields) => fields
                .iter()
                .map(|(key, value)| format!("{}: {value}", capitalize(key)))
                .collect(),
            Diagnosis::Text(text) => split_sentences(text),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    let parts: Vec<&str> = text.split(". ").filter(|part| !part.is_empty()).collect();
    let mut lines = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 && !part.ends_with('.') {
            lines.push((*part).to_string());
        } else {
            let mut line = (*part).to_string();
            if !line.ends_with('.') {
                line.push('.');
            }
            lines.push(line);
        }
    }

    if lines.len() <= 1 {
        let replaced = text.replace(';', "\n").replace(" - ", "\n");
        lines = replaced
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();
    }

    lines
}
