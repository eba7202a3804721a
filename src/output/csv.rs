//! Compact CSV rendering for LLM consumption.
//!
//! RFC 4180 quoting: a field is quoted when it contains a comma, quote,
//! or line break; embedded quotes are doubled. Writing is the only
//! direction this server needs, so there is no parser here.

/// Escape one field per RFC 4180.
#[must_use]
pub fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

/// Render a header plus rows into one CSV blob.
///
/// Rows shorter than the header are padded with empty fields so every
/// line has the same arity.
#[must_use]
pub fn render(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        let mut fields: Vec<String> = row.iter().map(|f| escape(f)).collect();
        while fields.len() < header.len() {
            fields.push(String::new());
        }
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_pass_through() {
        assert_eq!(escape("hello"), "hello");
    }

    #[test]
    fn quoting_and_doubling() {
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn rows_are_padded_to_header_arity() {
        let out = render(&["a", "b", "c"], &[vec!["1".into()]]);
        assert_eq!(out, "a,b,c\n1,,\n");
    }
}
