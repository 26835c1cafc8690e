//! Rendering of positioned diagnostics.
//!
//! The pipeline stages return typed errors; turning them into text is the
//! driver's decision. The format is
//!
//! ```text
//! Error: <filepath> Line <L>:<C> :
//! <offending source line>
//! <caret padding>^
//! <message>
//! ```
//!
//! with 0-based line and column numbers.

/// Renders one diagnostic against the source buffer it was produced from.
pub fn render(filepath: &str, source: &str, line: u32, column: u32, message: &str) -> String {
    let mut out = format!("Error: {filepath} Line {line}:{column} :\n");

    if let Some(text) = source.lines().nth(line as usize) {
        out.push_str(text);
        out.push('\n');
        for _ in 0..column {
            out.push(' ');
        }
        out.push_str("^\n");
    }

    out.push_str(message);
    out.push('\n');
    out
}

#[cfg(test)]
mod diagnostics_tests {
    use super::*;

    #[test]
    fn test_render_points_at_the_column() {
        let source = "int x;\nint y = @;\n";
        let rendered = render("t.c", source, 1, 8, "unexpected character: @");
        let expected = "\
Error: t.c Line 1:8 :
int y = @;
        ^
unexpected character: @
";
        assert_eq!(expected, rendered);
    }

    #[test]
    fn test_render_survives_out_of_range_lines() {
        let rendered = render("t.c", "int x;", 7, 0, "reached end of input");
        assert!(rendered.starts_with("Error: t.c Line 7:0 :\n"));
        assert!(rendered.ends_with("reached end of input\n"));
    }
}
