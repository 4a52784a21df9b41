//! Inline emphasis: `**bold**` spans inside a single line of text.

/// One run of inline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    /// Literal text, including any unmatched `**` markers.
    Text(String),
    /// Text that was wrapped in a matching `**` pair.
    Strong(String),
}

/// A line of text split into plain and emphasized spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub spans: Vec<Span>,
}

impl RichText {
    /// A single plain span (or nothing, for empty input).
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self {
            spans: vec![Span::Text(text)],
        }
    }

    /// The text with all emphasis removed.
    pub fn to_plain_string(&self) -> String {
        self.spans
            .iter()
            .map(|span| match span {
                Span::Text(s) | Span::Strong(s) => s.as_str(),
            })
            .collect()
    }
}

const MARKER: &str = "**";

/// Split `text` into spans, converting each matched `**…**` pair into
/// [`Span::Strong`]. Unmatched markers and pairs enclosing only whitespace
/// stay literal.
pub fn parse_inline(text: &str) -> RichText {
    let mut spans = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(open) = rest.find(MARKER) {
        let after_open = &rest[open + MARKER.len()..];
        let Some(close) = after_open.find(MARKER) else {
            break;
        };

        let inner = &after_open[..close];
        let consumed = open + MARKER.len() + close + MARKER.len();

        if inner.trim().is_empty() {
            literal.push_str(&rest[..consumed]);
        } else {
            literal.push_str(&rest[..open]);
            if !literal.is_empty() {
                spans.push(Span::Text(std::mem::take(&mut literal)));
            }
            spans.push(Span::Strong(inner.to_string()));
        }
        rest = &rest[consumed..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        spans.push(Span::Text(literal));
    }

    RichText { spans }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Span {
        Span::Text(s.into())
    }

    fn strong(s: &str) -> Span {
        Span::Strong(s.into())
    }

    #[test]
    fn no_markers_is_single_text_span() {
        assert_eq!(parse_inline("plain words").spans, vec![text("plain words")]);
    }

    #[test]
    fn bold_in_the_middle() {
        let rt = parse_inline("Risk is **high** today");
        assert_eq!(rt.spans, vec![text("Risk is "), strong("high"), text(" today")]);
        assert_eq!(rt.to_plain_string(), "Risk is high today");
    }

    #[test]
    fn multiple_pairs() {
        let rt = parse_inline("**A**: x, **B**: y");
        assert_eq!(
            rt.spans,
            vec![strong("A"), text(": x, "), strong("B"), text(": y")]
        );
    }

    #[test]
    fn unmatched_marker_stays_literal() {
        let rt = parse_inline("**Important: call the press office");
        assert_eq!(rt.spans, vec![text("**Important: call the press office")]);
    }

    #[test]
    fn trailing_unmatched_after_pair() {
        let rt = parse_inline("**done** and **open");
        assert_eq!(rt.spans, vec![strong("done"), text(" and **open")]);
    }

    #[test]
    fn empty_pair_stays_literal() {
        assert_eq!(parse_inline("a **** b").spans, vec![text("a **** b")]);
        assert_eq!(parse_inline("x ** ** y").spans, vec![text("x ** ** y")]);
    }

    #[test]
    fn empty_input_has_no_spans() {
        assert!(parse_inline("").spans.is_empty());
        assert!(RichText::plain("").spans.is_empty());
    }
}
