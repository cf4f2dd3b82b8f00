use logos::Logos;

/// Token types for markup documents
///
/// Tag tokens keep their full slice; attributes are split out by the parser
/// so the lexer stays context-free.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"<!--([^-]|-[^-]|--[^>])*-->")]
pub enum Token<'src> {
    #[regex(
        r#"<[a-zA-Z][a-zA-Z0-9-]*([ \t\r\n]+[a-zA-Z_:][-a-zA-Z0-9_:.]*([ \t\r\n]*=[ \t\r\n]*("[^"]*"|'[^']*'|[^ \t\r\n"'>/=]+))?)*[ \t\r\n]*/?>"#,
        |lex| lex.slice()
    )]
    OpenTag(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>", |lex| lex.slice())]
    CloseTag(&'src str),

    #[regex(r"&(amp|lt|gt|quot|apos|nbsp|#[0-9]+|#x[0-9a-fA-F]+);", |lex| lex.slice())]
    Entity(&'src str),

    /// Collapsed caret marker used by fixtures
    #[token("[]")]
    Caret,

    /// Range anchor marker
    #[token("[")]
    AnchorMark,

    /// Range focus marker
    #[token("]")]
    FocusMark,

    #[regex(r"[^<&\[\]]+", |lex| lex.slice())]
    Text(&'src str),

    /// Stray characters that start nothing valid (a lone `<` or `&`)
    #[regex(r"[<&]", |lex| lex.slice())]
    Stray(&'src str),
}

impl<'src> Token<'src> {
    /// Raw source text of the token
    pub fn as_source(&self) -> &'src str {
        match self {
            Token::OpenTag(s)
            | Token::CloseTag(s)
            | Token::Entity(s)
            | Token::Text(s)
            | Token::Stray(s) => s,
            Token::Caret => "[]",
            Token::AnchorMark => "[",
            Token::FocusMark => "]",
        }
    }
}

/// Tokenize source into (token, span) pairs. Lexer errors surface as `Err`
/// with the offending byte range.
pub fn tokenize(source: &str) -> Vec<(Result<Token<'_>, ()>, std::ops::Range<usize>)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        tokens.push((token, lexer.span()));
    }
    tokens
}

/// Decode a single entity slice (including `&` and `;`)
pub fn decode_entity(entity: &str) -> Option<char> {
    let body = entity.strip_prefix('&')?.strip_suffix(';')?;
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let code = if let Some(hex) = body.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                body.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source)
            .into_iter()
            .map(|(t, _)| t.expect("lexes"))
            .collect()
    }

    #[test]
    fn test_tags_and_text() {
        let tokens = kinds(r#"<p class="a">ab</p>"#);
        assert_eq!(
            tokens,
            vec![
                Token::OpenTag(r#"<p class="a">"#),
                Token::Text("ab"),
                Token::CloseTag("</p>"),
            ]
        );
    }

    #[test]
    fn test_markers_and_entities() {
        let tokens = kinds("a[]b&nbsp;[c]");
        assert_eq!(
            tokens,
            vec![
                Token::Text("a"),
                Token::Caret,
                Token::Text("b"),
                Token::Entity("&nbsp;"),
                Token::AnchorMark,
                Token::Text("c"),
                Token::FocusMark,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        let tokens = kinds("<!-- note --><br/>");
        assert_eq!(tokens, vec![Token::OpenTag("<br/>")]);
    }

    #[test]
    fn test_decode_entity() {
        assert_eq!(decode_entity("&amp;"), Some('&'));
        assert_eq!(decode_entity("&nbsp;"), Some('\u{00A0}'));
        assert_eq!(decode_entity("&#65;"), Some('A'));
        assert_eq!(decode_entity("&#x41;"), Some('A'));
        assert_eq!(decode_entity("&bogus;"), None);
    }
}
