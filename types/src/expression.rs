//! SQL fragment normalization
//!
//! Databases hand back generated-column expressions and default values in
//! their own formatting: `("price" * 2)` from SQLite, `(price * 2)` from
//! PostgreSQL, `'a'::text` instead of `'a'`. The functions here reduce such
//! fragments to a canonical form so two equivalent fragments compare equal.
//!
//! The canonical form:
//! - string literals are kept byte-for-byte
//! - unquoted words are ASCII-lowercased
//! - quoted identifiers (`"x"`, `` `x` ``, `[x]`) lose their quotes when the
//!   content is a plain lowercase identifier, otherwise they use double quotes
//! - whitespace collapses to one space between two words and disappears
//!   everywhere else
//! - parentheses wrapping the whole fragment are dropped

/// A lexical token of a SQL fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Bare identifier, keyword or number
    Word(&'a str),
    /// Quoted identifier content, unescaped
    Quoted(String),
    /// String literal including its quotes
    Literal(&'a str),
    /// Any other single character
    Punct(char),
    /// A run of whitespace
    Space,
}

impl Token<'_> {
    fn is_wordlike(&self) -> bool {
        matches!(self, Token::Word(_) | Token::Quoted(_) | Token::Literal(_))
    }

    fn is_punct(&self, c: char) -> bool {
        matches!(self, Token::Punct(p) if *p == c)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
}

/// Split a SQL fragment into tokens
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < input.len() {
        let c = input[i..].chars().next().unwrap_or(' ');
        let width = c.len_utf8();

        if c.is_whitespace() {
            let start = i;
            while i < input.len() && input[i..].starts_with(char::is_whitespace) {
                i += input[i..].chars().next().map_or(1, char::len_utf8);
            }
            if start != i {
                tokens.push(Token::Space);
            }
            continue;
        }

        match c {
            '\'' => {
                let start = i;
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if bytes.get(i + 1) == Some(&b'\'') {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                tokens.push(Token::Literal(&input[start..i.min(input.len())]));
            }
            '"' | '`' => {
                let (content, end) = scan_quoted(input, i, c, c);
                tokens.push(Token::Quoted(content));
                i = end;
            }
            '[' if input[i + 1..].starts_with(|ch: char| ch.is_ascii_alphabetic() || ch == '_') => {
                let (content, end) = scan_quoted(input, i, '[', ']');
                tokens.push(Token::Quoted(content));
                i = end;
            }
            c if is_word_char(c) => {
                let start = i;
                while i < input.len() {
                    match input[i..].chars().next() {
                        Some(ch) if is_word_char(ch) => i += ch.len_utf8(),
                        _ => break,
                    }
                }
                tokens.push(Token::Word(&input[start..i]));
            }
            other => {
                tokens.push(Token::Punct(other));
                i += width;
            }
        }
    }

    tokens
}

/// Scan a quoted identifier starting at `start`; returns the unescaped content
/// and the byte offset after the closing quote.
fn scan_quoted(input: &str, start: usize, open: char, close: char) -> (String, usize) {
    let mut content = String::new();
    let mut i = start + open.len_utf8();

    while i < input.len() {
        let Some(ch) = input[i..].chars().next() else {
            break;
        };
        i += ch.len_utf8();
        if ch == close {
            // doubled closing quote is an escaped quote
            if close != ']' && input[i..].starts_with(close) {
                content.push(close);
                i += close.len_utf8();
                continue;
            }
            return (content, i);
        }
        content.push(ch);
    }

    (content, i)
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

/// Drop leading/trailing spaces and parentheses that wrap the whole fragment
fn strip_outer_parens<'a>(mut tokens: &'a [Token<'a>]) -> &'a [Token<'a>] {
    loop {
        while let [Token::Space, rest @ ..] = tokens {
            tokens = rest;
        }
        while let [rest @ .., Token::Space] = tokens {
            tokens = rest;
        }

        if tokens.len() < 2 || !tokens[0].is_punct('(') || !tokens[tokens.len() - 1].is_punct(')')
        {
            return tokens;
        }

        // the opening paren must close at the very end
        let mut depth = 0usize;
        for (idx, token) in tokens.iter().enumerate() {
            match token {
                Token::Punct('(') => depth += 1,
                Token::Punct(')') => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && idx != tokens.len() - 1 {
                        return tokens;
                    }
                }
                _ => {}
            }
        }

        tokens = &tokens[1..tokens.len() - 1];
    }
}

fn push_canonical(out: &mut String, token: &Token<'_>) {
    match token {
        Token::Word(w) => out.push_str(&w.to_ascii_lowercase()),
        Token::Quoted(content) => {
            if is_plain_identifier(content) {
                out.push_str(content);
            } else {
                out.push('"');
                out.push_str(&content.replace('"', "\"\""));
                out.push('"');
            }
        }
        Token::Literal(lit) => out.push_str(lit),
        Token::Punct(c) => out.push(*c),
        Token::Space => {}
    }
}

/// Join tokens, keeping a single space only between two word-like tokens
fn join_tokens(tokens: &[Token<'_>], mut emit: impl FnMut(&mut String, usize, &Token<'_>)) -> String {
    let mut out = String::new();
    for (idx, token) in tokens.iter().enumerate() {
        if matches!(token, Token::Space) {
            let prev = tokens[..idx].iter().rev().find(|t| !matches!(t, Token::Space));
            let next = tokens[idx + 1..].iter().find(|t| !matches!(t, Token::Space));
            // `- -1` must not collapse into a `--` comment
            if let (Some(prev), Some(next)) = (prev, next)
                && ((prev.is_wordlike() && next.is_wordlike())
                    || (prev.is_punct('-') && next.is_punct('-'))
                    || (prev.is_punct('/') && next.is_punct('*')))
                && !out.ends_with(' ')
            {
                out.push(' ');
            }
            continue;
        }
        emit(&mut out, idx, token);
    }
    out
}

/// Normalize a SQL expression to its canonical form
///
/// ```
/// use drizzle_types::expression::normalize_expression;
///
/// assert_eq!(
///     normalize_expression("(\"first\"  ||  ' '  || last)"),
///     normalize_expression("first||' '||\"last\""),
/// );
/// assert_eq!(normalize_expression("LOWER( Name )"), "lower(name)");
/// ```
#[must_use]
pub fn normalize_expression(expr: &str) -> String {
    let tokens = tokenize(expr);
    let inner = strip_outer_parens(&tokens);
    join_tokens(inner, |out, _, token| push_canonical(out, token))
}

/// Returns `true` if `expr` names `column` as a bare or quoted identifier
#[must_use]
pub fn mentions_column(expr: &str, column: &str) -> bool {
    tokenize(expr).iter().any(|t| match t {
        Token::Word(w) => w.eq_ignore_ascii_case(column),
        Token::Quoted(q) => *q == column,
        _ => false,
    })
}

/// Normalize a column default for comparison
///
/// Trailing PostgreSQL casts are dropped on top of [`normalize_expression`],
/// so `'active'::character varying` and `'active'` compare equal.
#[must_use]
pub fn normalize_default(value: &str) -> String {
    let tokens = tokenize(value);
    let inner = strip_outer_parens(&tokens);
    let end = trailing_cast_start(inner).unwrap_or(inner.len());
    let without_cast = strip_outer_parens(&inner[..end]);
    join_tokens(without_cast, |out, _, token| push_canonical(out, token))
}

/// Index of the `::` introducing a trailing top-level type cast, if any
fn trailing_cast_start(tokens: &[Token<'_>]) -> Option<usize> {
    let mut depth = 0usize;
    let mut cast_at = None;

    for idx in 0..tokens.len() {
        match &tokens[idx] {
            Token::Punct('(') | Token::Punct('[') => depth += 1,
            Token::Punct(')') | Token::Punct(']') => depth = depth.saturating_sub(1),
            Token::Punct(':') if depth == 0 && tokens.get(idx + 1).is_some_and(|t| t.is_punct(':')) => {
                if cast_at.is_none_or(|at: usize| idx > at + 1) {
                    cast_at = Some(idx);
                }
            }
            Token::Literal(_) if depth == 0 => cast_at = None,
            _ => {}
        }
    }

    let at = cast_at?;
    let tail_is_type = tokens[at + 2..].iter().all(|t| {
        matches!(
            t,
            Token::Word(_)
                | Token::Quoted(_)
                | Token::Space
                | Token::Punct('(' | ')' | ',' | '[' | ']' | ':' | '.')
        )
    });
    (tail_is_type && at > 0).then_some(at)
}

/// Strip qualifiers naming `table` from column references
///
/// `users.first || "users"."last"` becomes `first||last` for table `users`.
/// A schema-qualified reference (`public.users.first`) loses both prefixes.
#[must_use]
pub fn strip_qualifier(expr: &str, table: &str) -> String {
    let tokens = tokenize(expr);
    let names_table = |t: &Token<'_>| match t {
        Token::Word(w) => w.eq_ignore_ascii_case(table),
        Token::Quoted(q) => q == table,
        _ => false,
    };
    let is_ident = |t: &Token<'_>| matches!(t, Token::Word(_) | Token::Quoted(_));

    let mut skip = vec![false; tokens.len()];
    for idx in 0..tokens.len() {
        if names_table(&tokens[idx])
            && tokens.get(idx + 1).is_some_and(|t| t.is_punct('.'))
            && tokens.get(idx + 2).is_some_and(is_ident)
        {
            skip[idx] = true;
            skip[idx + 1] = true;
            if idx >= 2 && tokens[idx - 1].is_punct('.') && is_ident(&tokens[idx - 2]) {
                skip[idx - 1] = true;
                skip[idx - 2] = true;
            }
        }
    }

    let kept: Vec<Token<'_>> = tokens
        .into_iter()
        .zip(skip)
        .filter_map(|(t, s)| (!s).then_some(t))
        .collect();
    join_tokens(&kept, |out, _, token| push_canonical(out, token))
}

/// Render a canonical expression for a target dialect
///
/// References to `columns` of the owning table and every quoted identifier
/// go through `quote`, so the fragment is valid for the dialect's quoting
/// rules without any outside context.
pub fn render_expression(expr: &str, columns: &[&str], quote: impl Fn(&str) -> String) -> String {
    let tokens = tokenize(expr);
    join_tokens(&tokens, |out, idx, token| match token {
        Token::Word(w) => {
            let prev = tokens[..idx].iter().rev().find(|t| !matches!(t, Token::Space));
            let next = tokens[idx + 1..].iter().find(|t| !matches!(t, Token::Space));
            let is_call = next.is_some_and(|t| t.is_punct('('));
            let is_member = prev.is_some_and(|t| t.is_punct('.'));
            match columns.iter().find(|c| c.eq_ignore_ascii_case(w)) {
                Some(column) if !is_call && !is_member => out.push_str(&quote(column)),
                _ => out.push_str(w),
            }
        }
        Token::Quoted(content) => out.push_str(&quote(content)),
        Token::Literal(lit) => out.push_str(lit),
        Token::Punct(c) => out.push(*c),
        Token::Space => {}
    })
}
