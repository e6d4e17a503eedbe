//! Line-level directive grammar
//!
//! Two surface syntaxes are accepted:
//! - comment directives: `" Bundle: <source> [ref]`, `" Bundle-Command: <cmd>`,
//!   `" Static: <name>` (keyword case-insensitive)
//! - bare calls: `Bundle '<source>' [ref]`, `Bundle! '<source>'`,
//!   `BundleCommand '<cmd>'`
//!
//! Every accepted keyword spelling maps to one [`Keyword`] through [`KEYWORDS`].

use std::sync::LazyLock;

use regex::Regex;

/// Logical directive type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Bundle,
    BundleCommand,
    Static,
}

/// Accepted spellings, compared after lowercasing
pub const KEYWORDS: &[(&str, Keyword)] = &[
    ("bundle", Keyword::Bundle),
    ("bundle-command", Keyword::BundleCommand),
    ("bundlecommand", Keyword::BundleCommand),
    ("static", Keyword::Static),
];

/// A directive recognised on one manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Bundle {
        source: String,
        git_ref: Option<String>,
        is_static: bool,
    },
    Command(String),
    Static(String),
    /// Recognised keyword with unusable arguments
    Invalid(String),
}

static COMMENT_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*"\s*([A-Za-z][A-Za-z-]*)\s*:\s*(.*?)\s*$"#)
        .expect("valid comment directive regex")
});

static BARE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(Bundle|BundleCommand)(!?)(?:\s+(.*?))?\s*$")
        .expect("valid bare directive regex")
});

fn lookup_keyword(word: &str) -> Option<Keyword> {
    let word = word.to_ascii_lowercase();
    KEYWORDS
        .iter()
        .find(|(spelling, _)| *spelling == word)
        .map(|(_, keyword)| *keyword)
}

/// Recognise the directive on `line`, if any
pub fn parse_line(line: &str) -> Option<Directive> {
    if let Some(caps) = COMMENT_DIRECTIVE.captures(line) {
        let keyword = lookup_keyword(&caps[1])?;
        let args = caps.get(2).map_or("", |m| m.as_str());
        return Some(comment_directive(keyword, args));
    }

    let caps = BARE_DIRECTIVE.captures(line)?;
    let keyword = lookup_keyword(&caps[1])?;
    let bang = !caps[2].is_empty();
    let args = caps.get(3).map_or("", |m| m.as_str());
    Some(bare_directive(keyword, bang, args))
}

fn comment_directive(keyword: Keyword, args: &str) -> Directive {
    match keyword {
        Keyword::Bundle => {
            let mut words = args.split_whitespace();
            match words.next() {
                Some(source) => Directive::Bundle {
                    source: source.to_string(),
                    git_ref: words.next().map(str::to_string),
                    is_static: false,
                },
                None => Directive::Invalid("Bundle needs a source".to_string()),
            }
        }
        Keyword::BundleCommand if args.is_empty() => {
            Directive::Invalid("BundleCommand needs a command".to_string())
        }
        Keyword::BundleCommand => Directive::Command(args.to_string()),
        Keyword::Static => match args.split_whitespace().next() {
            Some(name) => Directive::Static(name.to_string()),
            None => Directive::Invalid("Static needs a directory name".to_string()),
        },
    }
}

fn bare_directive(keyword: Keyword, bang: bool, args: &str) -> Directive {
    let words = split_call_args(args);
    match keyword {
        Keyword::Bundle => {
            let mut words = words.into_iter();
            match words.next() {
                Some(source) => Directive::Bundle {
                    source,
                    git_ref: words.next(),
                    is_static: bang,
                },
                None => Directive::Invalid("Bundle needs a source".to_string()),
            }
        }
        Keyword::BundleCommand if bang => {
            Directive::Invalid("BundleCommand does not take '!'".to_string())
        }
        Keyword::BundleCommand => match words.into_iter().next() {
            Some(command) => Directive::Command(command),
            None => Directive::Invalid("BundleCommand needs a command".to_string()),
        },
        Keyword::Static => Directive::Invalid("Static has no call form".to_string()),
    }
}

/// Split the arguments of a bare call into words.
///
/// Quoted strings (single or double) form one word; separators are
/// whitespace and commas. Parsing stops at an option dictionary (`{`).
fn split_call_args(args: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut chars = args.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | ',' => {
                chars.next();
            }
            '{' => break,
            '\'' | '"' => {
                chars.next();
                let word: String = chars.by_ref().take_while(|&ch| ch != c).collect();
                words.push(word);
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || ch == ',' {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                words.push(word);
            }
        }
    }

    words
}
