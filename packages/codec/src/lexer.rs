//! Lexer for the exchange format using logos.
//!
//! Markup needs two token sets: character data between tags, and the
//! attribute syntax inside a tag. The lexer morphs between the two modes on
//! `<` and `>`.

use crate::error::{CodecError, CodecResult};
use logos::Logos;
use std::ops::Range;

/// Tokens between tags
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
enum ContentToken<'src> {
    #[regex(r"<\?([^?]|\?[^>])*\?>")]
    Declaration,

    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    #[token("</")]
    CloseOpen,

    #[token("<")]
    Open,

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Tokens inside a tag
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
enum TagToken<'src> {
    #[regex(r"[A-Za-z_][A-Za-z0-9_.:\-]*", |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Quoted(&'src str),

    #[token(">")]
    Close,

    #[token("/>")]
    SelfClose,
}

/// Flattened token stream consumed by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'src> {
    /// `<`
    Open,
    /// `</`
    CloseOpen,
    Name(&'src str),
    Equals,
    /// Attribute value without its quotes, entities still encoded
    Quoted(&'src str),
    /// `>`
    Close,
    /// `/>`
    SelfClose,
    /// Character data with at least one non-whitespace character
    Text(&'src str),
}

impl<'src> Token<'src> {
    pub fn describe(&self) -> String {
        match self {
            Token::Open => "'<'".to_string(),
            Token::CloseOpen => "'</'".to_string(),
            Token::Name(name) => format!("name '{}'", name),
            Token::Equals => "'='".to_string(),
            Token::Quoted(_) => "quoted value".to_string(),
            Token::Close => "'>'".to_string(),
            Token::SelfClose => "'/>'".to_string(),
            Token::Text(_) => "text".to_string(),
        }
    }
}

impl<'src> From<TagToken<'src>> for Token<'src> {
    fn from(token: TagToken<'src>) -> Self {
        match token {
            TagToken::Name(name) => Token::Name(name),
            TagToken::Equals => Token::Equals,
            TagToken::Quoted(value) => Token::Quoted(value),
            TagToken::Close => Token::Close,
            TagToken::SelfClose => Token::SelfClose,
        }
    }
}

pub type Spanned<'src> = (Token<'src>, Range<usize>);

/// Tokenize a whole document, dropping declarations and comments
pub fn tokenize(source: &str) -> CodecResult<Vec<Spanned<'_>>> {
    let mut tokens = Vec::new();
    let mut content = ContentToken::lexer(source);

    while let Some(next) = content.next() {
        let span = content.span();
        let token = next.map_err(|_| CodecError::lexer_error(span.start))?;

        match token {
            ContentToken::Declaration | ContentToken::Comment => {}
            ContentToken::Text(text) => {
                if !text.trim().is_empty() {
                    tokens.push((Token::Text(text), span));
                }
            }
            ContentToken::Open | ContentToken::CloseOpen => {
                let opener = if token == ContentToken::Open {
                    Token::Open
                } else {
                    Token::CloseOpen
                };
                tokens.push((opener, span));

                let mut tag = content.morph::<TagToken>();
                loop {
                    let Some(next) = tag.next() else {
                        return Err(CodecError::unexpected_eof(source.len()));
                    };
                    let span = tag.span();
                    let token = next.map_err(|_| CodecError::lexer_error(span.start))?;
                    let done = matches!(token, TagToken::Close | TagToken::SelfClose);
                    tokens.push((token.into(), span));
                    if done {
                        break;
                    }
                }
                content = tag.morph();
            }
        }
    }

    Ok(tokens)
}
