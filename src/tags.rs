//! The `s3_media_url` template directive.
//!
//! Mirrors a template-engine tag: `s3_media_url <path>` where `<path>` is a
//! quoted literal or a context variable, with an optional `as <name>` suffix
//! that binds the resolved URL into the render context instead of emitting
//! it. `s3_static_url` is the same grammar resolved against the static base.

use crate::media::MediaUrls;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("`{0}` tag requires a path or url")]
    BadArguments(String),
    #[error("`{0}` tag requires a variable name to attach to")]
    MissingAsName(String),
    #[error("unknown tag `{0}`")]
    UnknownTag(String),
    #[error("variable `{0}` is not in the render context")]
    UnresolvedVariable(String),
    #[error(transparent)]
    Media(#[from] crate::errors::StorageError),
}

/// Which base URL the tag resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Media,
    Static,
}

/// The path argument: a quoted literal or a context variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagArg {
    Literal(String),
    Variable(String),
}

impl TagArg {
    fn from_token(token: &str) -> Self {
        let bytes = token.as_bytes();
        if token.len() >= 2
            && (bytes[0] == b'"' || bytes[0] == b'\'')
            && bytes[bytes.len() - 1] == bytes[0]
        {
            TagArg::Literal(token[1..token.len() - 1].to_string())
        } else {
            TagArg::Variable(token.to_string())
        }
    }

    fn resolve<'a>(&'a self, context: &'a HashMap<String, String>) -> Result<&'a str, TagError> {
        match self {
            TagArg::Literal(value) => Ok(value),
            TagArg::Variable(name) => context
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| TagError::UnresolvedVariable(name.clone())),
        }
    }
}

/// A parsed `s3_media_url` / `s3_static_url` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUrlTag {
    pub kind: TagKind,
    pub path: TagArg,
    pub as_var: Option<String>,
}

impl MediaUrlTag {
    /// Parse the full tag contents, tag name included, e.g.
    /// `s3_media_url "test/file.txt" as var`.
    pub fn parse(contents: &str) -> Result<Self, TagError> {
        let tokens = split_contents(contents);
        let tag = tokens
            .first()
            .ok_or_else(|| TagError::BadArguments(String::new()))?
            .clone();
        let kind = match tag.as_str() {
            "s3_media_url" => TagKind::Media,
            "s3_static_url" => TagKind::Static,
            other => return Err(TagError::UnknownTag(other.to_string())),
        };

        let mut args: Vec<&str> = Vec::new();
        let mut as_var = None;
        let mut rest = tokens[1..].iter();
        while let Some(token) = rest.next() {
            if token == "as" {
                let name = rest.next().ok_or_else(|| TagError::MissingAsName(tag.clone()))?;
                as_var = Some(name.clone());
                break;
            }
            args.push(token.as_str());
        }

        if args.len() != 1 {
            return Err(TagError::BadArguments(tag));
        }

        Ok(Self {
            kind,
            path: TagArg::from_token(args[0]),
            as_var,
        })
    }
}

/// Renders parsed tags against configured media and static bases.
#[derive(Debug, Clone)]
pub struct TagRenderer {
    media: MediaUrls,
    statics: MediaUrls,
}

impl TagRenderer {
    /// Use `media` for both media and static tags.
    pub fn new(media: MediaUrls) -> Self {
        let statics = media.clone();
        Self { media, statics }
    }

    /// Resolve `s3_static_url` against a separate base.
    pub fn with_static(mut self, statics: MediaUrls) -> Self {
        self.statics = statics;
        self
    }

    /// Render a parsed tag. With an `as` binding the URL is stored in
    /// `context` and the rendered output is empty.
    pub fn render(
        &self,
        tag: &MediaUrlTag,
        context: &mut HashMap<String, String>,
    ) -> Result<String, TagError> {
        let path = tag.path.resolve(context)?.to_string();
        let urls = match tag.kind {
            TagKind::Media => &self.media,
            TagKind::Static => &self.statics,
        };
        let url = urls.url(&path)?;

        match &tag.as_var {
            Some(name) => {
                context.insert(name.clone(), url);
                Ok(String::new())
            }
            None => Ok(url),
        }
    }

    /// Parse and render in one step.
    pub fn render_str(
        &self,
        contents: &str,
        context: &mut HashMap<String, String>,
    ) -> Result<String, TagError> {
        let tag = MediaUrlTag::parse(contents)?;
        self.render(&tag, context)
    }
}

/// Split tag contents on whitespace, keeping quoted runs (quotes included)
/// as single tokens.
fn split_contents(contents: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in contents.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
