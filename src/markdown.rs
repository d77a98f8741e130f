//! Markdown-to-HTML conversion for post bodies. Besides the plain
//! conversion, the event stream is rewritten in two ways: headings are
//! demoted so a post's `#` renders subordinate to the site and post titles,
//! and internal links between source files are converted to their output
//! URLs (`foo.md` becomes `{posts_url}/foo.html`).

use crate::url::Converter as LinkConverter;
use pulldown_cmark::*;
use std::fmt;
use std::io;
use url::{ParseError as UrlParseError, Url};

/// Converts `markdown` to HTML, appending the result to `out`.
///
/// * `posts_url` is the prefix for post URLs (e.g.,
///   `https://example.org/posts/`). This should end in a trailing slash.
/// * `source_path` is the relative path to the source file from the posts
///   directory; relative links in the document resolve against it.
pub fn to_html(
    out: &mut String,
    posts_url: &Url,
    source_path: &str,
    markdown: &str,
) -> Result<(), Error> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let event_converter = EventConverter {
        link_converter: LinkConverter::new(posts_url, source_path)?,
    };
    let events = Parser::new_ext(markdown, options)
        .map(|ev| event_converter.convert(ev))
        .collect::<Result<Vec<Event>, UrlParseError>>()?;
    html::push_html(out, events.into_iter());
    Ok(())
}

struct EventConverter<'a> {
    link_converter: LinkConverter<'a>,
}

impl<'a> EventConverter<'a> {
    fn convert_tag<'b>(&self, tag: Tag<'b>) -> Result<Tag<'b>, UrlParseError> {
        Ok(match tag {
            // The headings in the post itself need to be demoted twice to
            // be subordinate to both the site title (h1) and the post title
            // (h2). So `#` becomes h3 instead of h1. We do this by
            // intercepting heading tags and returning the tag size + 2.
            Tag::Heading(s) => Tag::Heading(s + 2),

            // Internal links (links from blog posts, pages, and assets *to*
            // posts, pages, and assets) need to be converted from their input
            // formats to their output formats (e.g., a post linking to another
            // post as `foo.md` will need to be converted to an equivalent link
            // ending in `foo.html`).
            Tag::Link(
                link @ (LinkType::Inline
                | LinkType::Reference
                | LinkType::ReferenceUnknown
                | LinkType::Shortcut
                | LinkType::Autolink
                | LinkType::Collapsed
                | LinkType::CollapsedUnknown),
                url,
                title,
            ) => Tag::Link(
                link,
                CowStr::Boxed(
                    self.link_converter.convert(&url)?.into_boxed_str(),
                ),
                title,
            ),
            _ => tag,
        })
    }

    fn convert<'b>(&self, ev: Event<'b>) -> Result<Event<'b>, UrlParseError> {
        Ok(match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)?),
            _ => ev,
        })
    }
}

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned when there is a problem parsing URLs.
    UrlParse(UrlParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for IO operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn convert(markdown: &str) -> String {
        let posts_url = Url::parse("https://example.org/posts/").unwrap();
        let mut out = String::new();
        to_html(&mut out, &posts_url, "source.md", markdown).unwrap();
        out
    }

    #[test]
    fn test_headings_are_demoted() {
        let html = convert("# Heading");
        assert!(html.contains("<h3>"), "got: {}", html);
    }

    #[test]
    fn test_internal_links_are_converted() {
        let html = convert("[other](other.md)");
        assert!(
            html.contains(r#"href="https://example.org/posts/other.html""#),
            "got: {}",
            html
        );
    }

    #[test]
    fn test_external_links_are_preserved() {
        let html = convert("[remote](https://remote.org/page.html)");
        assert!(
            html.contains(r#"href="https://remote.org/page.html""#),
            "got: {}",
            html
        );
    }
}
