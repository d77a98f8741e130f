//! Conversion of intra-site links from their source form to their output
//! form. Posts link to each other by markdown source path (`foo.md`,
//! `foo/index.md`); the rendered site serves `foo.html`. Anything outside
//! the posts directory passes through untouched (normalized).

use url::{ParseError, Url};

const MARKDOWN_EXTENSION: &str = ".md";
const HTML_EXTENSION: &str = ".html";

/// Rewrites link targets found in one source document.
pub struct Converter<'a> {
    posts_root: &'a Url,
    base: Url,
}

impl<'a> Converter<'a> {
    /// Constructs a new `Converter`.
    ///
    /// # Arguments
    ///
    /// * `posts_root` - the URL prefix for posts.
    /// * `base` - the relative path from `posts_root` of the document whose
    ///   links are being converted.
    pub fn new(posts_root: &'a Url, base: &str) -> Result<Converter<'a>> {
        Ok(Converter {
            posts_root,
            base: posts_root.join(base)?,
        })
    }

    /// Converts a single link target. Relative targets resolve against the
    /// document's own URL first.
    pub fn convert(&self, url: &str) -> Result<String> {
        Ok(self.convert_unknown(url)?.to_string())
    }

    fn convert_unknown(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(absolute) => self.convert_absolute(absolute),
            Err(ParseError::RelativeUrlWithoutBase) => {
                self.convert_absolute(self.base.join(url)?)
            }
            Err(e) => Err(e),
        }
    }

    fn convert_absolute(&self, absolute: Url) -> Result<Url> {
        if let Some(relative) = self.posts_root.make_relative(&absolute) {
            if !relative.starts_with("../")
                && relative.ends_with(MARKDOWN_EXTENSION)
            {
                let stem = match Self::parse_bundle_base(&relative) {
                    Some(base) => base,
                    None => relative.trim_end_matches(MARKDOWN_EXTENSION),
                };
                // Joining a post-relative path onto the posts root URL
                // always succeeds.
                return Ok(self
                    .posts_root
                    .join(&format!("{}{}", stem, HTML_EXTENSION))
                    .unwrap());
            }
        }
        Ok(absolute)
    }

    /// A top-level `{name}/index.md` target addresses the bundle post
    /// `{name}.html`; nested `index.md` paths don't.
    fn parse_bundle_base(normalized: &str) -> Option<&str> {
        let base = normalized.trim_end_matches("/index.md");
        if base == normalized || base.contains('/') {
            None
        } else {
            Some(base)
        }
    }
}

type Result<T> = std::result::Result<T, ParseError>;
