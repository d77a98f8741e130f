//! Defines the [`Post`] type: a single blog post parsed from a markdown
//! source file, immutable after parsing and identified uniquely by its
//! `slug`. See [`Post::to_value`] and [`Post::summarize`] for how posts are
//! converted into template values.

use crate::tag::Tag;
use chrono::NaiveDate;
use gtmpl_value::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use url::Url;

/// The marker which separates a post's above-the-fold summary from the rest
/// of its body.
const FOLD_TAG: &str = "<!-- more -->";

/// The format posts are rendered with on index pages and in the feed,
/// e.g., `April 16, 2021`.
const DISPLAY_DATE_FORMAT: &str = "%B %-d, %Y";

/// A single blog post.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The post's unique path identifier: the source file's stem, or the
    /// directory name for post bundles.
    pub slug: String,

    /// The post's title, from the front-matter.
    pub title: String,

    /// The publication date, from the front-matter.
    pub date: NaiveDate,

    /// An optional one-line description, from the front-matter. Used in
    /// place of the body summary on index pages when present.
    pub description: Option<String>,

    /// The location on disk the rendered post page will be written to.
    pub file_path: PathBuf,

    /// The post page's URL: `{posts_url}/{slug}.html`.
    pub url: Url,

    /// The post's tags, in authored order.
    pub tags: Vec<Tag>,

    /// The post's body, already rendered to HTML.
    pub body: String,
}

impl Post {
    /// Returns the post body up to the fold marker (`<!-- more -->`) and
    /// whether the marker was found (i.e., whether the body was truncated).
    pub fn summary(&self) -> (&str, bool) {
        match self.body.find(FOLD_TAG) {
            Some(i) => (&self.body[..i], true),
            None => (&self.body, false),
        }
    }

    /// The short text shown for this post on index pages and in the feed:
    /// the front-matter description when present, the summary otherwise.
    pub fn excerpt(&self) -> &str {
        match &self.description {
            Some(description) => description,
            None => self.summary().0,
        }
    }

    /// The publication date as rendered on pages.
    pub fn date_display(&self) -> String {
        self.date.format(DISPLAY_DATE_FORMAT).to_string()
    }

    /// Converts the full post into a [`Value`] for the post-page template.
    pub fn to_value(&self) -> Value {
        let mut m = self.common_fields();
        m.insert("body".to_owned(), (&self.body).into());
        Value::Object(m)
    }

    /// Converts the post into an abbreviated [`Value`] for index pages:
    /// the excerpt stands in for the body, and `summarized` tells the
    /// template whether a "read more" link is warranted.
    pub fn summarize(&self) -> Value {
        let (_, summarized) = self.summary();
        let mut m = self.common_fields();
        m.insert("summary".to_owned(), self.excerpt().into());
        m.insert(
            "summarized".to_owned(),
            Value::from(summarized || self.description.is_some()),
        );
        Value::Object(m)
    }

    fn common_fields(&self) -> HashMap<String, Value> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("slug".to_owned(), (&self.slug).into());
        m.insert("title".to_owned(), (&self.title).into());
        m.insert("date".to_owned(), self.date_display().into());
        m.insert("url".to_owned(), Value::String(self.url.to_string()));
        m.insert(
            "tags".to_owned(),
            Value::Array(self.tags.iter().map(Value::from).collect()),
        );
        m
    }
}
