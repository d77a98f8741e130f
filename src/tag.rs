//! Defines the [`Tag`] and [`TagGroup`] types and the tag-aggregation
//! functions which back the per-tag index pages and the all-tags overview
//! page: [`slugify`] (the addressing transform for tag pages),
//! [`group_tags`] (distinct tags with post counts, most frequent first), and
//! [`filter_by_tag`] (the posts carrying a tag, newest first). All three are
//! pure functions over in-memory posts; the aggregate is recomputed from
//! scratch on every build.

use crate::post::Post;
use gtmpl_value::Value;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use url::Url;

/// Represents a [`Post`] tag. The `name` field is the raw tag string as
/// authored in the post's front-matter; grouping and filtering match on it
/// exactly (case- and form-sensitive). Only the slugified form appears in
/// URLs.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag's name, verbatim from the front-matter.
    pub name: String,

    /// The URL for the tag's listing page. Given a `tags_base_url`, this
    /// looks like `{tags_base_url}/{slugify(name)}/`.
    pub url: Url,
}

impl Tag {
    /// The URL-safe form of the tag's name. See [`slugify`].
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating
    /// directly to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(t: &Tag) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("tag".to_owned(), (&t.name).into());
        m.insert("slug".to_owned(), t.slug().into());
        m.insert("url".to_owned(), Value::String(t.url.to_string()));
        Value::Object(m)
    }
}

/// A distinct tag together with the number of posts carrying it. Derived by
/// [`group_tags`]; never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct TagGroup {
    pub tag: Tag,
    pub count: usize,
}

impl From<&TagGroup> for Value {
    /// Converts [`TagGroup`]s into [`Value`]s for templating.
    fn from(g: &TagGroup) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("tag".to_owned(), (&g.tag.name).into());
        m.insert("slug".to_owned(), g.tag.slug().into());
        m.insert("url".to_owned(), Value::String(g.tag.url.to_string()));
        m.insert("count".to_owned(), Value::from(g.count as u64));
        Value::Object(m)
    }
}

/// Converts a tag name into its URL-safe lowercase-kebab form, e.g.,
/// `Machine Learning` becomes `machine-learning`. This is the addressing
/// scheme for tag pages, so changing it breaks existing external links. The
/// transform is pure and idempotent.
///
/// Two distinct tag names can collide after slugification (`Go!` and `go`).
/// The groups stay distinct in [`group_tags`] output, but their listing
/// pages share an output path and the page written last wins.
pub fn slugify(tag: &str) -> String {
    slug::slugify(tag)
}

/// Counts the posts carrying each distinct tag and returns the groups
/// sorted by descending count. Equal counts order ascending by raw tag
/// name, so the output is deterministic for a given set of posts. A post
/// with N tags contributes to N groups.
pub fn group_tags(posts: &[Post]) -> Vec<TagGroup> {
    let mut groups: HashMap<&str, TagGroup> = HashMap::new();
    for post in posts {
        for tag in post.tags.iter() {
            groups
                .entry(tag.name.as_str())
                .or_insert_with(|| TagGroup {
                    tag: tag.clone(),
                    count: 0,
                })
                .count += 1;
        }
    }

    let mut groups: Vec<TagGroup> = groups.into_iter().map(|(_, g)| g).collect();
    groups.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.tag.name.cmp(&b.tag.name))
    });
    groups
}

/// Returns the posts whose tag list contains `tag` exactly (no substring or
/// case-folded matches), sorted by publication date descending. An
/// unmatched tag yields an empty vector.
pub fn filter_by_tag<'a>(posts: &'a [Post], tag: &str) -> Vec<&'a Post> {
    let mut matched: Vec<&Post> = posts
        .iter()
        .filter(|p| p.tags.iter().any(|t| t.name == tag))
        .collect();
    matched.sort_by(|a, b| b.date.cmp(&a.date));
    matched
}
