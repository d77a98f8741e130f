//! Responsible for templating and writing HTML pages to disk from [`Post`]
//! sources: one page per post (with previous/next links), the paginated
//! all-posts index, a paginated index per tag (addressed by the tag's
//! slug), and the all-tags overview page. The overview page is where the
//! tag aggregate meets the isotype chart: the most frequent tags are fed
//! through [`crate::isotype::compute_layout`] and rendered as an inline
//! SVG.

use crate::isotype;
use crate::post::Post;
use crate::tag::{filter_by_tag, group_tags, TagGroup};
use gtmpl::{Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The number of tag groups fed into the overview chart. Beyond the first
/// few, counts collapse into a long tail of ones and the chart stops
/// saying anything.
const TAG_CHART_COLUMNS: usize = 8;

/// The overview chart's plot dimensions, in SVG user units.
const TAG_CHART_WIDTH: f64 = 640.0;
const TAG_CHART_HEIGHT: f64 = 240.0;

/// Responsible for indexing, templating, and writing HTML pages to disk
/// from [`Post`] sources.
pub struct Writer<'a> {
    /// The template for post pages.
    pub posts_template: &'a Template,

    /// The template for index pages (the all-posts index and the per-tag
    /// indexes).
    pub index_template: &'a Template,

    /// The template for the all-tags overview page.
    pub tags_template: &'a Template,

    /// The base URL for the main index pages. The main index pages will be
    /// located at `{index_base_url}/index.html`, `{index_base_url}/1.html`,
    /// etc.
    pub index_base_url: &'a url::Url,

    /// The base URL for tag pages. The overview page is located at
    /// `{tags_base_url}/index.html` and the per-tag index pages at
    /// `{tags_base_url}/{slug}/index.html`, `{tags_base_url}/{slug}/1.html`,
    /// etc.
    pub tags_base_url: &'a url::Url,

    /// The directory in which the main index HTML files will be written.
    pub index_output_directory: &'a Path,

    /// The directory in which the tag pages will be written: the overview
    /// at `{tags_output_directory}/index.html` and each tag's pages under
    /// `{tags_output_directory}/{slug}/`.
    pub tags_output_directory: &'a Path,

    /// The number of posts per index page.
    pub index_page_size: usize,

    /// The URL for the site's home page. This is made available to all
    /// templates, typically as the destination for the site-header link.
    pub home_page: &'a url::Url,

    /// The URL for the static assets. This is made available to all
    /// templates, typically for the theme's stylesheet.
    pub static_url: &'a url::Url,

    /// The URL for the Atom feed. This is made available to all templates,
    /// typically for a `<link rel="alternate">` entry.
    pub atom_url: &'a url::Url,
}

impl Writer<'_> {
    /// Takes a slice of [`Post`], groups it by tag, and writes post, index,
    /// and tag pages to disk.
    pub fn write_posts(&self, posts: &[Post]) -> Result<()> {
        use std::collections::HashSet;
        let groups = group_tags(posts);
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        for page in self.pages(posts, &groups)? {
            let dir = page.file_path.parent().unwrap(); // page paths always have a parent
            if seen_dirs.insert(dir.to_owned()) {
                std::fs::create_dir_all(dir)?;
            }
            self.write_page(&page)?;
        }
        Ok(())
    }

    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let mut value = page.to_value();
        if let Value::Object(obj) = &mut value {
            obj.insert(
                "home_page".to_owned(),
                Value::String(self.home_page.to_string()),
            );
            obj.insert(
                "static_url".to_owned(),
                Value::String(self.static_url.to_string()),
            );
            obj.insert(
                "atom_url".to_owned(),
                Value::String(self.atom_url.to_string()),
            );
        }
        page.template.execute(
            &mut std::fs::File::create(&page.file_path)?,
            &gtmpl::Context::from(value).unwrap(),
        )?;
        Ok(())
    }

    /// Creates all of the [`Page`]s for a set of posts and their tag
    /// groups: index pages for the main index and for every tag, one page
    /// per post, and the all-tags overview page.
    fn pages<'a>(
        &'a self,
        posts: &'a [Post],
        groups: &'a [TagGroup],
    ) -> Result<Vec<Page<'a>>> {
        let mut pages = Vec::new();
        for index in self.indices(posts, groups)? {
            pages.extend(index.to_pages(self.index_page_size, self.index_template)?);
        }
        pages.extend(post_pages(posts, self.posts_template));
        pages.push(self.tags_page(groups));
        Ok(pages)
    }

    /// Creates the main index plus one [`Index`] per tag group. The main
    /// index covers all posts; each tag index covers the posts carrying
    /// that tag, newest first.
    fn indices<'a>(
        &self,
        posts: &'a [Post],
        groups: &'a [TagGroup],
    ) -> Result<Vec<Index<'a>>> {
        let mut indices = Vec::with_capacity(groups.len() + 1);
        indices.push(Index {
            tag: None,
            url: self.index_base_url.clone(),
            output_directory: self.index_output_directory.to_owned(),
            posts: posts.iter().collect(),
        });

        for group in groups {
            let slug = group.tag.slug();
            indices.push(Index {
                tag: Some(group),
                url: self.tags_base_url.join(&format!("{}/", slug))?,
                output_directory: self.tags_output_directory.join(&slug),
                posts: filter_by_tag(posts, &group.tag.name),
            });
        }
        Ok(indices)
    }

    /// Creates the all-tags overview [`Page`]: every group ordered most
    /// frequent first, plus an isotype chart of the leading groups.
    fn tags_page<'a>(&'a self, groups: &[TagGroup]) -> Page<'a> {
        let mut item: HashMap<String, Value> = HashMap::new();
        item.insert(
            "groups".to_owned(),
            Value::Array(groups.iter().map(Value::from).collect()),
        );
        item.insert("chart".to_owned(), Value::String(tag_chart(groups)));

        Page {
            item: Value::Object(item),
            file_path: self.tags_output_directory.join("index.html"),
            prev: None,
            next: None,
            template: self.tags_template,
        }
    }
}

/// Renders the overview chart for the leading tag groups as a standalone
/// `<svg>` element. The groups arrive sorted most frequent first, so the
/// leading groups are the most frequent tags.
fn tag_chart(groups: &[TagGroup]) -> String {
    let columns: Vec<isotype::Column> = groups
        .iter()
        .take(TAG_CHART_COLUMNS)
        .map(|g| isotype::Column::new(g.tag.name.clone(), g.count as u32))
        .collect();
    let layout = isotype::compute_layout(
        &columns,
        TAG_CHART_WIDTH,
        TAG_CHART_HEIGHT,
        isotype::DEFAULT_SCALE_FACTOR,
    );
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}" role="img">{}</svg>"#,
        TAG_CHART_WIDTH,
        TAG_CHART_HEIGHT,
        TAG_CHART_WIDTH,
        TAG_CHART_HEIGHT,
        isotype::render_svg(&columns, &layout, &isotype::RectIcon),
    )
}

/// An object representing an output HTML file. A [`Page`] can be converted
/// to a [`Value`] and thus rendered in a template via [`Page::to_value`].
struct Page<'a> {
    /// The main item for the page.
    item: Value,

    /// The target location on disk for the output file.
    file_path: PathBuf,

    /// The URL for the previous page, if any.
    prev: Option<url::Url>,

    /// The URL for the next page, if any.
    next: Option<url::Url>,

    /// The template with which the page will be rendered.
    template: &'a Template,
}

impl Page<'_> {
    /// Converts a [`Page`] into a [`Value`]. The result is a
    /// [`Value::Object`] with fields `item`, `prev`, and `next` (see
    /// [`Page`] for descriptions).
    fn to_value(&self) -> Value {
        let option_to_value = |opt: &Option<url::Url>| match opt {
            Some(url) => Value::String(url.to_string()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("item".to_owned(), self.item.clone());
        m.insert("prev".to_owned(), option_to_value(&self.prev));
        m.insert("next".to_owned(), option_to_value(&self.next));
        Value::Object(m)
    }
}

/// Creates all of the post [`Page`]s for a set of [`Post`]s. The posts
/// arrive sorted newest first, so each page's `prev` link points at the
/// next-newer post and `next` at the next-older one.
fn post_pages<'a>(posts: &'a [Post], template: &'a Template) -> Vec<Page<'a>> {
    posts
        .iter()
        .enumerate()
        .map(move |(i, post)| Page {
            item: post.to_value(),
            file_path: post.file_path.clone(),
            prev: match i < 1 {
                true => None,
                false => Some(posts[i - 1].url.clone()),
            },
            next: match i >= posts.len() - 1 {
                true => None,
                false => Some(posts[i + 1].url.clone()),
            },
            template,
        })
        .collect()
}

/// `Index` represents a collection of [`Post`]s associated with a tag, or
/// the main index containing all posts.
struct Index<'a> {
    /// The tag group the index belongs to; [`None`] for the main index.
    tag: Option<&'a TagGroup>,

    /// The base URL for the index's pages, with a trailing slash.
    url: url::Url,

    /// The output directory for the index's pages.
    output_directory: PathBuf,

    /// The posts associated with the index, newest first.
    posts: Vec<&'a Post>,
}

impl<'a> Index<'a> {
    /// Converts the index to a list of index pages. `index_page_size` and
    /// `index_template` represent the number of posts per page and the
    /// template to apply to the pages respectively. An index with no posts
    /// still produces its first page, so every index URL resolves.
    fn to_pages<'t>(
        &self,
        index_page_size: usize,
        index_template: &'t Template,
    ) -> Result<Vec<Page<'t>>> {
        let total_pages = match self.posts.len() % index_page_size {
            0 => (self.posts.len() / index_page_size).max(1),
            _ => self.posts.len() / index_page_size + 1,
        };

        let mut chunks: Vec<&[&Post]> = self.posts.chunks(index_page_size).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let file_name = match i > 0 {
                    false => String::from("index.html"),
                    true => format!("{}.html", i),
                };

                Ok(Page {
                    item: self.page_item(chunk),
                    file_path: self.output_directory.join(&file_name),
                    prev: match i {
                        0 => None,
                        1 => Some(self.url.join("index.html")?),
                        _ => Some(self.url.join(&format!("{}.html", i - 1))?),
                    },
                    next: match i < total_pages - 1 {
                        false => None,
                        true => Some(self.url.join(&format!("{}.html", i + 1))?),
                    },
                    template: index_template,
                })
            })
            .collect()
    }

    /// Builds one index page's item: the page's post summaries plus the
    /// tag (and its total post count) when the index belongs to one.
    fn page_item(&self, chunk: &[&Post]) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert(
            "posts".to_owned(),
            Value::Array(chunk.iter().map(|p| p.summarize()).collect()),
        );
        match self.tag {
            Some(group) => {
                m.insert("tag".to_owned(), (&group.tag.name).into());
                m.insert("count".to_owned(), Value::from(group.count as u64));
            }
            None => {
                m.insert("tag".to_owned(), Value::Nil);
            }
        }
        Value::Object(m)
    }
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error joining page URLs.
    UrlParse(url::ParseError),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`].
    /// This allows us to use the `?` operator for fallible template
    /// operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. This allows us to
    /// use the `?` operator when joining page URLs.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tag::{slugify, Tag};
    use chrono::NaiveDate;
    use url::Url;

    fn post(slug: &str, date: &str, tags: &[&str]) -> Post {
        let base = Url::parse("https://example.org/").unwrap();
        Post {
            slug: slug.to_owned(),
            title: slug.to_owned(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: None,
            file_path: PathBuf::from(format!("out/posts/{}.html", slug)),
            url: base.join(&format!("posts/{}.html", slug)).unwrap(),
            tags: tags
                .iter()
                .map(|t| Tag {
                    name: (*t).to_owned(),
                    url: base.join(&format!("tags/{}/", slugify(t))).unwrap(),
                })
                .collect(),
            body: format!("<p>{}</p>", slug),
        }
    }

    fn index<'a>(posts: &'a [Post]) -> Index<'a> {
        Index {
            tag: None,
            url: Url::parse("https://example.org/pages/").unwrap(),
            output_directory: PathBuf::from("out/pages"),
            posts: posts.iter().collect(),
        }
    }

    #[test]
    fn test_pagination_file_names_and_links() -> Result<()> {
        let posts: Vec<Post> = (0..25)
            .map(|i| post(&format!("p{:02}", i), "2021-01-01", &[]))
            .collect();

        let template = Template::default();
        let pages = index(&posts).to_pages(10, &template)?;
        assert_eq!(pages.len(), 3);

        let names: Vec<&Path> = pages
            .iter()
            .map(|p| p.file_path.strip_prefix("out/pages").unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                Path::new("index.html"),
                Path::new("1.html"),
                Path::new("2.html")
            ]
        );

        assert_eq!(pages[0].prev, None);
        assert_eq!(
            pages[0].next.as_ref().map(Url::as_str),
            Some("https://example.org/pages/1.html")
        );
        assert_eq!(
            pages[1].prev.as_ref().map(Url::as_str),
            Some("https://example.org/pages/index.html")
        );
        assert_eq!(
            pages[1].next.as_ref().map(Url::as_str),
            Some("https://example.org/pages/2.html")
        );
        assert_eq!(
            pages[2].prev.as_ref().map(Url::as_str),
            Some("https://example.org/pages/1.html")
        );
        assert_eq!(pages[2].next, None);
        Ok(())
    }

    #[test]
    fn test_empty_index_still_produces_a_page() -> Result<()> {
        let posts: Vec<Post> = Vec::new();
        let template = Template::default();
        let pages = index(&posts).to_pages(10, &template)?;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].file_path, PathBuf::from("out/pages/index.html"));
        assert_eq!(pages[0].prev, None);
        assert_eq!(pages[0].next, None);
        Ok(())
    }

    #[test]
    fn test_exact_multiple_has_no_extra_page() -> Result<()> {
        let posts: Vec<Post> = (0..20)
            .map(|i| post(&format!("p{:02}", i), "2021-01-01", &[]))
            .collect();
        let template = Template::default();
        let pages = index(&posts).to_pages(10, &template)?;
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].next, None);
        Ok(())
    }

    #[test]
    fn test_pages_cover_posts_tags_and_overview() -> Result<()> {
        let posts = vec![
            post("a", "2021-01-02", &["go", "rust"]),
            post("b", "2021-01-01", &["go"]),
        ];
        let groups = group_tags(&posts);

        let posts_template = Template::default();
        let index_template = Template::default();
        let tags_template = Template::default();
        let index_base_url = Url::parse("https://example.org/pages/").unwrap();
        let tags_base_url = Url::parse("https://example.org/tags/").unwrap();
        let home_page = Url::parse("https://example.org/").unwrap();
        let static_url = Url::parse("https://example.org/static/").unwrap();
        let atom_url = Url::parse("https://example.org/feed.atom").unwrap();
        let writer = Writer {
            posts_template: &posts_template,
            index_template: &index_template,
            tags_template: &tags_template,
            index_base_url: &index_base_url,
            tags_base_url: &tags_base_url,
            index_output_directory: Path::new("out/pages"),
            tags_output_directory: Path::new("out/tags"),
            index_page_size: 10,
            home_page: &home_page,
            static_url: &static_url,
            atom_url: &atom_url,
        };

        let pages = writer.pages(&posts, &groups)?;

        // 1 main index page, 1 page per tag (go, rust), 2 post pages, and
        // the overview page.
        assert_eq!(pages.len(), 6);

        let paths: Vec<&Path> = pages.iter().map(|p| p.file_path.as_path()).collect();
        assert!(paths.contains(&Path::new("out/pages/index.html")));
        assert!(paths.contains(&Path::new("out/tags/go/index.html")));
        assert!(paths.contains(&Path::new("out/tags/rust/index.html")));
        assert!(paths.contains(&Path::new("out/tags/index.html")));
        assert!(paths.contains(&Path::new("out/posts/a.html")));
        assert!(paths.contains(&Path::new("out/posts/b.html")));
        Ok(())
    }

    #[test]
    fn test_tags_page_item_contains_groups_and_chart() {
        let posts = vec![
            post("a", "2021-01-02", &["go", "rust"]),
            post("b", "2021-01-01", &["go"]),
        ];
        let groups = group_tags(&posts);

        let posts_template = Template::default();
        let index_template = Template::default();
        let tags_template = Template::default();
        let index_base_url = Url::parse("https://example.org/pages/").unwrap();
        let tags_base_url = Url::parse("https://example.org/tags/").unwrap();
        let home_page = Url::parse("https://example.org/").unwrap();
        let static_url = Url::parse("https://example.org/static/").unwrap();
        let atom_url = Url::parse("https://example.org/feed.atom").unwrap();
        let writer = Writer {
            posts_template: &posts_template,
            index_template: &index_template,
            tags_template: &tags_template,
            index_base_url: &index_base_url,
            tags_base_url: &tags_base_url,
            index_output_directory: Path::new("out/pages"),
            tags_output_directory: Path::new("out/tags"),
            index_page_size: 10,
            home_page: &home_page,
            static_url: &static_url,
            atom_url: &atom_url,
        };

        let page = writer.tags_page(&groups);
        match &page.item {
            Value::Object(item) => {
                match item.get("groups") {
                    Some(Value::Array(groups)) => assert_eq!(groups.len(), 2),
                    other => panic!("unexpected groups value: {:?}", other),
                }
                match item.get("chart") {
                    Some(Value::String(svg)) => {
                        assert!(svg.starts_with("<svg"));
                        assert!(svg.contains(r#"data-category="go""#));
                    }
                    other => panic!("unexpected chart value: {:?}", other),
                }
            }
            other => panic!("unexpected item value: {:?}", other),
        }
    }

    #[test]
    fn test_post_pages_prev_next_chain() {
        let posts = vec![
            post("newest", "2021-03-01", &[]),
            post("middle", "2021-02-01", &[]),
            post("oldest", "2021-01-01", &[]),
        ];
        let template = Template::default();
        let pages = post_pages(&posts, &template);

        assert_eq!(pages[0].prev, None);
        assert_eq!(
            pages[0].next.as_ref().map(Url::as_str),
            Some("https://example.org/posts/middle.html")
        );
        assert_eq!(
            pages[2].prev.as_ref().map(Url::as_str),
            Some("https://example.org/posts/middle.html")
        );
        assert_eq!(pages[2].next, None);
    }
}
