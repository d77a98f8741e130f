//! Support for creating Atom feeds from a list of posts.

use crate::config::Author;
use crate::post::Post;
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use std::fmt;
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub id: String,
    pub author: Option<Author>,
    pub home_page: Url,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// [`Post`]s and writes the result to a [`std::io::Write`]. This function
/// takes ownership of the provided [`FeedConfig`].
pub fn write_feed<W: Write>(config: FeedConfig, posts: &[Post], w: W) -> Result<()> {
    feed(config, posts).write_to(w)?;
    Ok(())
}

fn feed(config: FeedConfig, posts: &[Post]) -> Feed {
    let mut feed = Feed::default();
    feed.entries = feed_entries(&config, posts);
    feed.title = Text::plain(config.title);
    feed.id = config.id;
    feed.updated = FixedOffset::east(0).from_utc_datetime(&Utc::now().naive_utc());
    feed.authors = author_to_people(config.author);
    feed.links = vec![alternate_link(config.home_page.as_str())];
    feed
}

fn feed_entries(config: &FeedConfig, posts: &[Post]) -> Vec<Entry> {
    let mut entries: Vec<Entry> = Vec::with_capacity(posts.len());
    for post in posts {
        // Posts carry only a date; entries are stamped at UTC midnight.
        let date = post_date_time(post);

        let mut entry = Entry::default();
        entry.id = post.url.to_string();
        entry.title = Text::plain(post.title.clone());
        entry.updated = date;
        entry.authors = author_to_people(config.author.clone());
        entry.links = vec![alternate_link(post.url.as_str())];
        entry.summary = Some(Text::plain(post.excerpt()));
        entry.published = Some(date);
        entries.push(entry);
    }
    entries
}

fn post_date_time(post: &Post) -> DateTime<FixedOffset> {
    FixedOffset::east(0)
        .from_utc_datetime(&post.date.and_time(NaiveTime::from_hms(0, 0, 0)))
}

fn alternate_link(href: &str) -> Link {
    let mut link = Link::default();
    link.href = href.to_owned();
    link.rel = "alternate".to_owned();
    link
}

fn author_to_people(author: Option<Author>) -> Vec<Person> {
    match author {
        Some(author) => vec![Person {
            name: author.name,
            email: author.email,
            uri: None,
        }],
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O and
/// Atom-serialization issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tag::Tag;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn post(slug: &str, date: &str) -> Post {
        let base = Url::parse("https://example.org/").unwrap();
        Post {
            slug: slug.to_owned(),
            title: format!("Title of {}", slug),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: None,
            file_path: PathBuf::from(format!("{}.html", slug)),
            url: base.join(&format!("posts/{}.html", slug)).unwrap(),
            tags: Vec::<Tag>::new(),
            body: "<p>above</p><!-- more --><p>below</p>".to_owned(),
        }
    }

    fn config() -> FeedConfig {
        FeedConfig {
            title: "Example Blog".to_owned(),
            id: "https://example.org/".to_owned(),
            author: Some(Author {
                name: "Jane Doe".to_owned(),
                email: None,
            }),
            home_page: Url::parse("https://example.org/").unwrap(),
        }
    }

    #[test]
    fn test_feed_entries() {
        let posts = vec![post("newer", "2021-02-01"), post("older", "2021-01-01")];
        let feed = feed(config(), &posts);

        assert_eq!(feed.title.value, "Example Blog");
        assert_eq!(feed.entries.len(), 2);

        let entry = &feed.entries[0];
        assert_eq!(entry.title.value, "Title of newer");
        assert_eq!(entry.id, "https://example.org/posts/newer.html");
        assert_eq!(
            entry.summary.as_ref().map(|s| s.value.as_str()),
            Some("<p>above</p>")
        );
        assert_eq!(entry.updated.naive_utc().date(), posts[0].date);
    }

    #[test]
    fn test_write_feed_produces_atom_document() {
        let posts = vec![post("only", "2021-01-01")];
        let mut out: Vec<u8> = Vec::new();
        write_feed(config(), &posts, &mut out).unwrap();

        let document = String::from_utf8(out).unwrap();
        assert!(document.contains("<feed"));
        assert!(document.contains("Title of only"));
        assert!(document.contains("https://example.org/posts/only.html"));
    }
}
