//! Parses [`Post`] objects from source files on disk: front-matter is split
//! from the body at the `---` fences and deserialized as YAML, the body is
//! rendered to HTML, and tag and post URLs are derived from the configured
//! base URLs. Parsing optionally fans out over a pool of worker threads;
//! results are re-sorted afterwards so the output order is deterministic
//! either way.

use std::{
    fmt,
    fs::{read_dir, File},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Deserialize;
use url::Url;

use crate::{markdown, post::Post, tag, tag::Tag};

const MARKDOWN_EXTENSION: &str = ".md";

/// The format required of front-matter `date` fields.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// `tags_url` is the base URL for tag listing pages. It's used to
    /// prefix tag page URLs (i.e., the URL for a tag's listing page is
    /// `{tags_url}/{slug}/`).
    tags_url: &'a Url,

    /// `posts_url` is the base URL for post pages. It's used to prefix post
    /// page URLs (i.e., the URL for a post is `{posts_url}/{slug}.html`).
    posts_url: &'a Url,

    /// `posts_directory` is the directory in which post pages will be
    /// rendered.
    posts_directory: &'a Path,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(
        tags_url: &'a Url,
        posts_url: &'a Url,
        posts_directory: &'a Path,
    ) -> Parser<'a> {
        Parser {
            tags_url,
            posts_url,
            posts_directory,
        }
    }

    /// Searches a provided `source_directory` for post files (extension =
    /// `.md`) and post bundles (directories containing an `index.md`) and
    /// returns the posts sorted by date (most recent first) along with the
    /// bundle assets to copy into the output tree. `threads` selects the
    /// size of the parsing worker pool; below 2, parsing stays on the
    /// calling thread. Each post file must be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with fields `title` and `date`, and optionally
    ///    `description` and `tags`
    /// 3. Terminal frontmatter fence (`---`)
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2021-04-16
    /// tags: [greet]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse_posts(
        &self,
        source_directory: &Path,
        threads: usize,
    ) -> Result<Posts> {
        let mut entries = Vec::new();
        for result in read_dir(source_directory)? {
            let entry = result?;
            let os_file_name = entry.file_name();
            let file_name = os_file_name.to_string_lossy();
            if Self::is_bundle(&entry)? {
                entries.push(PathBuf::from(&*os_file_name).join("index.md"));
            } else if file_name.ends_with(MARKDOWN_EXTENSION) {
                entries.push(PathBuf::from(&*os_file_name));
            }
        }

        let (mut posts, static_files) = if threads < 2 {
            self.parse_serial(source_directory, entries)?
        } else {
            self.parse_parallel(source_directory, entries, threads)?
        };

        // Parallel arrival order is nondeterministic; the secondary slug
        // key makes the order total.
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        Ok((posts, static_files))
    }

    fn is_bundle(entry: &std::fs::DirEntry) -> std::io::Result<bool> {
        Ok(entry.file_type()?.is_dir()
            && entry.path().join("index.md").is_file())
    }

    fn parse_serial(
        &self,
        source_directory: &Path,
        entries: Vec<PathBuf>,
    ) -> Result<(Vec<Post>, Vec<StaticFile>)> {
        let mut posts = Vec::with_capacity(entries.len());
        let mut static_files = Vec::new();
        for relative_path in entries {
            posts.push(self.parse_entry(
                source_directory,
                &relative_path,
                &mut static_files,
            )?);
        }
        Ok((posts, static_files))
    }

    fn parse_parallel(
        &self,
        source_directory: &Path,
        entries: Vec<PathBuf>,
        threads: usize,
    ) -> Result<(Vec<Post>, Vec<StaticFile>)> {
        use crossbeam_channel::unbounded;

        let (tx, rx) = unbounded::<PathBuf>();
        let results: Vec<Result<(Vec<Post>, Vec<StaticFile>)>> =
            std::thread::scope(|scope| {
                let workers: Vec<_> = (0..threads)
                    .map(|_| {
                        let rx = rx.clone();
                        scope.spawn(move || -> Result<(Vec<Post>, Vec<StaticFile>)> {
                            let mut posts = Vec::new();
                            let mut static_files = Vec::new();
                            for relative_path in rx {
                                posts.push(self.parse_entry(
                                    source_directory,
                                    &relative_path,
                                    &mut static_files,
                                )?);
                            }
                            Ok((posts, static_files))
                        })
                    })
                    .collect();

                for entry in entries {
                    // Sending only fails once every worker is gone; their
                    // join results carry the underlying errors.
                    if tx.send(entry).is_err() {
                        break;
                    }
                }
                drop(tx);

                workers
                    .into_iter()
                    // Workers return their errors; a join failure is a panic.
                    .map(|worker| worker.join().unwrap())
                    .collect()
            });

        let mut posts = Vec::new();
        let mut static_files = Vec::new();
        for result in results {
            let (worker_posts, worker_static_files) = result?;
            posts.extend(worker_posts);
            static_files.extend(worker_static_files);
        }
        Ok((posts, static_files))
    }

    /// Parses one post entry. For bundles (`{name}/index.md`), sibling
    /// files are recorded in `static_files` as (source, output) pairs; the
    /// bundle is only recorded once the post itself parses.
    fn parse_entry(
        &self,
        source_directory: &Path,
        relative_path: &Path,
        static_files: &mut Vec<StaticFile>,
    ) -> Result<Post> {
        let post = self.parse_post(source_directory, relative_path)?;

        if relative_path.ends_with("index.md") {
            use walkdir::WalkDir;
            let bundle = relative_path.parent().unwrap(); // entries always have a parent component
            let abs = source_directory.join(bundle);
            for result in WalkDir::new(&abs) {
                let entry = result?;
                if entry.file_type().is_file() && entry.file_name() != "index.md" {
                    static_files.push((
                        entry.path().to_owned(),
                        self.posts_directory
                            .join(&post.slug)
                            // strip_prefix can't fail; `abs` is always an
                            // ancestor of the entry path.
                            .join(entry.path().strip_prefix(&abs).unwrap()),
                    ));
                }
            }
        }

        Ok(post)
    }

    fn parse_post(
        &self,
        source_directory: &Path,
        relative_path: &Path,
    ) -> Result<Post> {
        match self._parse_post(source_directory, relative_path) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{:?}`", relative_path),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(
        &self,
        source_directory: &Path,
        relative_path: &Path,
    ) -> Result<Post> {
        fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
            const FENCE: &str = "---";
            if !input.starts_with(FENCE) {
                return Err(Error::FrontmatterMissingStartFence);
            }
            match input[FENCE.len()..].find("---") {
                None => Err(Error::FrontmatterMissingEndFence),
                Some(offset) => Ok((
                    FENCE.len(),                        // yaml_start
                    FENCE.len() + offset,               // yaml_stop
                    FENCE.len() + offset + FENCE.len(), // body_start
                )),
            }
        }

        use std::io::Read;
        let mut contents = String::new();
        File::open(source_directory.join(relative_path))?
            .read_to_string(&mut contents)?;
        let input: &str = &contents;

        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let frontmatter: Frontmatter =
            serde_yaml::from_str(&input[yaml_start..yaml_stop])?;
        let date = NaiveDate::parse_from_str(&frontmatter.date, DATE_FORMAT)?;

        let stem = if relative_path.ends_with("index.md") {
            relative_path.parent().unwrap()
        } else {
            relative_path
        }
        .with_extension("");

        let slug = stem
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| InvalidFileNameError(relative_path.to_owned()))?
            .to_owned();

        let source_path = relative_path
            .to_str()
            .ok_or_else(|| InvalidFileNameError(relative_path.to_owned()))?;

        let mut post = Post {
            title: frontmatter.title,
            date,
            description: frontmatter.description,
            file_path: self.posts_directory.join(format!("{}.html", slug)),
            url: self.posts_url.join(&format!("{}.html", slug))?,
            tags: frontmatter
                .tags
                .iter()
                .map(|name| {
                    Ok(Tag {
                        name: name.clone(),
                        url: self
                            .tags_url
                            // NOTE: a trailing slash is significant to
                            // [`Url::join`]: without one the last path
                            // component is treated as a "file" name and
                            // dropped, so the slug is joined with its
                            // trailing slash in one step.
                            .join(&format!("{}/", tag::slugify(name)))?,
                    })
                })
                .collect::<Result<Vec<Tag>>>()?,
            slug,
            body: String::default(),
        };

        markdown::to_html(
            &mut post.body,
            self.posts_url,
            source_path,
            &input[body_start..],
        )?;
        Ok(post)
    }
}

#[derive(Deserialize, Clone)]
struct Frontmatter {
    /// The title of the post.
    title: String,

    /// The publication date of the post, `YYYY-MM-DD`.
    date: String,

    /// An optional one-line description of the post.
    #[serde(default)]
    description: Option<String>,

    /// The tags associated with the post, in authored order.
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug)]
pub struct InvalidFileNameError(PathBuf);

impl fmt::Display for InvalidFileNameError {
    /// Displays an [`InvalidFileNameError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid file name: {:?}", &self.0)
    }
}

impl std::error::Error for InvalidFileNameError {
    /// Implements the [`std::error::Error`] trait for
    /// [`InvalidFileNameError`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// The parsed posts along with the bundle assets to copy into the output
/// tree as (source, output) pairs.
pub type Posts = (Vec<Post>, Vec<StaticFile>);

pub type StaticFile = (PathBuf, PathBuf);

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one
    /// was missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a frontmatter date isn't of the form `YYYY-MM-DD`.
    DateParse(chrono::ParseError),

    /// Returned when there is a problem parsing URLs.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned when a source file isn't valid UTF-8.
    InvalidFileName(InvalidFileNameError),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::DateParse(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::InvalidFileName(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::DateParse(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::InvalidFileName(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<InvalidFileNameError> for Error {
    fn from(err: InvalidFileNameError) -> Error {
        Error::InvalidFileName(err)
    }
}

impl From<markdown::Error> for Error {
    fn from(err: markdown::Error) -> Error {
        match err {
            markdown::Error::Io(e) => Error::Io(e),
            markdown::Error::UrlParse(e) => Error::UrlParse(e),
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

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<chrono::ParseError> for Error {
    /// Converts a [`chrono::ParseError`] into an [`Error`]. It allows us to
    /// use the `?` operator when parsing frontmatter dates.
    fn from(err: chrono::ParseError) -> Error {
        Error::DateParse(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
