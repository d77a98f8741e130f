//! Project configuration: locates and parses the `vellum.yaml` project file
//! and the theme manifest, and derives the URLs and directories the rest of
//! the build works from.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file which marks a directory as a project root.
pub const PROJECT_FILE: &str = "vellum.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

/// The site's author, used in the Atom feed.
#[derive(Clone, Deserialize)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct Project {
    title: String,

    #[serde(default)]
    author: Option<Author>,

    #[serde(default)]
    description: Option<String>,

    site_root: Url,

    /// The home page's location relative to `site_root`; defaults to the
    /// site root itself.
    #[serde(default)]
    home_page: Option<String>,

    #[serde(default)]
    index_page_size: PageSize,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,
    tags_template: Vec<PathBuf>,
}

/// The fully-derived build configuration.
pub struct Config {
    /// The site's title, used by templates and the feed.
    pub title: String,

    /// The site's author, used by the feed.
    pub author: Option<Author>,

    /// An optional one-line site description.
    pub description: Option<String>,

    /// The URL of the site's home page.
    pub home_page: Url,

    /// The directory containing post source files.
    pub posts_source_directory: PathBuf,

    /// The directory containing static assets to copy verbatim.
    pub static_source_directory: PathBuf,

    /// Base URL for the main index pages (`{index_url}/index.html`, ...).
    pub index_url: Url,

    /// Base URL for tag pages (`{tags_url}/{slug}/`); the all-tags
    /// overview lives at `{tags_url}/` itself.
    pub tags_url: Url,

    /// Base URL for post pages (`{posts_url}/{slug}.html`).
    pub posts_url: Url,

    /// Base URL for static assets.
    pub static_url: Url,

    /// The URL of the Atom feed.
    pub atom_url: Url,

    /// Template file lists, applied in order.
    pub index_template: Vec<PathBuf>,
    pub posts_template: Vec<PathBuf>,
    pub tags_template: Vec<PathBuf>,

    /// The root of the output tree and its per-kind subdirectories.
    pub root_output_directory: PathBuf,
    pub index_output_directory: PathBuf,
    pub tags_output_directory: PathBuf,
    pub posts_output_directory: PathBuf,
    pub static_output_directory: PathBuf,

    /// The number of posts per index page.
    pub index_page_size: usize,

    /// The number of worker threads for post parsing.
    pub threads: usize,
}

impl Config {
    /// Walks up from `dir` looking for a directory containing
    /// [`PROJECT_FILE`], and loads the configuration from the first one
    /// found.
    pub fn from_directory(
        dir: &Path,
        output_directory: &Path,
        threads: Option<usize>,
    ) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            match Config::from_project_file(&path, output_directory, threads) {
                Ok(config) => Ok(config),
                Err(e) => Err(anyhow!("Loading configuration: {:?}", e)),
            }
        } else {
            match dir.parent() {
                Some(parent) => {
                    Config::from_directory(parent, output_directory, threads)
                }
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    /// Loads the configuration from a specific project file. The project
    /// root is the file's directory: posts live in `{root}/posts`, static
    /// assets in `{root}/static`, and the theme manifest at
    /// `{root}/theme/theme.yaml`.
    pub fn from_project_file(
        path: &Path,
        output_directory: &Path,
        threads: Option<usize>,
    ) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;

        let theme_dir = project_root.join("theme");
        let theme_file = open(&theme_dir.join("theme.yaml"), "theme")?;
        let theme: Theme = serde_yaml::from_reader(theme_file)?;

        let site_root = ensure_trailing_slash(&project.site_root)?;
        Ok(Config {
            home_page: match &project.home_page {
                Some(relative) => site_root.join(relative)?,
                None => site_root.clone(),
            },
            title: project.title,
            author: project.author,
            description: project.description,
            posts_source_directory: project_root.join("posts"),
            static_source_directory: project_root.join("static"),
            index_url: site_root.join("pages/")?,
            tags_url: site_root.join("tags/")?,
            posts_url: site_root.join("posts/")?,
            static_url: site_root.join("static/")?,
            atom_url: site_root.join("feed.atom")?,
            index_template: theme
                .index_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            posts_template: theme
                .posts_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            tags_template: theme
                .tags_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            root_output_directory: output_directory.to_owned(),
            index_output_directory: output_directory.join("pages"),
            tags_output_directory: output_directory.join("tags"),
            posts_output_directory: output_directory.join("posts"),
            static_output_directory: output_directory.join("static"),
            index_page_size: project.index_page_size.0,
            threads: match threads {
                None => num_cpus::get(),
                Some(threads) => threads,
            },
        })
    }
}

// Annotates open errors with the kind of file being opened, since "No such
// file or directory" alone doesn't tell the user which input is missing.
fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

/// URL joins treat a base without a trailing slash as a file and replace
/// its last path component, so the derived base URLs are built from a
/// slash-terminated site root.
fn ensure_trailing_slash(url: &Url) -> Result<Url> {
    if url.path().ends_with('/') {
        Ok(url.clone())
    } else {
        Ok(Url::parse(&format!("{}/", url))?)
    }
}
