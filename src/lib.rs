//! The library code for the `vellum` static site generator. The
//! architecture can be generally broken down into two distinct steps:
//!
//! 1. Parsing posts from source files on disk ([`crate::parser`])
//! 2. Converting the posts into output files on disk ([`crate::write`])
//!
//! Of the two, the second step is the more involved. It is itself composed
//! of three distinct sub-steps:
//!
//! 1. Building post pages
//! 2. Building index pages
//! 3. Rendering all pages to disk
//!
//! Again here the second sub-step is the more involved: besides the main
//! index over all posts, each tag gets its own group of index pages
//! (addressed by the tag's slug), and every group is paginated--converted
//! into pages based on a configurable number of posts per index page. The
//! tag aggregation behind those pages lives in [`crate::tag`], and the
//! all-tags overview page additionally renders the aggregate as an isotype
//! chart ([`crate::isotype`]).
//!
//! The third substep is pretty straight-forward: for each page, apply the
//! appropriate template (post, index, or tags overview) and write the
//! result to disk. The build finishes with the Atom feed ([`crate::feed`])
//! and the sitemap ([`crate::sitemap`]).

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod isotype;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod sitemap;
pub mod tag;
pub mod url;
pub mod write;
