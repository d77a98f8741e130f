//! Support for creating a `sitemap.xml` from the site's page inventory:
//! the home page, every post (with its publication date as `lastmod`), the
//! all-tags overview, and every tag listing page.

use crate::post::Post;
use crate::tag::TagGroup;
use std::io::{self, Write};
use url::Url;

const LASTMOD_FORMAT: &str = "%Y-%m-%d";

/// Writes the sitemap for a set of posts and their tag groups to a
/// [`std::io::Write`]. `home_page` and `tags_url` are the URLs of the
/// site's home page and all-tags overview page respectively.
pub fn write_sitemap<W: Write>(
    mut w: W,
    home_page: &Url,
    tags_url: &Url,
    posts: &[Post],
    groups: &[TagGroup],
) -> io::Result<()> {
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        w,
        r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#
    )?;

    write_url(&mut w, home_page.as_str(), None)?;
    for post in posts {
        write_url(
            &mut w,
            post.url.as_str(),
            Some(&post.date.format(LASTMOD_FORMAT).to_string()),
        )?;
    }
    write_url(&mut w, tags_url.as_str(), None)?;
    for group in groups {
        write_url(&mut w, group.tag.url.as_str(), None)?;
    }

    writeln!(w, "</urlset>")?;
    Ok(())
}

fn write_url<W: Write>(w: &mut W, loc: &str, lastmod: Option<&str>) -> io::Result<()> {
    match lastmod {
        Some(lastmod) => writeln!(
            w,
            "  <url><loc>{}</loc><lastmod>{}</lastmod></url>",
            escape_text(loc),
            lastmod
        ),
        None => writeln!(w, "  <url><loc>{}</loc></url>", escape_text(loc)),
    }
}

/// Escapes the characters with meaning in XML text content. URLs from
/// [`Url`] never contain `<` or `>`, but `&` is common in query strings.
fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tag::{group_tags, slugify, Tag};
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn post(slug: &str, date: &str, tags: &[&str]) -> Post {
        let base = Url::parse("https://example.org/").unwrap();
        Post {
            slug: slug.to_owned(),
            title: slug.to_owned(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: None,
            file_path: PathBuf::from(format!("{}.html", slug)),
            url: base.join(&format!("posts/{}.html", slug)).unwrap(),
            tags: tags
                .iter()
                .map(|t| Tag {
                    name: (*t).to_owned(),
                    url: base.join(&format!("tags/{}/", slugify(t))).unwrap(),
                })
                .collect(),
            body: String::new(),
        }
    }

    #[test]
    fn test_sitemap_lists_all_pages() {
        let posts = vec![
            post("a", "2021-01-02", &["go"]),
            post("b", "2021-01-01", &[]),
        ];
        let groups = group_tags(&posts);
        let home_page = Url::parse("https://example.org/").unwrap();
        let tags_url = Url::parse("https://example.org/tags/").unwrap();

        let mut out: Vec<u8> = Vec::new();
        write_sitemap(&mut out, &home_page, &tags_url, &posts, &groups).unwrap();
        let document = String::from_utf8(out).unwrap();

        assert!(document.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(document.contains("<loc>https://example.org/</loc>"));
        assert!(document.contains(
            "<loc>https://example.org/posts/a.html</loc><lastmod>2021-01-02</lastmod>"
        ));
        assert!(document.contains("<loc>https://example.org/tags/</loc>"));
        assert!(document.contains("<loc>https://example.org/tags/go/</loc>"));
        assert!(document.ends_with("</urlset>\n"));
    }
}
