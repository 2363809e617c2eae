//! In-place HTML minification.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::OnceLock;

use minify_html::Cfg;
use regex::bytes::{Captures, Regex};

use crate::glob::{SourceFile, SourceGlob};
use crate::task::{write_output, TaskError};

/// Elements that never have content and are written as `<br/>`.
const VOID_ELEMENTS: &str =
    "area|base|br|col|embed|hr|img|input|link|meta|param|source|track|wbr";

/// Minifies matched HTML files into the destination tree.
#[derive(Debug, Clone)]
pub struct MarkupMinifier {
    sources: SourceGlob,
    dest: PathBuf,
}

impl MarkupMinifier {
    /// Create a minifier reading `sources` and writing under `dest`.
    pub fn new(sources: SourceGlob, dest: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            dest: dest.into(),
        }
    }

    pub fn sources(&self) -> &SourceGlob {
        &self.sources
    }

    /// Minify every matched file, overwriting its output path.
    ///
    /// A file that cannot be read or written is logged and skipped; the
    /// task then fails listing every such file.
    pub async fn run(&self) -> Result<usize, TaskError> {
        let files = self.sources.collect()?;

        let mut written = 0;
        let mut failures = Vec::new();

        for file in &files {
            match self.minify_file(file).await {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::error!("{}", e);
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            Ok(written)
        } else {
            Err(TaskError::Files(failures))
        }
    }

    async fn minify_file(&self, file: &SourceFile) -> Result<(), TaskError> {
        let input = tokio::fs::read(&file.path)
            .await
            .map_err(|e| TaskError::io(&file.path, e))?;

        let output = self.dest.join(&file.relative);
        write_output(&output, minify_markup(&input)).await?;

        tracing::debug!("Minified {} -> {}", file.path.display(), output.display());
        Ok(())
    }
}

/// Minify a whole HTML document.
///
/// The doctype is normalised and class tokens are sorted first, then the
/// document goes through minify-html and void elements get their closing
/// slash back. Running the output through again yields the same bytes.
pub fn minify_markup(input: &[u8]) -> Vec<u8> {
    let normalized = normalize_doctype(input);
    let sorted = sort_class_tokens(&normalized);
    let minified = minify_html::minify(&sorted, &minify_config());
    close_void_elements(&minified).into_owned()
}

fn minify_config() -> Cfg {
    let mut cfg = Cfg::new();
    cfg.do_not_minify_doctype = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg
}

fn doctype() -> &'static Regex {
    static DOCTYPE: OnceLock<Regex> = OnceLock::new();
    DOCTYPE.get_or_init(|| {
        Regex::new(r"(?i-u)^(\s*)<!doctype\b[^>]*>").expect("doctype pattern is valid")
    })
}

fn class_attribute() -> &'static Regex {
    static CLASS_ATTR: OnceLock<Regex> = OnceLock::new();
    CLASS_ATTR.get_or_init(|| {
        Regex::new(r#"(?i)(\sclass\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
            .expect("class attribute pattern is valid")
    })
}

/// Raw-text elements are matched whole so their bodies are skipped.
fn void_element() -> &'static Regex {
    static VOID: OnceLock<Regex> = OnceLock::new();
    VOID.get_or_init(|| {
        let pattern = format!(
            r#"(?is-u)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<textarea\b.*?</textarea\s*>|<({})\b((?:\s*[^\s"'<>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*/?>"#,
            VOID_ELEMENTS
        );
        Regex::new(&pattern).expect("void element pattern is valid")
    })
}

/// Any doctype becomes the HTML5 one.
fn normalize_doctype(input: &[u8]) -> Cow<'_, [u8]> {
    doctype().replace(input, &b"${1}<!DOCTYPE html>"[..])
}

/// Sort the whitespace-separated tokens of every quoted `class` attribute.
fn sort_class_tokens(input: &[u8]) -> Cow<'_, [u8]> {
    class_attribute().replace_all(input, |caps: &Captures| {
        let (quote, value) = match (caps.get(2), caps.get(3)) {
            (Some(value), _) => (b'"', value.as_bytes()),
            (None, Some(value)) => (b'\'', value.as_bytes()),
            (None, None) => (b'"', &b""[..]),
        };

        let mut tokens: Vec<&[u8]> = value
            .split(|b| b.is_ascii_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        tokens.sort_unstable();

        let mut out = caps[1].to_vec();
        out.push(quote);
        out.extend_from_slice(&tokens.join(&b' '));
        out.push(quote);
        out
    })
}

/// Write void elements in self-closing form.
///
/// An unquoted final attribute value needs a space before the slash or
/// the slash would become part of the value.
fn close_void_elements(input: &[u8]) -> Cow<'_, [u8]> {
    void_element().replace_all(input, |caps: &Captures| {
        let (Some(name), Some(attrs)) = (caps.get(1), caps.get(2)) else {
            return caps[0].to_vec();
        };

        let attrs = attrs.as_bytes();
        let end = attrs
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        let attrs = &attrs[..end];
        let mut out = b"<".to_vec();
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(attrs);
        match attrs.last() {
            None | Some(b'"') | Some(b'\'') => out.extend_from_slice(b"/>"),
            Some(_) => out.extend_from_slice(b" />"),
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <!-- build marker -->
    <title>Home</title>
    <style>
      body   { color : red ; }
    </style>
  </head>
  <body>
    <p class="lead  card alert">Hello     world</p>
  </body>
</html>
"#;

    #[test]
    fn sorts_class_tokens() {
        let sorted = sort_class_tokens(br#"<a class="z  b a" href="/"><i class='y x'></i></a>"#);

        assert_eq!(
            String::from_utf8_lossy(&sorted),
            r#"<a class="a b z" href="/"><i class='x y'></i></a>"#
        );
    }

    #[test]
    fn leaves_other_class_like_attributes_alone() {
        let input = br#"<div data-class="z a"></div>"#;

        assert_eq!(sort_class_tokens(input).as_ref(), &input[..]);
    }

    #[test]
    fn minifies_document() {
        let out = String::from_utf8(minify_markup(PAGE.as_bytes())).unwrap();

        assert!(out.starts_with("<!doctype html><html>"));
        assert!(!out.contains("build marker"));
        assert!(out.contains("alert card lead"));
        assert!(out.contains("Hello world"));
        assert!(out.contains("color:red"));
        assert!(!out.contains('\n'));
    }

    #[test]
    fn normalizes_legacy_doctypes() {
        let input = br#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd"><html><body></body></html>"#;

        let out = String::from_utf8(minify_markup(input)).unwrap();

        assert!(out.starts_with("<!doctype html><html>"));
        assert!(!out.contains("DTD"));
    }

    #[test]
    fn keeps_self_closing_slashes() {
        let input = br#"<p>a<br/>b</p><img src="x.png" alt=""/><input type="text" name="q"/><hr>"#;

        let out = String::from_utf8(minify_markup(input)).unwrap();

        assert!(out.contains("<br/>"));
        assert!(out.contains("<img alt src=x.png />"));
        assert!(out.contains("<input name=q />"));
        assert!(out.contains("<hr/>"));
    }

    #[test]
    fn slash_stays_out_of_raw_text() {
        let input = b"<script>let s = '<br>';</script><textarea><br></textarea>";

        let out = String::from_utf8(minify_markup(input)).unwrap();

        assert!(out.contains("'<br>'"));
        assert!(!out.contains("br/"));
    }

    #[test]
    fn drops_redundant_and_type_attributes() {
        let input = br#"<form method="get"><style type="text/css">p { color: red; }</style><script type="text/javascript">go()</script><input type="text" name="q"></form>"#;

        let out = String::from_utf8(minify_markup(input)).unwrap();

        assert!(!out.contains("type="));
        assert!(!out.contains("method"));
        assert!(out.contains("<style>"));
        assert!(out.contains("<script>"));
    }

    #[test]
    fn minification_is_idempotent() {
        let once = minify_markup(PAGE.as_bytes());
        let twice = minify_markup(&once);

        assert_eq!(
            String::from_utf8_lossy(&once),
            String::from_utf8_lossy(&twice)
        );
    }

    #[test]
    fn self_closing_output_is_idempotent() {
        let input = br#"<!DOCTYPE html><html><head><meta charset="utf-8"><link rel=stylesheet href=/index.css></head><body><img src=a.png></body></html>"#;

        let once = minify_markup(input);
        let twice = minify_markup(&once);

        assert_eq!(
            String::from_utf8_lossy(&once),
            String::from_utf8_lossy(&twice)
        );
        assert!(String::from_utf8_lossy(&once).contains("href=/index.css />"));
    }

    #[tokio::test]
    async fn unwritable_file_fails_but_batch_continues() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dist = temp.path().join("dist");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.html"), "<p>  a  </p>").unwrap();
        fs::write(src.join("b.html"), "<p>  b  </p>").unwrap();

        // A directory where a.html should go makes that write fail.
        fs::create_dir_all(dist.join("a.html")).unwrap();

        let minifier = MarkupMinifier::new(SourceGlob::new(&src, "**/*.html").unwrap(), &dist);
        let err = minifier.run().await.unwrap_err();

        match err {
            TaskError::Files(failures) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].to_string().contains("a.html"));
            }
            other => panic!("expected batch failure, got {other}"),
        }
        assert_eq!(
            fs::read(dist.join("b.html")).unwrap(),
            minify_markup(b"<p>  b  </p>")
        );
    }

    #[tokio::test]
    async fn writes_minified_files() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dist = temp.path().join("dist");
        fs::create_dir_all(src.join("pages")).unwrap();
        fs::write(src.join("about.html"), PAGE).unwrap();
        fs::write(src.join("pages/contact.html"), "<p>  hi  </p>").unwrap();

        let minifier = MarkupMinifier::new(SourceGlob::new(&src, "**/*.html").unwrap(), &dist);
        let count = minifier.run().await.unwrap();

        assert_eq!(count, 2);
        let about = fs::read(dist.join("about.html")).unwrap();
        assert_eq!(about, minify_markup(PAGE.as_bytes()));
        assert!(dist.join("pages/contact.html").exists());
    }
}
