//! Stylesheet bundling: concatenate, prefix, consolidate media queries.

use std::path::PathBuf;

use lightningcss::rules::media::MediaRule;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;

use crate::glob::SourceGlob;
use crate::task::{write_output, TaskError};

/// Post-processing settings shared by every bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOptions {
    /// Browserslist queries that decide which vendor prefixes are added
    pub browsers: Vec<String>,

    /// Minify the printed bundle. Off unless explicitly configured.
    pub minify: bool,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            browsers: vec!["defaults".to_string()],
            minify: false,
        }
    }
}

/// Concatenates matched stylesheets into one named bundle.
#[derive(Debug, Clone)]
pub struct StyleBundler {
    sources: SourceGlob,
    bundle: String,
    dest: PathBuf,
    options: StyleOptions,
}

impl StyleBundler {
    /// Create a bundler writing `dest/<bundle>`.
    pub fn new(
        sources: SourceGlob,
        bundle: impl Into<String>,
        dest: impl Into<PathBuf>,
        options: StyleOptions,
    ) -> Self {
        Self {
            sources,
            bundle: bundle.into(),
            dest: dest.into(),
            options,
        }
    }

    pub fn sources(&self) -> &SourceGlob {
        &self.sources
    }

    /// File name of the bundle under the destination directory.
    pub fn bundle_name(&self) -> &str {
        &self.bundle
    }

    pub fn output_path(&self) -> PathBuf {
        self.dest.join(&self.bundle)
    }

    /// Build the bundle. Returns the number of stylesheets it contains.
    pub async fn run(&self) -> Result<usize, TaskError> {
        let files = self.sources.collect()?;

        let mut concatenated = String::new();
        for file in &files {
            let css = tokio::fs::read_to_string(&file.path)
                .await
                .map_err(|e| TaskError::io(&file.path, e))?;
            concatenated.push_str(&css);
            concatenated.push('\n');
        }

        let css = process_bundle(&self.bundle, &concatenated, &self.options)?;

        let output = self.output_path();
        write_output(&output, css).await?;
        tracing::debug!(
            "Bundled {} stylesheets into {}",
            files.len(),
            output.display()
        );

        Ok(files.len())
    }
}

/// Run the post-processing chain over a concatenated bundle.
///
/// Vendor prefixes are added for the configured browsers, then every
/// `@media` block sharing a query is folded into one. Rules are never
/// merged, dropped or rewritten into shorthands.
pub fn process_bundle(name: &str, css: &str, options: &StyleOptions) -> Result<String, TaskError> {
    let style_error = |message: String| TaskError::Style {
        path: name.to_string(),
        message,
    };
    let parser_options = || ParserOptions {
        filename: name.to_string(),
        ..Default::default()
    };

    let targets = browser_targets(&options.browsers).map_err(style_error)?;

    let mut prefixed = String::new();
    let source = StyleSheet::parse(css, parser_options())
        .map_err(|e| style_error(format!("CSS parse error: {}", e)))?;

    write_prefixed_rules(&source.rules, targets, &mut prefixed).map_err(style_error)?;

    let mut stylesheet = StyleSheet::parse(&prefixed, parser_options())
        .map_err(|e| style_error(format!("CSS parse error: {}", e)))?;

    combine_media_queries(&mut stylesheet.rules).map_err(style_error)?;

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: options.minify,
            ..Default::default()
        })
        .map_err(|e| style_error(format!("CSS print error: {}", e)))?;

    Ok(printed.code)
}

/// Re-serialize `rules` with each declaration expanded to its prefixed forms.
fn write_prefixed_rules(
    rules: &CssRuleList<'_>,
    targets: Targets,
    out: &mut String,
) -> Result<(), String> {
    let print = |e: lightningcss::error::PrinterError| format!("CSS print error: {}", e);

    for rule in &rules.0 {
        match rule {
            CssRule::Style(style) if style.rules.0.is_empty() => {
                out.push_str(&style.selectors.to_css_string(PrinterOptions::default()).map_err(print)?);
                out.push('{');
                for (property, important) in style.declarations.iter() {
                    let declaration = property
                        .to_css_string(important, PrinterOptions::default())
                        .map_err(print)?;
                    out.push_str(&prefix_declaration(&declaration, targets)?);
                    out.push(';');
                }
                out.push_str("}\n");
            }
            CssRule::Media(media) => {
                out.push_str("@media ");
                out.push_str(&media.query.to_css_string(PrinterOptions::default()).map_err(print)?);
                out.push('{');
                write_prefixed_rules(&media.rules, targets, out)?;
                out.push_str("}\n");
            }
            CssRule::Supports(supports) => {
                out.push_str("@supports ");
                out.push_str(
                    &supports
                        .condition
                        .to_css_string(PrinterOptions::default())
                        .map_err(print)?,
                );
                out.push('{');
                write_prefixed_rules(&supports.rules, targets, out)?;
                out.push_str("}\n");
            }
            other => {
                out.push_str(&other.to_css_string(PrinterOptions::default()).map_err(print)?);
                out.push('\n');
            }
        }
    }

    Ok(())
}

/// Expand one declaration for `targets`.
///
/// The declaration is transformed alone, so nothing can be folded into a
/// shorthand with its neighbours.
fn prefix_declaration(declaration: &str, targets: Targets) -> Result<String, String> {
    let source = format!("a{{{}}}", declaration);
    let mut sheet = StyleSheet::parse(&source, ParserOptions::default())
        .map_err(|e| format!("CSS parse error: {}", e))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..Default::default()
        })
        .map_err(|e| format!("CSS transform error: {}", e))?;

    let Some(CssRule::Style(rule)) = sheet.rules.0.first() else {
        return Ok(declaration.to_string());
    };

    let mut expanded = Vec::new();
    for (property, important) in rule.declarations.iter() {
        expanded.push(
            property
                .to_css_string(important, PrinterOptions::default())
                .map_err(|e| format!("CSS print error: {}", e))?,
        );
    }

    Ok(expanded.join(";"))
}

fn browser_targets(queries: &[String]) -> Result<Targets, String> {
    if queries.is_empty() {
        return Ok(Targets::default());
    }

    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| format!("Invalid browsers query: {}", e))?;

    Ok(browsers.map(Targets::from).unwrap_or_default())
}

/// Merge `@media` rules with identical queries.
///
/// Plain rules keep their order; merged media blocks follow them in the
/// order their query first appeared.
fn combine_media_queries(rules: &mut CssRuleList<'_>) -> Result<(), String> {
    let mut plain = Vec::new();
    let mut queries: Vec<String> = Vec::new();
    let mut media: Vec<MediaRule<'_>> = Vec::new();

    for rule in std::mem::take(&mut rules.0) {
        match rule {
            CssRule::Media(block) => {
                let query = block
                    .query
                    .to_css_string(PrinterOptions::default())
                    .map_err(|e| format!("CSS print error: {}", e))?;

                match queries.iter().position(|q| *q == query) {
                    Some(index) => media[index].rules.0.extend(block.rules.0),
                    None => {
                        queries.push(query);
                        media.push(block);
                    }
                }
            }
            other => plain.push(other),
        }
    }

    plain.extend(media.into_iter().map(CssRule::Media));
    rules.0 = plain;

    Ok(())
}
