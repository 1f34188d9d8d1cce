//! Page files: optional YAML frontmatter, then a markdown-like body where
//! `::: slideshow` ... `:::` blocks hold one `![caption](path)` per slide.
//! Paths with spaces go in angle brackets: `![caption](<my photo.jpg>)`.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use log::warn;
use regex::Regex;
use serde::Deserialize;

use super::{Document, ElementId};
use crate::slideshow::{ACTIVE_SLIDE_CLASS, HOLDER_CLASS, ROOT_CLASS, SLIDE_CLASS};

static IMAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^!\[([^\]]*)\]\(\s*(?:<([^<>]+)>|([^<)\s][^)\s]*))\s*\)$").unwrap()
});
static BLOCK_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^:::\s*(\w[\w-]*)$").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    /// Rotation interval in milliseconds.
    #[serde(default)]
    pub interval: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub meta: PageMeta,
    pub document: Document,
    /// Lines that were skipped, with their 1-based line number.
    pub warnings: Vec<String>,
}

impl Page {
    pub fn slideshow_count(&self) -> usize {
        self.document
            .query_selector_all(self.document.body(), ROOT_CLASS)
            .len()
    }

    /// Every image path referenced by a slide, in document order.
    pub fn image_paths(&self) -> Vec<String> {
        self.document
            .query_selector_all(self.document.body(), SLIDE_CLASS)
            .into_iter()
            .filter_map(|id| self.document.background_image(id))
            .filter_map(super::css_url)
            .map(|path| path.into_owned())
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("frontmatter starts with --- but is never closed")]
    UnterminatedFrontmatter,
    #[error("invalid frontmatter: {0}")]
    Frontmatter(#[source] serde_yaml::Error),
}

/// Split leading `---` frontmatter from the body. Returns the YAML text (if
/// any) and the line number the body starts on.
fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str, usize), PageError> {
    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((None, content, 1));
    };
    if first.trim_end() != "---" {
        return Ok((None, content, 1));
    }
    let mut offset = first.len();
    let yaml_start = offset;
    for (n, line) in lines.enumerate() {
        if line.trim_end() == "---" {
            let yaml = &content[yaml_start..offset];
            let body = &content[offset + line.len()..];
            return Ok((Some(yaml), body, n + 3));
        }
        offset += line.len();
    }
    Err(PageError::UnterminatedFrontmatter)
}

/// Resolve a slide image against the page's directory.
fn resolve(path: &str, base: &Path) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        path.to_string()
    } else {
        base.join(p).to_string_lossy().into_owned()
    }
}

struct Builder {
    doc: Document,
    paragraph: Vec<String>,
    block: Option<Block>,
    warnings: Vec<String>,
}

struct Block {
    root: ElementId,
    slides: usize,
}

impl Builder {
    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join(" ");
        self.paragraph.clear();
        let body = self.doc.body();
        let p = self.doc.create_element("p");
        self.doc.set_text(p, &text);
        self.doc.append_child(body, p);
    }

    fn open_block(&mut self) {
        let body = self.doc.body();
        let root = self.doc.create_element("div");
        self.doc.add_class(root, ROOT_CLASS);
        self.doc.append_child(body, root);
        self.block = Some(Block { root, slides: 0 });
    }

    fn close_block(&mut self) {
        if let Some(block) = self.block.take() {
            let holder = self.doc.create_element("div");
            self.doc.add_class(holder, HOLDER_CLASS);
            self.doc.append_child(block.root, holder);
        }
    }

    fn warn(&mut self, line_no: usize, message: String) {
        warn!("line {line_no}: {message}");
        self.warnings.push(format!("line {line_no}: {message}"));
    }
}

/// Read and parse a page file. Image paths resolve against its directory.
pub fn load(file: &Path) -> anyhow::Result<Page> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let base = file.parent().unwrap_or_else(|| Path::new("."));
    parse(&content, base).with_context(|| format!("Failed to parse {}", file.display()))
}

pub fn parse(content: &str, base_path: &Path) -> Result<Page, PageError> {
    let content = content.replace("\r\n", "\n");
    let (yaml, body, first_line) = split_frontmatter(&content)?;
    let meta = match yaml {
        Some(y) if !y.trim().is_empty() => {
            serde_yaml::from_str(y).map_err(PageError::Frontmatter)?
        }
        _ => PageMeta::default(),
    };

    let mut b = Builder {
        doc: Document::new(),
        paragraph: Vec::new(),
        block: None,
        warnings: Vec::new(),
    };

    for (n, raw) in body.lines().enumerate() {
        let line_no = first_line + n;
        let line = raw.trim();

        if let Some(block) = &mut b.block {
            if line == ":::" {
                b.close_block();
            } else if let Some(caps) = IMAGE_LINE.captures(line) {
                let root = block.root;
                let first = block.slides == 0;
                block.slides += 1;
                let slide = b.doc.create_element("div");
                b.doc.add_class(slide, SLIDE_CLASS);
                if first {
                    b.doc.add_class(slide, ACTIVE_SLIDE_CLASS);
                }
                let Some(target) = caps.get(2).or_else(|| caps.get(3)) else {
                    continue;
                };
                let url = super::css_url_value(&resolve(target.as_str().trim(), base_path));
                b.doc.set_background_image(slide, Some(&url));
                if !caps[1].trim().is_empty() {
                    b.doc.set_attribute(slide, "aria-label", caps[1].trim());
                }
                b.doc.append_child(root, slide);
            } else if BLOCK_OPEN.is_match(line) {
                b.warn(line_no, "nested block ignored".to_string());
            } else if !line.is_empty() {
                b.warn(line_no, format!("not an image, skipped: {line}"));
            }
            continue;
        }

        if line.is_empty() {
            b.flush_paragraph();
        } else if let Some(caps) = BLOCK_OPEN.captures(line) {
            b.flush_paragraph();
            if &caps[1] == ROOT_CLASS {
                b.open_block();
            } else {
                b.warn(line_no, format!("unknown block type '{}'", &caps[1]));
            }
        } else if let Some(caps) = HEADING.captures(line) {
            b.flush_paragraph();
            let body_el = b.doc.body();
            let h = b.doc.create_element(&format!("h{}", caps[1].len()));
            b.doc.set_text(h, caps[2].trim());
            b.doc.append_child(body_el, h);
        } else if line == ":::" {
            b.warn(line_no, "closing ::: without an open block".to_string());
        } else if IMAGE_LINE.is_match(line) {
            b.flush_paragraph();
            b.warn(line_no, "image outside a slideshow block, skipped".to_string());
        } else {
            b.paragraph.push(line.to_string());
        }
    }
    b.flush_paragraph();
    if b.block.is_some() {
        b.close_block();
    }

    Ok(Page {
        meta,
        document: b.doc,
        warnings: b.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
---
title: Summer
theme: dark
interval: 2500
---
# Summer 2024

A week by the sea.
Mostly sunny.

::: slideshow
![Beach at dawn](images/beach.jpg)
![](images/harbour.jpg)
![Abs](/srv/photos/cliff.png)
:::

Thanks for watching.
";

    fn base() -> &'static Path {
        Path::new("/home/me/trip")
    }

    fn tags(doc: &Document) -> Vec<String> {
        doc.element(doc.body())
            .unwrap()
            .children()
            .iter()
            .map(|&id| doc.element(id).unwrap().tag().to_string())
            .collect()
    }

    #[test]
    fn test_frontmatter_fields() {
        let page = parse(SAMPLE, base()).unwrap();
        assert_eq!(page.meta.title.as_deref(), Some("Summer"));
        assert_eq!(page.meta.theme.as_deref(), Some("dark"));
        assert_eq!(page.meta.interval, Some(2500));
        assert!(page.warnings.is_empty());
    }

    #[test]
    fn test_body_structure() {
        let page = parse(SAMPLE, base()).unwrap();
        let doc = &page.document;
        assert_eq!(tags(doc), vec!["h1", "p", "div", "p"]);

        let p = doc.element(doc.body()).unwrap().children()[1];
        assert_eq!(
            doc.element(p).unwrap().text(),
            Some("A week by the sea. Mostly sunny.")
        );
    }

    #[test]
    fn test_slideshow_block() {
        let page = parse(SAMPLE, base()).unwrap();
        let doc = &page.document;
        let root = doc.query_selector(doc.body(), ROOT_CLASS).unwrap();
        let slides = doc.query_selector_all(root, SLIDE_CLASS);
        assert_eq!(slides.len(), 3);

        assert!(doc.has_class(slides[0], ACTIVE_SLIDE_CLASS));
        assert!(!doc.has_class(slides[1], ACTIVE_SLIDE_CLASS));
        assert_eq!(
            doc.background_image(slides[0]),
            Some("url('/home/me/trip/images/beach.jpg')")
        );
        assert_eq!(doc.attribute(slides[0], "aria-label"), Some("Beach at dawn"));
        assert_eq!(doc.attribute(slides[1], "aria-label"), None);
        assert_eq!(
            doc.background_image(slides[2]),
            Some("url('/srv/photos/cliff.png')")
        );

        // The holder comes last inside the root.
        let children = doc.element(root).unwrap().children();
        let holder = *children.last().unwrap();
        assert!(doc.has_class(holder, HOLDER_CLASS));
        assert_eq!(
            page.image_paths(),
            vec![
                "/home/me/trip/images/beach.jpg",
                "/home/me/trip/images/harbour.jpg",
                "/srv/photos/cliff.png"
            ]
        );
    }

    #[test]
    fn test_no_block_means_no_root() {
        let page = parse("# Just text\n\nNothing to rotate.\n", base()).unwrap();
        assert_eq!(page.slideshow_count(), 0);
        assert_eq!(page.meta, PageMeta::default());
    }

    #[test]
    fn test_unclosed_block_closed_at_end() {
        let page = parse("::: slideshow\n![a](a.jpg)\n", base()).unwrap();
        let doc = &page.document;
        let root = doc.query_selector(doc.body(), ROOT_CLASS).unwrap();
        assert!(doc.query_selector(root, HOLDER_CLASS).is_some());
        assert_eq!(doc.query_selector_all(root, SLIDE_CLASS).len(), 1);
    }

    #[test]
    fn test_empty_block_is_still_a_root() {
        let page = parse("::: slideshow\n:::\n", base()).unwrap();
        assert_eq!(page.slideshow_count(), 1);
        assert!(page.image_paths().is_empty());
    }

    #[test]
    fn test_warnings_carry_line_numbers() {
        let content = "---\ntitle: x\n---\n![stray](s.jpg)\n::: slideshow\nnot an image\n::: slideshow\n:::\n:::\n::: gallery\n";
        let page = parse(content, base()).unwrap();
        assert_eq!(
            page.warnings,
            vec![
                "line 4: image outside a slideshow block, skipped",
                "line 6: not an image, skipped: not an image",
                "line 7: nested block ignored",
                "line 9: closing ::: without an open block",
                "line 10: unknown block type 'gallery'",
            ]
        );
        assert_eq!(page.slideshow_count(), 1);
    }

    #[test]
    fn test_unterminated_frontmatter() {
        let err = parse("---\ntitle: x\n# no end", base()).unwrap_err();
        assert!(matches!(err, PageError::UnterminatedFrontmatter));
    }

    #[test]
    fn test_bad_frontmatter_yaml() {
        let err = parse("---\ninterval: soon\n---\n", base()).unwrap_err();
        assert!(matches!(err, PageError::Frontmatter(_)));
        assert!(err.to_string().starts_with("invalid frontmatter"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_apostrophe_in_image_path() {
        let page = parse("::: slideshow\n![a](O'Brien.jpg)\n![b](ok.jpg)\n:::\n", base()).unwrap();
        assert!(page.warnings.is_empty());
        assert_eq!(
            page.image_paths(),
            vec![
                base().join("O'Brien.jpg").to_string_lossy().into_owned(),
                base().join("ok.jpg").to_string_lossy().into_owned(),
            ]
        );
    }

    #[test]
    fn test_bracketed_image_path_with_spaces() {
        let content = "::: slideshow\n![a](<my photo.jpg>)\n![b]( </srv/two words.png> )\n![c](my photo.jpg)\n:::\n";
        let page = parse(content, base()).unwrap();
        assert_eq!(
            page.image_paths(),
            vec![
                base().join("my photo.jpg").to_string_lossy().into_owned(),
                "/srv/two words.png".to_string(),
            ]
        );
        assert_eq!(page.warnings, vec!["line 4: not an image, skipped: ![c](my photo.jpg)"]);
    }

    #[test]
    fn test_windows_line_endings() {
        let page = parse("::: slideshow\r\n![a](a.jpg)\r\n:::\r\n", base()).unwrap();
        assert_eq!(page.image_paths().len(), 1);
        assert!(page.warnings.is_empty());
    }

    #[test]
    fn test_load_resolves_against_file_directory() {
        let dir = std::env::temp_dir().join(format!("trailshow-load-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("page.md");
        std::fs::write(&file, "::: slideshow\n![a](pics/a.jpg)\n:::\n").unwrap();

        let page = load(&file).unwrap();
        assert_eq!(
            page.image_paths(),
            vec![dir.join("pics/a.jpg").to_string_lossy().into_owned()]
        );

        std::fs::write(&file, "---\ntitle: x\n").unwrap();
        let err = load(&file).unwrap_err();
        assert!(format!("{err:#}").contains("never closed"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
