use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::page::css_url;
use crate::page::markup::{self, Page};
use crate::slideshow::{ROOT_CLASS, SLIDE_CLASS};

/// Parse a page and print what the viewer would show, without opening a
/// window. Fails when a slide's image is missing or unreadable.
pub fn run(file: &Path) -> Result<()> {
    let page = markup::load(file)?;

    let title = page.meta.title.as_deref().unwrap_or("(untitled)");
    println!("{} {}", "Page:".bold(), title);

    let problems = report_slides(&page);

    if !page.warnings.is_empty() {
        println!("{}", "Warnings:".yellow().bold());
        for warning in &page.warnings {
            println!("  {warning}");
        }
    }

    if problems > 0 {
        anyhow::bail!("{problems} slide(s) without a usable image");
    }
    println!("{}", "Page looks good.".green());
    Ok(())
}

/// Print every slideshow and slide, returning how many slides have no image
/// file to show.
fn report_slides(page: &Page) -> usize {
    let doc = &page.document;
    let roots = doc.query_selector_all(doc.body(), ROOT_CLASS);
    println!("{} {}", "Slideshows:".bold(), roots.len());

    let mut problems = 0;
    for (n, root) in roots.iter().enumerate() {
        let slides = doc.query_selector_all(*root, SLIDE_CLASS);
        println!("  {} {} slides", format!("#{}", n + 1).cyan(), slides.len());
        for slide in slides {
            let caption = doc.attribute(slide, "aria-label").unwrap_or("");
            let Some(path) = doc.background_image(slide).and_then(css_url) else {
                problems += 1;
                let raw = doc.background_image(slide).unwrap_or("none");
                println!("    {} {raw}", "no image".red().bold());
                continue;
            };
            if Path::new(path.as_ref()).is_file() {
                println!("    {} {path} {}", "ok".green(), caption.dimmed());
            } else {
                problems += 1;
                println!("    {} {path}", "missing".red().bold());
            }
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("trailshow-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_apostrophe_image_found() {
        let dir = temp_dir("check-quote");
        std::fs::write(dir.join("O'Brien.jpg"), b"x").unwrap();
        let file = dir.join("page.md");
        std::fs::write(&file, "::: slideshow\n![a](O'Brien.jpg)\n:::\n").unwrap();

        assert!(run(&file).is_ok());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_image_fails() {
        let dir = temp_dir("check-missing");
        let file = dir.join("page.md");
        std::fs::write(&file, "::: slideshow\n![a](gone.jpg)\n:::\n").unwrap();

        let err = run(&file).unwrap_err();
        assert_eq!(err.to_string(), "1 slide(s) without a usable image");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unreadable_background_counts_as_problem() {
        let content = "::: slideshow\n![a](a.jpg)\n![b](b.jpg)\n:::\n";
        let mut page = markup::parse(content, Path::new("/nowhere")).unwrap();
        let doc = &mut page.document;
        let slides = doc.query_selector_all(doc.body(), SLIDE_CLASS);
        doc.set_background_image(slides[0], Some("url('O'Brien.jpg')"));
        doc.set_background_image(slides[1], None);

        assert_eq!(report_slides(&page), 2);
    }
}
