use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use eframe::egui;
use log::{debug, warn};
use rayon::prelude::*;

/// Textures larger than this on either side are downscaled on load.
const MAX_TEXTURE_SIDE: u32 = 2048;

/// Decoded slide images, uploaded once as textures. Failed loads are
/// remembered so a missing file is reported a single time.
pub struct ImageCache {
    textures: RefCell<HashMap<PathBuf, Option<egui::TextureHandle>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            textures: RefCell::new(HashMap::new()),
        }
    }

    /// Decode every not-yet-loaded image in parallel, then upload them.
    pub fn preload(&self, ctx: &egui::Context, paths: &[PathBuf]) {
        let pending: Vec<&PathBuf> = {
            let textures = self.textures.borrow();
            paths.iter().filter(|p| !textures.contains_key(*p)).collect()
        };
        if pending.is_empty() {
            return;
        }
        debug!("Preloading {} images", pending.len());
        let decoded: Vec<(&PathBuf, anyhow::Result<egui::ColorImage>)> = pending
            .into_par_iter()
            .map(|p| (p, decode(p)))
            .collect();

        let mut textures = self.textures.borrow_mut();
        for (path, result) in decoded {
            textures.insert(path.clone(), upload(ctx, path, result));
        }
    }

    pub fn get(&self, ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
        if let Some(entry) = self.textures.borrow().get(path) {
            return entry.clone();
        }
        let texture = upload(ctx, path, decode(path));
        self.textures
            .borrow_mut()
            .insert(path.to_path_buf(), texture.clone());
        texture
    }

    pub fn clear(&self) {
        self.textures.borrow_mut().clear();
    }
}

fn upload(
    ctx: &egui::Context,
    path: &Path,
    result: anyhow::Result<egui::ColorImage>,
) -> Option<egui::TextureHandle> {
    match result {
        Ok(image) => Some(ctx.load_texture(
            path.to_string_lossy(),
            image,
            egui::TextureOptions::LINEAR,
        )),
        Err(e) => {
            warn!("{e:#}");
            None
        }
    }
}

fn decode(path: &Path) -> anyhow::Result<egui::ColorImage> {
    let mut image =
        image::open(path).with_context(|| format!("Could not load image {}", path.display()))?;
    if image.width() > MAX_TEXTURE_SIDE || image.height() > MAX_TEXTURE_SIDE {
        image = image.resize(
            MAX_TEXTURE_SIDE,
            MAX_TEXTURE_SIDE,
            image::imageops::FilterType::Triangle,
        );
    }
    let rgba = image.into_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}
