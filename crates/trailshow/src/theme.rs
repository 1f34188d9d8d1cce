use eframe::egui::Color32;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub background: Color32,
    pub foreground: Color32,
    pub heading_color: Color32,
    pub accent: Color32,
    /// Backdrop behind the slide stage and empty thumbnails.
    pub stage_background: Color32,
    pub button_background: Color32,
    pub button_foreground: Color32,
    pub h1_size: f32,
    pub h2_size: f32,
    pub h3_size: f32,
    pub body_size: f32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            background: Color32::from_rgb(0x1E, 0x1E, 0x1E),
            foreground: Color32::from_rgb(0xC8, 0xC8, 0xC8),
            heading_color: Color32::WHITE,
            accent: Color32::from_rgb(0x52, 0x94, 0xE2),
            stage_background: Color32::from_rgb(0x10, 0x10, 0x10),
            button_background: Color32::from_rgb(0x2D, 0x2D, 0x2D),
            button_foreground: Color32::from_rgb(0xE6, 0xE6, 0xE6),
            h1_size: 40.0,
            h2_size: 32.0,
            h3_size: 26.0,
            body_size: 18.0,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            background: Color32::WHITE,
            foreground: Color32::from_rgb(0x1A, 0x1A, 0x2E),
            heading_color: Color32::from_rgb(0x16, 0x21, 0x3E),
            accent: Color32::from_rgb(0x0F, 0x34, 0x60),
            stage_background: Color32::from_rgb(0xE8, 0xE8, 0xEC),
            button_background: Color32::from_rgb(0xF5, 0xF5, 0xF5),
            button_foreground: Color32::from_rgb(0x33, 0x33, 0x33),
            h1_size: 40.0,
            h2_size: 32.0,
            h3_size: 26.0,
            body_size: 18.0,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "dark" => Self::dark(),
            _ => Self::light(),
        }
    }

    pub fn toggled(&self) -> Self {
        if self.name == "dark" {
            Self::light()
        } else {
            Self::dark()
        }
    }

    /// Apply opacity to a color
    pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
        Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), (opacity * 255.0) as u8)
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        match level {
            1 => self.h1_size,
            2 => self.h2_size,
            3 => self.h3_size,
            _ => self.body_size,
        }
    }
}
