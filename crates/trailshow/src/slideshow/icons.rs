/// `viewBox` shared by both autoplay icons.
pub const VIEW_BOX: &str = "0 0 640 640";

const PLAY_PATH: &str = "M187.2 100.9C174.8 94.1 159.8 94.4 147.6 101.6C135.4 108.8 128 121.9 128 136L128 504C128 518.1 135.5 531.2 147.6 538.4C159.7 545.6 174.8 545.9 187.2 539.1L523.2 355.1C536 348.1 544 334.6 544 320C544 305.4 536 291.9 523.2 284.9L187.2 100.9z";

const PAUSE_PATH: &str = "M176 96C149.5 96 128 117.5 128 144L128 496C128 522.5 149.5 544 176 544L240 544C266.5 544 288 522.5 288 496L288 144C288 117.5 266.5 96 240 96L176 96zM400 96C373.5 96 352 117.5 352 144L352 496C352 522.5 373.5 544 400 544L464 544C490.5 544 512 522.5 512 496L512 144C512 117.5 490.5 96 464 96L400 96z";

/// Icon shown on the autoplay button. The button shows the action a press
/// would take: pause while rotating, play while paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Play,
    Pause,
}

impl Icon {
    pub fn for_paused(paused: bool) -> Self {
        if paused { Self::Play } else { Self::Pause }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "play" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            _ => None,
        }
    }

    /// SVG path data in [`VIEW_BOX`] units.
    pub fn path_data(self) -> &'static str {
        match self {
            Self::Play => PLAY_PATH,
            Self::Pause => PAUSE_PATH,
        }
    }

    /// Outline of the glyph as polygons in unit space (0..1 on both axes),
    /// traced from the SVG paths with the corner rounding dropped.
    pub fn polygons(self) -> Vec<Vec<[f32; 2]>> {
        let unit = |x: f32, y: f32| [x / 640.0, y / 640.0];
        match self {
            Self::Play => vec![vec![unit(128.0, 96.0), unit(544.0, 320.0), unit(128.0, 544.0)]],
            Self::Pause => vec![
                vec![
                    unit(128.0, 96.0),
                    unit(288.0, 96.0),
                    unit(288.0, 544.0),
                    unit(128.0, 544.0),
                ],
                vec![
                    unit(352.0, 96.0),
                    unit(512.0, 96.0),
                    unit(512.0, 544.0),
                    unit(352.0, 544.0),
                ],
            ],
        }
    }
}
