//! Window configuration and command-line sizing flags.

/// One of the supported window presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WindowSize {
    /// 1280x720, selected with `-hd`.
    Hd,
    /// 1920x1080, selected with `-fhd`. Also the default.
    #[default]
    FullHd,
}

impl WindowSize {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            WindowSize::Hd => (1280, 720),
            WindowSize::FullHd => (1920, 1080),
        }
    }

    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-hd" => Some(WindowSize::Hd),
            "-fhd" => Some(WindowSize::FullHd),
            _ => None,
        }
    }
}

/// Configuration for the editor window.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let (width, height) = WindowSize::default().dimensions();
        Self {
            title: "Vantage".to_string(),
            width,
            height,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Build a config from process arguments (the first item is the program name).
    ///
    /// `-hd` and `-fhd` pick the window size; when both appear the last one wins.
    /// Anything else is reported and ignored.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut size = WindowSize::default();
        for arg in args.into_iter().skip(1) {
            let arg = arg.as_ref();
            match WindowSize::from_flag(arg) {
                Some(preset) => size = preset,
                None => log::warn!("ignoring unknown argument '{arg}' (expected -hd or -fhd)"),
            }
        }

        let (width, height) = size.dimensions();
        Self::default().size(width, height)
    }

    /// Build a config from `std::env::args`.
    pub fn from_env() -> Self {
        Self::from_args(std::env::args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_full_hd() {
        let config = AppConfig::from_args(["vantage"]);
        assert_eq!((config.width, config.height), (1920, 1080));
    }

    #[test]
    fn hd_flag_selects_720p() {
        let config = AppConfig::from_args(["vantage", "-hd"]);
        assert_eq!((config.width, config.height), (1280, 720));
    }

    #[test]
    fn fhd_flag_selects_1080p() {
        let config = AppConfig::from_args(["vantage", "-fhd"]);
        assert_eq!((config.width, config.height), (1920, 1080));
    }

    #[test]
    fn unknown_arguments_are_ignored() {
        let config = AppConfig::from_args(["vantage", "--fullscreen", "-hd", "scene.gltf"]);
        assert_eq!((config.width, config.height), (1280, 720));
    }

    #[test]
    fn last_size_flag_wins() {
        let config = AppConfig::from_args(["vantage", "-hd", "-fhd"]);
        assert_eq!((config.width, config.height), (1920, 1080));
    }
}
