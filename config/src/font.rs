use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::ConfigError;

const DEFAULT_PIXEL_SIZE: f32 = 13.0;
const FONT_EXTENSIONS: [&str; 2] = ["ttf", "otf"];
const FONT_DIRS: [&str; 6] = [
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/OTF",
    "/usr/local/share/fonts",
    "/usr/share/fonts",
];

/// `family[:pixelsize=N][:key=value...]`, where `family` is a font file path
/// or the file stem of a font in one of the usual font directories.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSelector {
    pub family: String,
    pub pixel_size: f32,
}

impl Default for FontSelector {
    fn default() -> Self {
        Self {
            family: "DejaVuSansMono-Bold".to_string(),
            pixel_size: DEFAULT_PIXEL_SIZE,
        }
    }
}

impl FromStr for FontSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let family = parts.next().unwrap_or_default().trim();
        if family.is_empty() {
            return Err(ConfigError::InvalidFont(s.to_string()));
        }

        let mut pixel_size = DEFAULT_PIXEL_SIZE;
        for part in parts {
            match part.split_once('=') {
                Some(("pixelsize" | "size", value)) => {
                    pixel_size = value
                        .trim()
                        .parse::<f32>()
                        .ok()
                        .filter(|size| *size > 0.0 && size.is_finite())
                        .ok_or_else(|| ConfigError::InvalidFont(s.to_string()))?;
                }
                _ => debug!("ignoring font property {part:?}"),
            }
        }

        Ok(Self {
            family: family.to_string(),
            pixel_size,
        })
    }
}

impl FontSelector {
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(&self.family)];
        let mut dirs: Vec<PathBuf> = FONT_DIRS.iter().map(PathBuf::from).collect();
        if let Some(home) = std::env::var_os("HOME") {
            dirs.insert(0, Path::new(&home).join(".local/share/fonts"));
        }
        for dir in dirs {
            for ext in FONT_EXTENSIONS {
                paths.push(dir.join(format!("{}.{ext}", self.family)));
            }
        }
        paths
    }

    /// Reads the first candidate file that exists.
    pub fn load(&self) -> Result<(PathBuf, Vec<u8>), ConfigError> {
        for path in self.candidates() {
            if let Ok(bytes) = std::fs::read(&path) {
                return Ok((path, bytes));
            }
        }
        Err(ConfigError::FontNotFound {
            family: self.family.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_family_and_pixel_size() {
        let font: FontSelector = "DejaVuSans:pixelsize=16:style=bold".parse().unwrap();
        assert_eq!(font.family, "DejaVuSans");
        assert_eq!(font.pixel_size, 16.0);
    }

    #[test]
    fn pixel_size_defaults() {
        let font: FontSelector = "/tmp/font.ttf".parse().unwrap();
        assert_eq!(font.family, "/tmp/font.ttf");
        assert_eq!(font.pixel_size, DEFAULT_PIXEL_SIZE);
    }

    #[test]
    fn rejects_empty_family_and_bad_size() {
        assert!(":pixelsize=12".parse::<FontSelector>().is_err());
        assert!("Mono:pixelsize=big".parse::<FontSelector>().is_err());
        assert!("Mono:pixelsize=0".parse::<FontSelector>().is_err());
    }

    #[test]
    fn candidates_start_with_literal_path() {
        let font: FontSelector = "Hack-Bold".parse().unwrap();
        let candidates = font.candidates();
        assert_eq!(candidates[0], PathBuf::from("Hack-Bold"));
        assert!(candidates
            .iter()
            .any(|p| p == Path::new("/usr/share/fonts/TTF/Hack-Bold.ttf")));
    }

    #[test]
    fn loads_literal_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.ttf");
        std::fs::write(&path, b"not really a font").unwrap();

        let font: FontSelector = path.to_str().unwrap().parse().unwrap();
        let (found, bytes) = font.load().unwrap();
        assert_eq!(found, path);
        assert_eq!(bytes, b"not really a font");
    }

    #[test]
    fn missing_font_is_an_error() {
        let font: FontSelector = "/nonexistent/definitely-missing.ttf".parse().unwrap();
        assert!(matches!(font.load(), Err(ConfigError::FontNotFound { .. })));
    }
}
