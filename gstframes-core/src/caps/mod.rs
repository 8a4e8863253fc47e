//! Negotiated stream parameters recovered from the pipeline's trace output.
//!
//! A [`Caps`] record is built up from one or more verbose trace lines that
//! mention the same stage. Only a complete record (see [`Caps::is_complete`])
//! may be used to size frames.

mod parser;
mod table;

pub use parser::parse_caps_line;
pub use table::CapsTable;

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frame rate as the fraction reported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framerate {
    pub numerator: u32,
    pub denominator: u32,
}

impl Framerate {
    /// Frames per second, or `None` for a zero denominator (variable rate).
    pub fn as_f64(&self) -> Option<f64> {
        (self.denominator != 0).then(|| f64::from(self.numerator) / f64::from(self.denominator))
    }
}

impl fmt::Display for Framerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Stream parameters negotiated by one named stage.
///
/// Zero dimensions and empty strings mean "not seen yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caps {
    /// Element type of the stage that reported these caps, e.g. `GstCapsFilter`
    pub name: String,
    /// Element instance name, e.g. `capsfilter1`. Empty when not reported.
    #[serde(default)]
    pub instance: String,
    /// Media type token, e.g. `video/x-raw`
    pub media_type: String,
    pub width: u32,
    pub height: u32,
    pub framerate: Option<Framerate>,
    /// Raw format code, e.g. `BGR`
    pub pixel_format: String,
}

impl Caps {
    /// A record is discovered once a stage name is attached to it.
    pub fn is_discovered(&self) -> bool {
        !self.name.is_empty()
    }

    /// Key of the record in a [`CapsTable`]: the instance name, or the
    /// element type when no instance was reported.
    pub fn key(&self) -> &str {
        if self.instance.is_empty() { &self.name } else { &self.instance }
    }

    /// Counter suffix gst-launch gives unnamed instances, e.g. 1 for
    /// `capsfilter1` and 0 for `queue2-0`.
    pub fn instance_index(&self) -> Option<u64> {
        let stem = self.instance.trim_end_matches(|c: char| c.is_ascii_digit());
        self.instance[stem.len()..].parse().ok()
    }

    /// True when the record can be trusted for frame-size computation.
    pub fn is_complete(&self) -> bool {
        self.is_discovered() && self.width > 0 && self.height > 0 && !self.pixel_format.is_empty()
    }

    /// Copies every field of `newer` that carries a value over this record.
    pub fn merge_from(&mut self, newer: &Caps) {
        if !newer.name.is_empty() {
            self.name.clone_from(&newer.name);
        }
        if !newer.instance.is_empty() {
            self.instance.clone_from(&newer.instance);
        }
        if !newer.media_type.is_empty() {
            self.media_type.clone_from(&newer.media_type);
        }
        if newer.width > 0 {
            self.width = newer.width;
        }
        if newer.height > 0 {
            self.height = newer.height;
        }
        if newer.framerate.is_some() {
            self.framerate = newer.framerate;
        }
        if !newer.pixel_format.is_empty() {
            self.pixel_format.clone_from(&newer.pixel_format);
        }
    }

    /// Parses the pixel format into one of the supported packed layouts.
    pub fn format(&self) -> CoreResult<PixelFormat> {
        self.pixel_format.parse()
    }

    /// Bytes per pixel of the stream.
    pub fn channels(&self) -> CoreResult<usize> {
        Ok(self.format()?.bytes_per_pixel())
    }

    /// Size in bytes of one raw frame.
    ///
    /// Fails with [`CoreError::UnsupportedFormat`] for formats outside the
    /// packed RGB family and with [`CoreError::CapsDiscovery`] for records
    /// that are not complete yet.
    pub fn frame_size(&self) -> CoreResult<usize> {
        if !self.is_complete() {
            return Err(crate::error::caps_discovery_error(
                &self.name,
                format!("caps are incomplete ({self})"),
            ));
        }
        let channels = self.channels()?;
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(channels))
            .ok_or_else(|| CoreError::Config(format!("frame size overflows for {self}")))
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() { "?" } else { self.name.as_str() };
        let format = if self.pixel_format.is_empty() { "?" } else { self.pixel_format.as_str() };
        write!(f, "{name}: {}x{} {format}", self.width, self.height)?;
        if let Some(rate) = self.framerate {
            write!(f, " @ {rate}")?;
        }
        Ok(())
    }
}

/// Packed pixel layouts a frame can be extracted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Bgr,
    Rgba,
    Bgra,
    Argb,
    Abgr,
    Rgbx,
    Bgrx,
    Xrgb,
    Xbgr,
}

impl PixelFormat {
    /// Number of interleaved bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba
            | Self::Bgra
            | Self::Argb
            | Self::Abgr
            | Self::Rgbx
            | Self::Bgrx
            | Self::Xrgb
            | Self::Xbgr => 4,
        }
    }

    /// Format code as written in caps.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Bgr => "BGR",
            Self::Rgba => "RGBA",
            Self::Bgra => "BGRA",
            Self::Argb => "ARGB",
            Self::Abgr => "ABGR",
            Self::Rgbx => "RGBx",
            Self::Bgrx => "BGRx",
            Self::Xrgb => "xRGB",
            Self::Xbgr => "xBGR",
        }
    }
}

impl FromStr for PixelFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Case matters: "RGBx" and "RGBX" are not the same code in caps.
        match s {
            "RGB" => Ok(Self::Rgb),
            "BGR" => Ok(Self::Bgr),
            "RGBA" => Ok(Self::Rgba),
            "BGRA" => Ok(Self::Bgra),
            "ARGB" => Ok(Self::Argb),
            "ABGR" => Ok(Self::Abgr),
            "RGBx" => Ok(Self::Rgbx),
            "BGRx" => Ok(Self::Bgrx),
            "xRGB" => Ok(Self::Xrgb),
            "xBGR" => Ok(Self::Xbgr),
            other => Err(CoreError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(name: &str, width: u32, height: u32, format: &str) -> Caps {
        Caps {
            name: name.to_string(),
            width,
            height,
            pixel_format: format.to_string(),
            ..Caps::default()
        }
    }

    #[test]
    fn test_frame_size_three_and_four_channels() {
        assert_eq!(caps("GstCapsFilter", 320, 240, "BGR").frame_size().unwrap(), 320 * 240 * 3);
        assert_eq!(caps("GstCapsFilter", 320, 240, "RGB").frame_size().unwrap(), 230_400);
        assert_eq!(caps("GstCapsFilter", 640, 480, "BGRA").frame_size().unwrap(), 640 * 480 * 4);
        assert_eq!(caps("GstCapsFilter", 2, 2, "xRGB").frame_size().unwrap(), 16);
    }

    #[test]
    fn test_frame_size_rejects_unsupported_format() {
        let err = caps("GstCapsFilter", 320, 240, "I420").frame_size().unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedFormat(ref f) if f == "I420"));
    }

    #[test]
    fn test_frame_size_rejects_incomplete_caps() {
        assert!(matches!(
            caps("GstCapsFilter", 0, 240, "BGR").frame_size(),
            Err(CoreError::CapsDiscovery { .. })
        ));
        assert!(matches!(
            caps("", 320, 240, "BGR").frame_size(),
            Err(CoreError::CapsDiscovery { .. })
        ));
    }

    #[test]
    fn test_completeness() {
        assert!(!Caps::default().is_discovered());
        assert!(!caps("GstCapsFilter", 320, 0, "BGR").is_complete());
        assert!(!caps("GstCapsFilter", 320, 240, "").is_complete());
        assert!(caps("GstCapsFilter", 320, 240, "BGR").is_complete());
    }

    #[test]
    fn test_merge_keeps_known_fields() {
        let mut record = caps("GstCapsFilter", 320, 0, "");
        record.merge_from(&Caps {
            name: "GstCapsFilter".to_string(),
            height: 240,
            pixel_format: "BGR".to_string(),
            ..Caps::default()
        });
        assert_eq!(record.width, 320);
        assert_eq!(record.height, 240);
        assert_eq!(record.pixel_format, "BGR");

        record.merge_from(&Caps {
            name: "GstCapsFilter".to_string(),
            width: 640,
            ..Caps::default()
        });
        assert_eq!(record.width, 640);
        assert_eq!(record.height, 240);
    }

    #[test]
    fn test_key_and_instance_index() {
        let mut record = caps("GstCapsFilter", 4, 2, "BGR");
        assert_eq!(record.key(), "GstCapsFilter");
        assert_eq!(record.instance_index(), None);

        record.instance = "capsfilter12".to_string();
        assert_eq!(record.key(), "capsfilter12");
        assert_eq!(record.instance_index(), Some(12));

        record.instance = "conv".to_string();
        assert_eq!(record.instance_index(), None);
    }

    #[test]
    fn test_pixel_format_is_case_sensitive() {
        assert_eq!("RGBx".parse::<PixelFormat>().unwrap(), PixelFormat::Rgbx);
        assert!("RGBX".parse::<PixelFormat>().is_err());
        assert!("bgr".parse::<PixelFormat>().is_err());
    }

    #[test]
    fn test_display() {
        let mut record = caps("GstCapsFilter", 320, 240, "BGR");
        record.framerate = Some(Framerate { numerator: 25, denominator: 1 });
        assert_eq!(record.to_string(), "GstCapsFilter: 320x240 BGR @ 25/1");
        assert_eq!(Caps::default().to_string(), "?: 0x0 ?");
    }

    #[test]
    fn test_framerate_as_f64() {
        assert_eq!(Framerate { numerator: 30000, denominator: 1001 }.as_f64().map(|f| (f * 100.0).round()), Some(2997.0));
        assert_eq!(Framerate { numerator: 0, denominator: 0 }.as_f64(), None);
    }
}
