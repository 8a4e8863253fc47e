//! Line classifier for gst-launch verbose output.
//!
//! With `-v`, gst-launch prints one line per negotiated pad, for example:
//!
//! ```text
//! /GstPipeline:pipeline0/GstCapsFilter:capsfilter0.GstPad:src: caps = video/x-raw, format=(string)BGR, width=(int)320, height=(int)240, framerate=(fraction)25/1
//! ```
//!
//! Each attribute has its own extractor. A line is run through all of them
//! and whatever matched is merged into one record. Lines that name no stage
//! are ignored.

use super::{Caps, Framerate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Element path ending in the reporting element, optional pad path, then `caps =`.
/// The last `Type:instance` segment before the pad wins, so elements nested in
/// bins are attributed to themselves rather than to the bin.
/// Both parts are kept: two caps filters share a type but not an instance.
static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"/GstPipeline:[\w-]+(?:/[\w-]+:[\w-]+)*/(?P<name>[A-Za-z_]\w*):(?P<instance>[\w-]+)(?:\.[\w-]+:[\w-]+)*:\s*caps\s*=",
    )
    .expect("valid name pattern")
});

static MEDIA_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"caps\s*=\s*(?P<type>[a-z]+/[\w.+-]+)").expect("valid media type pattern")
});

static WIDTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s,])width=\(int\)(?P<v>\d+)").expect("valid width pattern"));

static HEIGHT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s,])height=\(int\)(?P<v>\d+)").expect("valid height pattern"));

static FRAMERATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[\s,])framerate=\(fraction\)(?P<num>\d+)/(?P<den>\d+)")
        .expect("valid framerate pattern")
});

static FORMAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[\s,])format=\(string\)(?P<v>[A-Za-z0-9_]+)").expect("valid format pattern")
});

/// Returns the last value captured by `re` in `line`.
fn last_capture<'a>(re: &Regex, line: &'a str, group: &str) -> Option<&'a str> {
    re.captures_iter(line)
        .filter_map(|c| c.name(group))
        .last()
        .map(|m| m.as_str())
}

/// Numeric fields that do not fit default to zero, which reads as "unknown".
fn parse_dimension(value: &str) -> u32 {
    value.parse().unwrap_or(0)
}

/// Extracts a caps record from one trace line.
///
/// Returns `None` unless the line names the stage it belongs to. The returned
/// record may still be partial; attributes missing from this line stay at
/// their defaults.
///
/// # Examples
///
/// ```rust
/// use gstframes_core::caps::parse_caps_line;
///
/// let line = "/GstPipeline:pipeline0/GstCapsFilter:capsfilter0.GstPad:src: caps = video/x-raw, format=(string)BGR, width=(int)320, height=(int)240";
/// let caps = parse_caps_line(line).unwrap();
/// assert_eq!(caps.name, "GstCapsFilter");
/// assert_eq!(caps.instance, "capsfilter0");
/// assert_eq!((caps.width, caps.height), (320, 240));
///
/// assert!(parse_caps_line("Setting pipeline to PLAYING ...").is_none());
/// ```
pub fn parse_caps_line(line: &str) -> Option<Caps> {
    let stage = NAME_RE.captures_iter(line).last()?;

    let mut caps = Caps {
        name: stage["name"].to_string(),
        instance: stage["instance"].to_string(),
        ..Caps::default()
    };

    if let Some(media_type) = last_capture(&MEDIA_TYPE_RE, line, "type") {
        caps.media_type = media_type.to_string();
    }
    if let Some(width) = last_capture(&WIDTH_RE, line, "v") {
        caps.width = parse_dimension(width);
    }
    if let Some(height) = last_capture(&HEIGHT_RE, line, "v") {
        caps.height = parse_dimension(height);
    }
    if let Some(rate) = FRAMERATE_RE.captures_iter(line).last() {
        caps.framerate = Some(Framerate {
            numerator: parse_dimension(&rate["num"]),
            denominator: parse_dimension(&rate["den"]),
        });
    }
    if let Some(format) = last_capture(&FORMAT_RE, line, "v") {
        caps.pixel_format = format.to_string();
    }

    Some(caps)
}
