//! Pipeline stage descriptors.

use std::fmt;

/// One element of a gst-launch chain, rendered as command tokens.
///
/// Token order is significant and is copied verbatim into the command line.
pub trait Stage: Send + Sync {
    fn tokens(&self) -> Vec<String>;
}

/// A stage given directly as tokens, e.g. `["videoscale"]` or
/// `["video/x-raw,format=BGR"]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenericStage {
    tokens: Vec<String>,
}

impl GenericStage {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits a stage description on whitespace.
    ///
    /// gst-launch joins its arguments with spaces before parsing, so
    /// `"videotestsrc num-buffers=5"` and `["videotestsrc", "num-buffers=5"]`
    /// describe the same element.
    pub fn parse(description: &str) -> Self {
        Self::new(description.split_whitespace())
    }
}

impl Stage for GenericStage {
    fn tokens(&self) -> Vec<String> {
        self.tokens.clone()
    }
}

impl fmt::Display for GenericStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

/// The `queue` element.
pub fn queue() -> GenericStage {
    GenericStage::new(["queue"])
}

/// Factory of the element described by one separator-delimited token group.
///
/// A bare caps string such as `video/x-raw,format=BGR` creates a
/// `capsfilter`. Pad references like `t.` create nothing.
pub(crate) fn element_factory(tokens: &[String]) -> Option<&str> {
    let first = tokens.first()?;
    let head = first.split(',').next().unwrap_or_default();
    if head.contains('/') && !head.contains('=') {
        Some("capsfilter")
    } else if first.ends_with('.') || first.contains('=') {
        None
    } else {
        Some(first.as_str())
    }
}

/// Stem gst uses to name unnamed instances of `element_type`: the type name
/// without its `Gst` prefix, lowercased. `GstCapsFilter` gives `capsfilter`.
pub(crate) fn instance_stem(element_type: &str) -> String {
    element_type
        .strip_prefix("Gst")
        .unwrap_or(element_type)
        .to_ascii_lowercase()
}

/// Name of the `index`th unnamed instance with the given stem. A stem that
/// already ends in a digit gets a dash, as in `queue2-0`.
pub(crate) fn numbered_instance(stem: &str, index: usize) -> String {
    if stem.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{stem}-{index}")
    } else {
        format!("{stem}{index}")
    }
}
