//! Shared helpers for integration tests: generated stand-ins for the
//! gst-launch binary.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Caps line of the caps filter right before the frame sink.
pub fn capsfilter_line(format: &str, width: u32, height: u32) -> String {
    format!(
        "/GstPipeline:pipeline0/GstCapsFilter:capsfilter0.GstPad:src: caps = video/x-raw, format=(string){format}, width=(int){width}, height=(int){height}, framerate=(fraction)30/1"
    )
}

/// Shell snippet saving the script's arguments next to it, one per line.
pub const RECORD_ARGS: &str = "printf '%s\\n' \"$@\" > \"$(dirname \"$0\")/args.txt\"";

/// A shell script standing in for gst-launch-1.0.
pub struct FakeGst {
    dir: TempDir,
    path: PathBuf,
}

impl FakeGst {
    /// Writes an executable script that answers `--version` and otherwise
    /// runs `body`.
    pub fn new(body: &str) -> Self {
        Self::with_version_exit(body, 0)
    }

    pub fn with_version_exit(body: &str, version_exit: i32) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("gst-launch-1.0");
        let script = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"--version\" ]; then\n\
             \techo \"gst-launch-1.0 version 1.22.0\"\n\
             \texit {version_exit}\n\
             fi\n\
             {body}\n"
        );
        fs::write(&path, script).expect("write fake gst-launch");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake gst-launch");
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location the script may record its arguments to.
    pub fn args_file(&self) -> PathBuf {
        self.dir.path().join("args.txt")
    }

    /// Arguments recorded by a script that ran [`RECORD_ARGS`].
    pub fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(self.args_file())
            .expect("read recorded args")
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Shell snippet writing `count` frames of `size` bytes to descriptor `fd`.
/// Frame `i` is filled with the letter `'a' + i`.
pub fn write_frames(count: usize, size: usize, fd: i32) -> String {
    (0..count)
        .map(|i| {
            let letter = char::from(b'a' + i as u8);
            format!("printf '%s' '{}' >&{fd}", letter.to_string().repeat(size))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
