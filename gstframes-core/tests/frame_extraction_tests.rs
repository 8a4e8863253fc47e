//! End-to-end tests of caps discovery and frame extraction against a real
//! subprocess.
//!
//! These tests verify:
//! - Caps printed on stdout are discovered and size the frames
//! - Frames written to descriptor 3 arrive intact and in order
//! - Early exits, unsupported formats and timeouts are reported
//! - Cancellation stops a pipeline that never ends on its own

mod common;

use common::{FakeGst, RECORD_ARGS, capsfilter_line, write_frames};
use gstframes_core::{
    CoreError, FdSink, Pipeline, PipelineConfigBuilder, StreamEnd, produce_frames,
};
use serial_test::serial;
use std::ops::ControlFlow;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

fn sink_for(binary: &Path) -> FdSink {
    Pipeline::with_binary(binary)
        .unwrap()
        .add_tokens(["videotestsrc", "num-buffers=5"])
        .add_tokens(["videoconvert"])
        .add_tokens(["video/x-raw,format=BGR,width=4,height=2"])
        .add_sink(FdSink::new())
}

#[test]
#[serial]
fn test_frames_arrive_in_order_then_end_of_stream() {
    let gst = FakeGst::new(&format!(
        "echo 'Setting pipeline to PAUSED ...'\n\
         echo '{}'\n\
         {}",
        capsfilter_line("BGR", 4, 2),
        write_frames(5, 24, 3)
    ));

    let mut frames = Vec::new();
    let end = produce_frames(&sink_for(gst.path()), |frame| {
        assert_eq!((frame.width, frame.height, frame.channels), (4, 2, 3));
        frames.push(frame.data.to_vec());
        Ok(ControlFlow::Continue(()))
    })
    .unwrap();

    assert_eq!(end, StreamEnd::EndOfStream);
    assert_eq!(frames.len(), 5);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.len(), 24);
        assert!(frame.iter().all(|&b| b == b'a' + i as u8));
    }
}

#[test]
#[serial]
fn test_rendered_arguments_reach_the_binary() {
    let gst = FakeGst::new(&format!(
        "{}\necho '{}'\n{}",
        RECORD_ARGS,
        capsfilter_line("RGBA", 2, 2),
        write_frames(1, 16, 3)
    ));

    let end = produce_frames(&sink_for(gst.path()), |_| Ok(ControlFlow::Continue(()))).unwrap();
    assert_eq!(end, StreamEnd::EndOfStream);
    assert_eq!(
        gst.recorded_args(),
        vec![
            "-v",
            "videotestsrc",
            "num-buffers=5",
            "!",
            "videoconvert",
            "!",
            "video/x-raw,format=BGR,width=4,height=2",
            "!",
            "fdsink",
            "fd=3",
        ]
    );
}

#[test]
#[serial]
fn test_trace_output_keeps_draining_while_streaming() {
    // Well past a pipe buffer of trace after the caps: the pipeline would
    // stall before writing any frame if nobody kept reading stdout.
    let trace = "/GstPipeline:pipeline0/GstFdSink:fdsink0: last-message = rendered buffer, dts: none, pts: 0:00:00.000000000";
    let gst = FakeGst::new(&format!(
        "echo '{}'
         yes '{}' | head -n 2048
         {}
         yes '{}' | head -n 512
         {}",
        capsfilter_line("BGR", 4, 2),
        trace,
        write_frames(2, 24, 3),
        trace,
        write_frames(3, 24, 3)
    ));

    let mut frames = 0;
    let end = produce_frames(&sink_for(gst.path()), |frame| {
        assert_eq!(frame.data.len(), 24);
        frames += 1;
        Ok(ControlFlow::Continue(()))
    })
    .unwrap();

    assert_eq!(end, StreamEnd::EndOfStream);
    assert_eq!(frames, 5);
}

#[test]
#[serial]
fn test_exit_before_caps_is_discovery_failure() {
    let gst = FakeGst::new("echo 'ERROR: pipeline could not be constructed'\nexit 1");
    let err = sink_for(gst.path()).start().unwrap_err();
    assert!(matches!(err, CoreError::CapsDiscovery { ref stage, .. } if stage == "GstCapsFilter"));
}

#[test]
#[serial]
fn test_unsupported_format_is_rejected() {
    let gst = FakeGst::new(&format!(
        "echo '{}'\n{}",
        capsfilter_line("I420", 4, 2),
        write_frames(2, 12, 3)
    ));
    let err = sink_for(gst.path()).start().unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedFormat(ref f) if f == "I420"));
}

#[test]
#[serial]
fn test_caps_timeout_stops_silent_pipeline() {
    let gst = FakeGst::new("exec sleep 30");
    let config = PipelineConfigBuilder::new()
        .gst_bin(gst.path())
        .caps_timeout(Duration::from_millis(200))
        .build();
    let sink = Pipeline::from_config(config)
        .unwrap()
        .add_tokens(["videotestsrc"])
        .add_sink(FdSink::new());

    let started = Instant::now();
    let err = sink.start().unwrap_err();
    assert!(matches!(err, CoreError::CapsDiscoveryTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
#[serial]
fn test_cancel_stops_endless_pipeline() {
    let gst = FakeGst::new(&format!(
        "echo '{}'\n{}\nexec sleep 30",
        capsfilter_line("BGR", 4, 2),
        write_frames(1, 24, 3)
    ));

    let mut session = sink_for(gst.path()).start().unwrap();
    let cancel = session.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        cancel.cancel()
    });

    let started = Instant::now();
    let end = session.for_each_frame(|_| Ok(ControlFlow::Continue(()))).unwrap();
    assert_eq!(end, StreamEnd::Cancelled);
    assert_eq!(session.frames_delivered(), 1);
    assert!(started.elapsed() < Duration::from_secs(10));

    canceller.join().unwrap().unwrap();
    assert!(!session.close().unwrap().success());
}

#[test]
#[serial]
fn test_consumer_stop_ends_early() {
    let gst = FakeGst::new(&format!(
        "echo '{}'\nexec head -c 69120 /dev/zero >&3",
        capsfilter_line("RGB", 64, 36)
    ));

    let mut count = 0;
    let end = produce_frames(&sink_for(gst.path()), |frame| {
        assert_eq!(frame.data.len(), 64 * 36 * 3);
        count += 1;
        Ok(if count == 3 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) })
    })
    .unwrap();

    assert_eq!(end, StreamEnd::Stopped);
    assert_eq!(count, 3);
}

#[test]
#[serial]
fn test_caps_snapshot_lists_upstream_stages() {
    let gst = FakeGst::new(&format!(
        "echo '/GstPipeline:pipeline0/GstVideoTestSrc:videotestsrc0.GstPad:src: caps = video/x-raw, format=(string)I420, width=(int)320, height=(int)240'\n\
         echo '{}'\n{}",
        capsfilter_line("BGR", 4, 2),
        write_frames(1, 24, 3)
    ));

    let session = sink_for(gst.path()).start().unwrap();
    let snapshot = session.caps_snapshot();
    assert_eq!(snapshot["videotestsrc0"].pixel_format, "I420");
    assert_eq!(snapshot["capsfilter0"].width, 4);
    session.close().unwrap();
}

#[test]
#[serial]
fn test_side_channel_on_configured_descriptor() {
    let gst = FakeGst::new(&format!(
        "echo '{}'\n{}",
        capsfilter_line("BGRA", 1, 1),
        write_frames(3, 4, 5)
    ));
    let config = PipelineConfigBuilder::new()
        .gst_bin(gst.path())
        .side_channel_fd(5)
        .build();
    let sink = Pipeline::from_config(config)
        .unwrap()
        .add_tokens(["videotestsrc"])
        .add_sink(FdSink::new());

    let mut frames = 0;
    let end = produce_frames(&sink, |frame| {
        assert_eq!(frame.data, vec![b'a' + frames; 4].as_slice());
        frames += 1;
        Ok(ControlFlow::Continue(()))
    })
    .unwrap();
    assert_eq!(end, StreamEnd::EndOfStream);
    assert_eq!(frames, 3);
}
