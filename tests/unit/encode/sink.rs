use super::*;

fn open_sink(sink: &mut InMemorySink, total: u64) {
    sink.begin(Canvas::new(2, 2).unwrap(), Fps::new(30, 1).unwrap(), total)
        .unwrap();
}

fn frame() -> FrameRGBA {
    FrameRGBA::transparent(Canvas::new(2, 2).unwrap())
}

#[test]
fn accepts_frames_in_order_and_ends() {
    let mut sink = InMemorySink::new();
    open_sink(&mut sink, 3);
    for i in 0..3 {
        assert_eq!(sink.push_frame(FrameIndex(i), frame()).unwrap(), SinkReady::Ready);
    }
    sink.end().unwrap();
    assert!(sink.is_ended());
    assert_eq!(sink.frames().len(), 3);
}

#[test]
fn rejects_out_of_order_frames() {
    let mut sink = InMemorySink::new();
    open_sink(&mut sink, 3);
    sink.push_frame(FrameIndex(0), frame()).unwrap();
    let err = sink.push_frame(FrameIndex(2), frame()).unwrap_err();
    assert!(err.to_string().contains("out of order"));
}

#[test]
fn busy_requires_wait_before_next_push() {
    let mut sink = InMemorySink::new().busy_every(2);
    open_sink(&mut sink, 4);
    assert_eq!(sink.push_frame(FrameIndex(0), frame()).unwrap(), SinkReady::Ready);
    assert_eq!(sink.push_frame(FrameIndex(1), frame()).unwrap(), SinkReady::Busy);
    assert!(sink.push_frame(FrameIndex(2), frame()).is_err());

    sink.wait_ready().unwrap();
    assert_eq!(sink.push_frame(FrameIndex(2), frame()).unwrap(), SinkReady::Ready);
    assert_eq!(sink.waits(), 1);
}

#[test]
fn end_checks_the_frame_count() {
    let mut sink = InMemorySink::new();
    open_sink(&mut sink, 2);
    sink.push_frame(FrameIndex(0), frame()).unwrap();
    assert!(sink.end().is_err());
}

#[test]
fn injected_failures_carry_the_frame() {
    let mut sink = InMemorySink::new().fail_at(1);
    open_sink(&mut sink, 2);
    sink.push_frame(FrameIndex(0), frame()).unwrap();
    match sink.push_frame(FrameIndex(1), frame()).unwrap_err() {
        CaptionError::Sink { frame, .. } => assert_eq!(frame, Some(1)),
        other => panic!("unexpected error {other}"),
    }
}
