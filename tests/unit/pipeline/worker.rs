use super::*;

use std::path::PathBuf;
use std::sync::mpsc::sync_channel;

use crate::foundation::error::CaptionError;

struct Solid {
    canvas: Canvas,
    panic_at: Option<u64>,
    fail_at: Option<u64>,
}

impl FrameRenderer for Solid {
    fn render_frame(&mut self, index: FrameIndex, _time: f64) -> CaptionResult<RenderedFrame> {
        if self.panic_at == Some(index.0) {
            panic!("boom at {}", index.0);
        }
        if self.fail_at == Some(index.0) {
            return Err(CaptionError::render("bad frame"));
        }
        Ok(RenderedFrame {
            frame: FrameRGBA::transparent(self.canvas),
            reused: false,
        })
    }
}

fn factory(panic_at: Option<u64>, fail_at: Option<u64>) -> Arc<dyn RendererFactory> {
    Arc::new(move |canvas: Canvas, _fps: Fps| -> CaptionResult<Box<dyn FrameRenderer>> {
        Ok(Box::new(Solid {
            canvas,
            panic_at,
            fail_at,
        }))
    })
}

fn job(start: u64, end: u64) -> FrameJob {
    FrameJob {
        range: FrameRange::new(FrameIndex(start), FrameIndex(end)).unwrap(),
        fps: Fps::new(30, 1).unwrap(),
        canvas: Canvas::new(4, 4).unwrap(),
    }
}

fn collect(unit: usize, job: FrameJob, factory: Arc<dyn RendererFactory>) -> Vec<UnitMessage> {
    let (tx, rx) = sync_channel(64);
    run_unit(unit, job, factory, tx, Arc::new(AtomicBool::new(false)));
    rx.into_iter().collect()
}

#[test]
fn streams_its_range_in_order_then_done() {
    let msgs = collect(3, job(10, 14), factory(None, None));
    let indices: Vec<u64> = msgs
        .iter()
        .filter_map(|m| match m {
            UnitMessage::Frame { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![10, 11, 12, 13]);
    assert!(matches!(msgs.last(), Some(UnitMessage::Done { unit: 3 })));
}

#[test]
fn panics_become_failed_with_the_frame() {
    let msgs = collect(0, job(0, 5), factory(Some(2), None));
    assert_eq!(msgs.len(), 3);
    match msgs.last() {
        Some(UnitMessage::Failed { frame, message, .. }) => {
            assert_eq!(*frame, Some(2));
            assert!(message.contains("boom at 2"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn errors_become_failed() {
    let msgs = collect(1, job(0, 3), factory(None, Some(0)));
    assert!(matches!(
        msgs.as_slice(),
        [UnitMessage::Failed { unit: 1, frame: Some(0), .. }]
    ));
}

#[test]
fn stop_flag_ends_the_unit_early() {
    let (tx, rx) = sync_channel(64);
    let stop = Arc::new(AtomicBool::new(true));
    run_unit(0, job(0, 100), factory(None, None), tx, stop);
    let msgs: Vec<_> = rx.into_iter().collect();
    assert!(matches!(msgs.as_slice(), [UnitMessage::Done { unit: 0 }]));
}

#[test]
fn caption_renderer_reuses_static_frames() {
    let fonts = FontBook::from_dir(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts"))
        .unwrap();
    let cues: Arc<[Cue]> = vec![Cue::new(1, 0.0, 2.0, "steady caption")].into();
    let factory = CaptionRendererFactory::new(Arc::new(fonts), cues, Arc::new(Style::default()));
    let fps = Fps::new(30, 1).unwrap();
    let mut renderer = factory.build(Canvas::new(192, 108).unwrap(), fps).unwrap();

    let a = renderer.render_frame(FrameIndex(30), fps.frame_time(FrameIndex(30))).unwrap();
    let b = renderer.render_frame(FrameIndex(31), fps.frame_time(FrameIndex(31))).unwrap();
    assert!(!a.reused);
    assert!(b.reused);
    assert!(a.frame.shares_buffer(&b.frame));
    assert!(!a.frame.is_blank());

    let after = renderer.render_frame(FrameIndex(90), 3.0).unwrap();
    assert!(!after.reused);
    assert!(after.frame.is_blank());
    assert_eq!(renderer.cache_counters(), (1, 2));
}
