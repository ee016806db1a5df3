//! Background caption generation.
//!
//! One captioning model is shared by every task and is not safe for
//! concurrent use, so images are captioned strictly one after another while
//! holding the model lock, and at most one bulk run is in flight per service.

use crate::caption_store;
use crate::error::{AppError, BatchReport, Result};
use crate::file_utils::PathExt;
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};

/// Pretrained models a captioner can be asked to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptionModel {
    VitGpt2,
    Blip,
}

impl CaptionModel {
    pub const ALL: [CaptionModel; 2] = [CaptionModel::VitGpt2, CaptionModel::Blip];

    pub fn name(self) -> &'static str {
        match self {
            CaptionModel::VitGpt2 => "VIT-GPT2",
            CaptionModel::Blip => "BLIP",
        }
    }
}

impl fmt::Display for CaptionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CaptionModel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        CaptionModel::ALL
            .into_iter()
            .find(|model| model.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::UnknownModel(s.to_string()))
    }
}

/// Opaque image-to-text capability. May block for a long time.
pub trait Captioner: Send + 'static {
    fn caption(
        &mut self,
        model: CaptionModel,
        image_path: &Path,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Callbacks fired from the worker thread, in order: per image
/// `on_caption_ready` (or `on_failure`) then `on_progress`; `on_done` last.
#[allow(unused_variables)]
pub trait CaptionObserver: Send + 'static {
    fn on_caption_ready(&mut self, image_path: &Path, caption: &str) {}
    fn on_failure(&mut self, image_path: &Path, error: &AppError) {}
    fn on_progress(&mut self, completed: usize, total: usize) {}
    fn on_done(&mut self, summary: &CaptionSummary) {}
}

/// Result of a caption run.
#[derive(Debug, Default)]
pub struct CaptionSummary {
    pub total: usize,
    pub report: BatchReport,
    pub cancelled: bool,
}

/// Handle to a running caption task.
pub struct CaptionTaskHandle {
    cancel: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    done_rx: Receiver<CaptionSummary>,
}

impl CaptionTaskHandle {
    /// Asks the task to stop before the next image. The image in flight still finishes.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Blocks until the task is done. `None` if the worker died without reporting.
    pub fn wait(self) -> Option<CaptionSummary> {
        self.done_rx.recv().ok()
    }
}

/// Clears the in-flight flag when the bulk run ends, even on panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs caption tasks against one shared captioner.
pub struct CaptionService<C: Captioner> {
    captioner: Arc<Mutex<C>>,
    in_flight: Arc<AtomicBool>,
}

impl<C: Captioner> Clone for CaptionService<C> {
    fn clone(&self) -> Self {
        Self {
            captioner: self.captioner.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<C: Captioner> CaptionService<C> {
    pub fn new(captioner: C) -> Self {
        Self {
            captioner: Arc::new(Mutex::new(captioner)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true while a bulk run is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Captions `images` in order on a background thread, saving each caption file.
    ///
    /// Fails with [`AppError::CaptionTaskBusy`] if a bulk run is already in flight.
    pub fn caption_all<O: CaptionObserver>(
        &self,
        model: CaptionModel,
        images: Vec<PathBuf>,
        mut observer: O,
    ) -> Result<CaptionTaskHandle> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Caption task already running");
            return Err(AppError::CaptionTaskBusy);
        }
        let guard = InFlightGuard(self.in_flight.clone());

        let cancel = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();
        let handle = CaptionTaskHandle {
            cancel: cancel.clone(),
            finished: finished.clone(),
            done_rx,
        };

        let captioner = self.captioner.clone();
        info!("Captioning {} images with {}", images.len(), model);
        rayon::spawn(move || {
            let summary = {
                let mut captioner = captioner.lock().unwrap_or_else(PoisonError::into_inner);
                run_batch(&mut *captioner, model, &images, &cancel, &mut observer)
            };
            drop(guard);

            info!(
                "Caption task done: {}/{} captioned, {} failed{}",
                summary.report.processed,
                summary.total,
                summary.report.failure_count(),
                if summary.cancelled { ", cancelled" } else { "" }
            );
            observer.on_done(&summary);
            finished.store(true, Ordering::SeqCst);
            let _ = done_tx.send(summary);
        });

        Ok(handle)
    }

    /// Captions a single image in the background and saves its caption file.
    ///
    /// Emits no progress events. Waits for the model if a bulk run holds it.
    pub fn caption_one<O: CaptionObserver>(
        &self,
        model: CaptionModel,
        image_path: PathBuf,
        mut observer: O,
    ) -> CaptionTaskHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();
        let handle = CaptionTaskHandle {
            cancel: cancel.clone(),
            finished: finished.clone(),
            done_rx,
        };

        let captioner = self.captioner.clone();
        rayon::spawn(move || {
            let mut summary = CaptionSummary {
                total: 1,
                ..CaptionSummary::default()
            };
            if cancel.load(Ordering::SeqCst) {
                summary.cancelled = true;
            } else {
                let mut captioner = captioner.lock().unwrap_or_else(PoisonError::into_inner);
                caption_image(
                    &mut *captioner,
                    model,
                    &image_path,
                    &mut summary.report,
                    &mut observer,
                );
            }

            observer.on_done(&summary);
            finished.store(true, Ordering::SeqCst);
            let _ = done_tx.send(summary);
        });

        handle
    }
}

/// Generates and saves one caption, recording the outcome.
fn caption_image<C, O>(
    captioner: &mut C,
    model: CaptionModel,
    image_path: &Path,
    report: &mut BatchReport,
    observer: &mut O,
) where
    C: Captioner + ?Sized,
    O: CaptionObserver,
{
    let result = captioner
        .caption(model, image_path)
        .map_err(|source| AppError::CaptionGeneration {
            path: image_path.to_path_buf(),
            source,
        })
        .and_then(|caption| {
            caption_store::write_caption(image_path, &caption)?;
            Ok(caption)
        });

    match result {
        Ok(caption) => {
            debug!("Caption for {}: {}", image_path.format_for_log(), caption);
            observer.on_caption_ready(image_path, &caption);
            report.record_success();
        }
        Err(e) => {
            observer.on_failure(image_path, &e);
            report.record_failure(image_path.to_path_buf(), e);
        }
    }
}

fn run_batch<C, O>(
    captioner: &mut C,
    model: CaptionModel,
    images: &[PathBuf],
    cancel: &AtomicBool,
    observer: &mut O,
) -> CaptionSummary
where
    C: Captioner + ?Sized,
    O: CaptionObserver,
{
    let mut summary = CaptionSummary {
        total: images.len(),
        ..CaptionSummary::default()
    };

    for (index, image_path) in images.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            info!("Caption task cancelled after {} images", index);
            summary.cancelled = true;
            break;
        }
        caption_image(captioner, model, image_path, &mut summary.report, observer);
        observer.on_progress(index + 1, summary.total);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc::Sender;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq)]
    enum Event {
        Ready(PathBuf, String),
        Failed(PathBuf),
        Progress(usize, usize),
        Done(usize, usize, bool),
    }

    struct Recorder(Sender<Event>);

    impl CaptionObserver for Recorder {
        fn on_caption_ready(&mut self, image_path: &Path, caption: &str) {
            let _ = self
                .0
                .send(Event::Ready(image_path.to_path_buf(), caption.to_string()));
        }
        fn on_failure(&mut self, image_path: &Path, _error: &AppError) {
            let _ = self.0.send(Event::Failed(image_path.to_path_buf()));
        }
        fn on_progress(&mut self, completed: usize, total: usize) {
            let _ = self.0.send(Event::Progress(completed, total));
        }
        fn on_done(&mut self, summary: &CaptionSummary) {
            let _ = self.0.send(Event::Done(
                summary.report.processed,
                summary.report.failure_count(),
                summary.cancelled,
            ));
        }
    }

    /// Captions with the file stem; fails for stems starting with "bad".
    struct StemCaptioner {
        delay: Duration,
    }

    impl Captioner for StemCaptioner {
        fn caption(
            &mut self,
            model: CaptionModel,
            image_path: &Path,
        ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
            std::thread::sleep(self.delay);
            let stem = image_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if stem.starts_with("bad") {
                return Err("model exploded".into());
            }
            Ok(format!("{} by {}", stem, model))
        }
    }

    fn service(delay_ms: u64) -> CaptionService<StemCaptioner> {
        CaptionService::new(StemCaptioner {
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[test]
    fn model_names_parse() {
        assert_eq!("VIT-GPT2".parse::<CaptionModel>().unwrap(), CaptionModel::VitGpt2);
        assert_eq!("blip".parse::<CaptionModel>().unwrap(), CaptionModel::Blip);
        assert_eq!(CaptionModel::Blip.to_string(), "BLIP");
        assert!(matches!(
            "clip".parse::<CaptionModel>(),
            Err(AppError::UnknownModel(_))
        ));
    }

    #[test]
    fn bulk_run_emits_events_in_order_and_saves_captions() {
        let dir = TempDir::new().unwrap();
        let images: Vec<PathBuf> = ["cat.png", "bad.png", "dog.png"]
            .iter()
            .map(|name| dir.path().join(name))
            .collect();

        let (tx, rx) = mpsc::channel();
        let handle = service(0)
            .caption_all(CaptionModel::Blip, images.clone(), Recorder(tx))
            .unwrap();
        let summary = handle.wait().unwrap();

        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                Event::Ready(images[0].clone(), "cat by BLIP".into()),
                Event::Progress(1, 3),
                Event::Failed(images[1].clone()),
                Event::Progress(2, 3),
                Event::Ready(images[2].clone(), "dog by BLIP".into()),
                Event::Progress(3, 3),
                Event::Done(2, 1, false),
            ]
        );
        assert_eq!(summary.total, 3);
        assert!(matches!(
            summary.report.failures[0].1,
            AppError::CaptionGeneration { .. }
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("dog.txt")).unwrap(),
            "dog by BLIP"
        );
        assert!(!dir.path().join("bad.txt").exists());
    }

    #[test]
    fn second_bulk_run_is_rejected_while_busy() {
        let dir = TempDir::new().unwrap();
        let images = vec![dir.path().join("a.png"), dir.path().join("b.png")];
        let service = service(100);

        let (tx, _rx) = mpsc::channel();
        let first = service
            .caption_all(CaptionModel::VitGpt2, images.clone(), Recorder(tx.clone()))
            .unwrap();
        assert!(service.is_busy());
        assert!(matches!(
            service.caption_all(CaptionModel::VitGpt2, images, Recorder(tx)),
            Err(AppError::CaptionTaskBusy)
        ));

        first.wait().unwrap();
        assert!(!service.is_busy());
    }

    #[test]
    fn cancel_stops_before_next_image() {
        let dir = TempDir::new().unwrap();
        let images: Vec<PathBuf> = (0..20)
            .map(|i| dir.path().join(format!("img{}.png", i)))
            .collect();

        let (tx, rx) = mpsc::channel();
        let handle = service(20)
            .caption_all(CaptionModel::Blip, images, Recorder(tx))
            .unwrap();
        handle.cancel();
        let summary = handle.wait().unwrap();

        assert!(summary.cancelled);
        assert!(summary.report.processed < 20);
        let events: Vec<Event> = rx.try_iter().collect();
        assert!(matches!(events.last(), Some(Event::Done(_, 0, true))));
    }

    #[test]
    fn failed_caption_write_counts_as_failure_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let images: Vec<PathBuf> = ["cat.png", "dog.png"]
            .iter()
            .map(|name| dir.path().join(name))
            .collect();
        // a directory where cat's caption file should go
        fs::create_dir(dir.path().join("cat.txt")).unwrap();

        let (tx, rx) = mpsc::channel();
        let handle = service(0)
            .caption_all(CaptionModel::Blip, images.clone(), Recorder(tx))
            .unwrap();
        let summary = handle.wait().unwrap();

        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                Event::Failed(images[0].clone()),
                Event::Progress(1, 2),
                Event::Ready(images[1].clone(), "dog by BLIP".into()),
                Event::Progress(2, 2),
                Event::Done(1, 1, false),
            ]
        );
        assert!(matches!(
            &summary.report.failures[0].1,
            AppError::Io { path, .. } if path == &dir.path().join("cat.txt")
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("dog.txt")).unwrap(),
            "dog by BLIP"
        );
    }

    #[test]
    fn single_image_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("bad_owl.jpg");

        let (tx, rx) = mpsc::channel();
        let handle = service(0).caption_one(CaptionModel::VitGpt2, image.clone(), Recorder(tx));
        let summary = handle.wait().unwrap();

        assert_eq!(summary.report.processed, 0);
        assert_eq!(summary.report.failure_count(), 1);
        match &summary.report.failures[0].1 {
            AppError::CaptionGeneration { path, source } => {
                assert_eq!(path, &image);
                assert_eq!(source.to_string(), "model exploded");
            }
            other => panic!("unexpected {:?}", other),
        }
        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![Event::Failed(image.clone()), Event::Done(0, 1, false)]
        );
        assert!(!dir.path().join("bad_owl.txt").exists());
    }

    #[test]
    fn single_image_has_no_progress_events() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("owl.jpg");

        let (tx, rx) = mpsc::channel();
        let handle = service(0).caption_one(CaptionModel::VitGpt2, image.clone(), Recorder(tx));
        let summary = handle.wait().unwrap();

        assert_eq!(summary.report.processed, 1);
        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                Event::Ready(image.clone(), "owl by VIT-GPT2".into()),
                Event::Done(1, 0, false),
            ]
        );
        assert_eq!(
            caption_store::read_caption(&image).unwrap(),
            "owl by VIT-GPT2"
        );
    }
}
