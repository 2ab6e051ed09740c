//! Pinwall Replay
//!
//! Runs a scripted input session against the canvas core without a window and
//! prints the resulting objects and viewport as JSON.
//!
//! ```text
//! pinwall-replay <scene.json> <script.json> [config.json]
//! ```

mod script;

use kurbo::Point;
use pinwall_core::input::{Duration, Instant};
use pinwall_core::{
    Canvas, CanvasConfig, CanvasError, CanvasEvent, CanvasObject, FileIngest, GestureDispatcher,
    MemoryStore, ObjectId, ObjectStore, Viewport, flush_commands,
};
use script::{Action, Scene, Step};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("usage: pinwall-replay <scene.json> <script.json> [config.json]")]
    Usage,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("store error: {0}")]
    Store(#[from] pinwall_core::StoreError),
}

/// Final state printed after the script ran.
#[derive(Debug, Serialize)]
pub struct Report {
    pub viewport: Viewport,
    pub selection: Vec<ObjectId>,
    pub objects: Vec<CanvasObject>,
    pub events: Vec<CanvasEvent>,
    pub dropped: Vec<DroppedFiles>,
    pub store_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedFiles {
    pub files: Vec<PathBuf>,
    pub world: Point,
}

/// Records drops instead of loading them.
struct DropRecorder(Arc<Mutex<Vec<DroppedFiles>>>);

impl FileIngest for DropRecorder {
    fn ingest_files(&mut self, files: Vec<PathBuf>, world: Point) {
        log::info!("Received {} dropped files at ({}, {})", files.len(), world.x, world.y);
        match self.0.lock() {
            Ok(mut dropped) => dropped.push(DroppedFiles { files, world }),
            Err(e) => log::error!("Drop log poisoned: {}", e),
        }
    }
}

/// A canvas, its dispatcher and a backing store driven by script time.
pub struct Replay {
    canvas: Canvas,
    dispatcher: GestureDispatcher,
    store: MemoryStore,
    inbox: Arc<Mutex<Vec<Vec<CanvasObject>>>>,
    dropped: Arc<Mutex<Vec<DroppedFiles>>>,
    events: Vec<CanvasEvent>,
    start: Instant,
    store_failures: usize,
}

impl Replay {
    pub fn new(scene: Scene, config: CanvasConfig) -> Result<Self, ReplayError> {
        let mut canvas = Canvas::new(config)?;
        if let Some((width, height)) = scene.viewport_size {
            canvas.set_viewport_size(width, height);
        }
        if let Some(viewport) = scene.viewport {
            canvas.set_viewport(viewport);
        }

        let store = MemoryStore::with_objects(scene.objects);
        canvas.load_objects(store.objects()?)?;

        let inbox = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inbox);
        store.subscribe(Box::new(move |objects: &[CanvasObject]| {
            if let Ok(mut inbox) = sink.lock() {
                inbox.push(objects.to_vec());
            }
        }));

        let dropped = Arc::new(Mutex::new(Vec::new()));
        let dispatcher =
            GestureDispatcher::new().with_ingest(Box::new(DropRecorder(Arc::clone(&dropped))));

        Ok(Self {
            canvas,
            dispatcher,
            store,
            inbox,
            dropped,
            events: Vec::new(),
            start: Instant::now(),
            store_failures: 0,
        })
    }

    /// Run every step in order.
    pub fn run(&mut self, steps: &[Step]) -> Result<(), ReplayError> {
        for step in steps {
            self.step(step)?;
        }
        Ok(())
    }

    fn step(&mut self, step: &Step) -> Result<(), ReplayError> {
        let now = self.start + Duration::from_millis(step.at_ms);
        self.service_frame(now);

        if let Some(event) = step.action.to_input(now) {
            self.dispatcher.handle(&mut self.canvas, event);
        } else {
            match &step.action {
                Action::Tick => self.dispatcher.tick(&mut self.canvas, now),
                Action::FlyTo { x, y, scale } => {
                    self.canvas.fly_to(*x, *y, *scale, now);
                }
                Action::ZoomToFit => {
                    if self.canvas.zoom_to_fit(now).is_none() {
                        log::warn!("Zoom to fit on an empty canvas");
                    }
                }
                Action::Select { ids } => self.canvas.set_selection(ids)?,
                Action::Align { kind } => {
                    if let Err(e) = self.canvas.apply_alignment(*kind) {
                        log::warn!("Alignment skipped: {}", e);
                    }
                }
                Action::DeleteSelection => {
                    self.canvas.delete_selected();
                }
                _ => {}
            }
        }

        self.flush();
        self.events.extend(self.canvas.take_events());
        Ok(())
    }

    /// Run the pending frame, if any, at `now`.
    fn service_frame(&mut self, now: Instant) {
        if let Some(frame) = self.canvas.pending_frame() {
            self.dispatcher.frame(&mut self.canvas, frame, now);
        }
    }

    /// Send queued commands to the store, then apply the newest snapshot it
    /// published.
    fn flush(&mut self) {
        let commands = self.canvas.take_commands();
        if commands.is_empty() {
            return;
        }
        let failures = block_on(flush_commands(&self.store, commands));
        self.store_failures += failures.len();

        let latest = match self.inbox.lock() {
            Ok(mut inbox) => inbox.drain(..).last(),
            Err(_) => None,
        };
        if let Some(snapshot) = latest {
            let active = self.dispatcher.active_objects();
            if let Err(e) = self.canvas.apply_remote_objects(snapshot, &active) {
                log::warn!("Store snapshot rejected: {}", e);
            }
        }
    }

    pub fn report(self) -> Result<Report, ReplayError> {
        let dropped = self
            .dropped
            .lock()
            .map(|dropped| dropped.clone())
            .unwrap_or_default();
        Ok(Report {
            viewport: self.canvas.get_viewport(),
            selection: self.canvas.selection().ids(),
            objects: self.store.objects()?,
            events: self.events,
            dropped,
            store_failures: self.store_failures,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReplayError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ReplayError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn run(args: &[String]) -> Result<Report, ReplayError> {
    let (scene_path, script_path) = match args {
        [scene, script] | [scene, script, _] => (Path::new(scene), Path::new(script)),
        _ => return Err(ReplayError::Usage),
    };
    let config = match args.get(2) {
        Some(path) => {
            let path = Path::new(path);
            let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            CanvasConfig::from_json(&text)?
        }
        None => CanvasConfig::default(),
    };
    let scene: Scene = read_json(scene_path)?;
    let steps: Vec<Step> = read_json(script_path)?;
    log::info!("Replaying {} steps over {} objects", steps.len(), scene.objects.len());

    let mut replay = Replay::new(scene, config)?;
    replay.run(&steps)?;
    replay.report()
}

/// Drive a future to completion on the current thread.
fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    // SAFETY: the vtable functions ignore the data pointer.
    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);
    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting pinwall replay");

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Failed to serialize report: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
