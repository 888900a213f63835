//! Background retrieval of tile images on a worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;

use geode_tiles::TileKey;

use crate::{FetchError, ImageryError, ResourceLoader, TileImage};

struct FetchTask {
    key: TileKey,
    url: String,
    cancelled: Arc<AtomicBool>,
}

/// The result of one dispatched fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    pub key: TileKey,
    pub url: String,
    pub result: Result<TileImage, FetchError>,
}

/// Lets the caller abandon a dispatched fetch.
///
/// Workers check the flag before fetching and again before delivering, so a
/// cancelled fetch reports [`FetchError::Cancelled`] instead of an image.
#[derive(Clone, Debug)]
pub struct FetchHandle {
    key: TileKey,
    cancelled: Arc<AtomicBool>,
}

impl FetchHandle {
    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Worker pool that fetches and decodes tile images off the frame thread.
///
/// Dispatch is non-blocking; outcomes are collected once per frame with
/// [`Retriever::drain_completed`].
pub struct Retriever {
    task_sender: Option<crossbeam_channel::Sender<FetchTask>>,
    result_receiver: crossbeam_channel::Receiver<FetchOutcome>,
    worker_handles: Vec<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl Retriever {
    pub fn new(worker_count: usize, loader: Arc<dyn ResourceLoader>) -> Result<Self, ImageryError> {
        let (task_tx, task_rx) = crossbeam_channel::unbounded::<FetchTask>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count.max(1));
        for index in 0..worker_count.max(1) {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let loader = Arc::clone(&loader);
            let flight = Arc::clone(&in_flight);

            let handle = std::thread::Builder::new()
                .name(format!("geode-retriever-{index}"))
                .spawn(move || {
                    while let Ok(task) = rx.recv() {
                        let result = run_task(loader.as_ref(), &task);
                        flight.fetch_sub(1, Ordering::Relaxed);
                        let _ = tx.send(FetchOutcome {
                            key: task.key,
                            url: task.url,
                            result,
                        });
                    }
                })
                .map_err(ImageryError::Spawn)?;
            handles.push(handle);
        }
        tracing::debug!(workers = handles.len(), "started retriever");

        Ok(Self {
            task_sender: Some(task_tx),
            result_receiver: result_rx,
            worker_handles: handles,
            in_flight,
        })
    }

    /// Queue a fetch. Returns `None` after shutdown.
    pub fn dispatch(&self, key: TileKey, url: String) -> Option<FetchHandle> {
        let sender = self.task_sender.as_ref()?;
        let cancelled = Arc::new(AtomicBool::new(false));
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let task = FetchTask {
            key,
            url,
            cancelled: Arc::clone(&cancelled),
        };
        if sender.send(task).is_err() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return None;
        }
        Some(FetchHandle { key, cancelled })
    }

    /// Collect every outcome delivered since the last call.
    pub fn drain_completed(&self) -> Vec<FetchOutcome> {
        self.result_receiver.try_iter().collect()
    }

    /// Fetches dispatched but not yet finished by a worker.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn shutdown(&mut self) {
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for Retriever {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_task(loader: &dyn ResourceLoader, task: &FetchTask) -> Result<TileImage, FetchError> {
    if task.cancelled.load(Ordering::Relaxed) {
        return Err(FetchError::Cancelled);
    }
    let bytes = loader.fetch(&task.url)?;
    let image = TileImage::decode(&task.url, &bytes)?;
    if task.cancelled.load(Ordering::Relaxed) {
        return Err(FetchError::Cancelled);
    }
    Ok(image)
}
