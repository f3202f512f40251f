//! Threaded asset backend
//!
//! Decodes assets on a pool of worker threads so `load` never blocks the
//! tick thread. Requests go out over one channel and completions come back
//! over another; the cache drains them through
//! [`AssetBackend::poll_completed`] at the start of every tick.
//!
//! Loads the cache abandoned are still decoded; their completions are
//! released by the cache when they arrive.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::backend::{AssetBackend, LoadCompletion, LoadOutcome, LoadRequest};
use crate::error::AssetError;

/// Turns an asset source into a loaded asset. Runs on worker threads.
pub trait AssetDecoder: Send + Sync + 'static {
    /// Decoded asset type
    type Asset: Send + 'static;

    /// Decode the asset stored at `source`
    fn decode(&self, source: &Path) -> Result<Self::Asset, AssetError>;
}

/// [`AssetBackend`] that decodes on background threads
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use thumbgrid_cache::{AssetDecoder, AssetError, ThreadedBackend};
///
/// struct FileSize;
///
/// impl AssetDecoder for FileSize {
///     type Asset = u64;
///
///     fn decode(&self, source: &Path) -> Result<u64, AssetError> {
///         Ok(std::fs::metadata(source)?.len())
///     }
/// }
///
/// let backend = ThreadedBackend::new(FileSize, 2).unwrap();
/// assert_eq!(backend.num_workers(), 2);
/// ```
pub struct ThreadedBackend<D: AssetDecoder> {
    jobs: Option<Sender<LoadRequest>>,
    results: Receiver<LoadCompletion<D::Asset>>,
    workers: Vec<JoinHandle<()>>,
    in_flight: usize,
    released: u64,
}

impl<D: AssetDecoder> ThreadedBackend<D> {
    /// Start `num_workers` decode threads (at least one).
    ///
    /// # Errors
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(decoder: D, num_workers: usize) -> io::Result<Self> {
        let decoder = Arc::new(decoder);
        let (job_tx, job_rx) = unbounded::<LoadRequest>();
        let (result_tx, result_rx) = unbounded();

        let num_workers = num_workers.max(1);
        let mut workers = Vec::with_capacity(num_workers);
        for id in 0..num_workers {
            let decoder = Arc::clone(&decoder);
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let worker = thread::Builder::new()
                .name(format!("thumbgrid-decode-worker-{id}"))
                .spawn(move || Self::run(decoder, jobs, results))?;
            workers.push(worker);
        }
        log::debug!("started {num_workers} decode workers");

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            workers,
            in_flight: 0,
            released: 0,
        })
    }

    /// Worker loop: decode until the request channel closes
    fn run(
        decoder: Arc<D>,
        jobs: Receiver<LoadRequest>,
        results: Sender<LoadCompletion<D::Asset>>,
    ) {
        for request in jobs.iter() {
            let result = decoder.decode(&request.source);
            let completion = LoadCompletion {
                ticket: request.ticket,
                result,
            };
            if results.send(completion).is_err() {
                break;
            }
        }
    }

    /// Number of decode threads
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Loads handed to workers whose completion has not been polled yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Assets released so far
    pub fn released(&self) -> u64 {
        self.released
    }
}

impl<D: AssetDecoder> AssetBackend for ThreadedBackend<D> {
    type Asset = D::Asset;

    fn load(&mut self, request: LoadRequest) -> LoadOutcome<D::Asset> {
        let Some(jobs) = &self.jobs else {
            return LoadOutcome::Failed(AssetError::Disconnected);
        };
        match jobs.send(request) {
            Ok(()) => {
                self.in_flight += 1;
                LoadOutcome::Deferred
            }
            Err(_) => LoadOutcome::Failed(AssetError::Disconnected),
        }
    }

    fn poll_completed(&mut self, completed: &mut Vec<LoadCompletion<D::Asset>>) {
        loop {
            match self.results.try_recv() {
                Ok(completion) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    completed.push(completion);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.in_flight > 0 {
                        log::warn!("decode workers gone with {} loads in flight", self.in_flight);
                    }
                    break;
                }
            }
        }
    }

    fn release(&mut self, asset: D::Asset) {
        drop(asset);
        self.released += 1;
    }
}

impl<D: AssetDecoder> Drop for ThreadedBackend<D> {
    fn drop(&mut self) {
        // Closing the request channel ends every worker loop
        self.jobs.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("decode worker panicked");
            }
        }
    }
}
