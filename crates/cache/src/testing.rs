//! Scripted backend for unit tests

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use crate::backend::{AssetBackend, LoadCompletion, LoadOutcome, LoadRequest};
use crate::error::AssetError;
use crate::item_index::Item;

/// Items `0..count` with sources `/art/{i}.png`
pub(crate) fn items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| Item::new(i.to_string(), format!("Item {i}"), format!("/art/{i}.png")))
        .collect()
}

/// Asset produced by [`MockBackend`]; deliberately not `Clone`
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct MockAsset {
    pub serial: u64,
    pub source: PathBuf,
}

pub(crate) struct MockBackend {
    deferred: bool,
    broken: HashSet<PathBuf>,
    in_flight: Vec<LoadRequest>,
    queued: Vec<LoadCompletion<MockAsset>>,
    released: Rc<RefCell<Vec<MockAsset>>>,
    pub loads: Vec<LoadRequest>,
}

impl MockBackend {
    /// Every load answers synchronously
    pub fn immediate() -> Self {
        Self::new(false)
    }

    /// Every load is deferred until `finish`/`finish_all`
    pub fn deferred() -> Self {
        Self::new(true)
    }

    fn new(deferred: bool) -> Self {
        Self {
            deferred,
            broken: HashSet::new(),
            in_flight: Vec::new(),
            queued: Vec::new(),
            released: Rc::new(RefCell::new(Vec::new())),
            loads: Vec::new(),
        }
    }

    /// Make every load of `source` fail
    pub fn break_source(&mut self, source: &str) {
        self.broken.insert(PathBuf::from(source));
    }

    fn outcome(&self, request: &LoadRequest) -> Result<MockAsset, AssetError> {
        if self.broken.contains(&request.source) {
            Err(AssetError::Decode {
                path: request.source.clone(),
                reason: "corrupt".to_string(),
            })
        } else {
            Ok(MockAsset {
                serial: request.ticket.serial,
                source: request.source.clone(),
            })
        }
    }

    /// Remove the oldest in-flight load for `index` and build its completion
    pub fn take_completion(&mut self, index: usize) -> Option<LoadCompletion<MockAsset>> {
        let position = self
            .in_flight
            .iter()
            .position(|request| request.ticket.index == index)?;
        let request = self.in_flight.remove(position);
        Some(LoadCompletion {
            ticket: request.ticket,
            result: self.outcome(&request),
        })
    }

    /// Queue the completion of the oldest in-flight load for `index`
    pub fn finish(&mut self, index: usize) {
        if let Some(completion) = self.take_completion(index) {
            self.queued.push(completion);
        }
    }

    /// Queue completions for every in-flight load
    pub fn finish_all(&mut self) {
        for request in std::mem::take(&mut self.in_flight) {
            let result = self.outcome(&request);
            self.queued.push(LoadCompletion {
                ticket: request.ticket,
                result,
            });
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Load and release calls so far
    pub fn calls(&self) -> usize {
        self.loads.len() + self.released_count()
    }

    pub fn released_count(&self) -> usize {
        self.released.borrow().len()
    }

    pub fn released_sources(&self) -> Vec<String> {
        self.released
            .borrow()
            .iter()
            .map(|asset| asset.source.display().to_string())
            .collect()
    }

    /// Whether no asset was released twice
    pub fn released_each_once(&self) -> bool {
        let released = self.released.borrow();
        let unique: HashSet<u64> = released.iter().map(|asset| asset.serial).collect();
        unique.len() == released.len()
    }

    /// Shared view of released assets that outlives the backend
    pub fn release_log(&self) -> Rc<RefCell<Vec<MockAsset>>> {
        Rc::clone(&self.released)
    }
}

impl AssetBackend for MockBackend {
    type Asset = MockAsset;

    fn load(&mut self, request: LoadRequest) -> LoadOutcome<MockAsset> {
        self.loads.push(request.clone());
        if self.deferred {
            self.in_flight.push(request);
            return LoadOutcome::Deferred;
        }
        match self.outcome(&request) {
            Ok(asset) => LoadOutcome::Ready(asset),
            Err(err) => LoadOutcome::Failed(err),
        }
    }

    fn poll_completed(&mut self, completed: &mut Vec<LoadCompletion<MockAsset>>) {
        completed.append(&mut self.queued);
    }

    fn release(&mut self, asset: MockAsset) {
        self.released.borrow_mut().push(asset);
    }
}
