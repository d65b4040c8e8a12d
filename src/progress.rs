use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::throttle::Throttle;

/// Slice index used by single-stream downloads.
pub const SINGLE_SLICE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub downloaded: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(downloaded: u64, total: u64) -> Self {
        Self { downloaded, total }
    }

    /// Fraction downloaded in `0.0..=1.0`; `0.0` while the total is unknown.
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.downloaded as f32 / self.total as f32
        }
    }
}

/// One slice's current progress.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceProgress {
    pub url: String,
    pub progress: Progress,
    pub slice_index: usize,
}

impl SliceProgress {
    pub fn new(url: impl Into<String>, progress: Progress, slice_index: usize) -> Self {
        Self {
            url: url.into(),
            progress,
            slice_index,
        }
    }

    pub fn single(url: impl Into<String>, progress: Progress) -> Self {
        Self::new(url, progress, SINGLE_SLICE)
    }
}

/// Last-known progress of every slice of one download.
#[derive(Debug)]
pub struct ProgressState {
    slices: Mutex<HashMap<usize, Progress>>,
    total: u64,
}

impl ProgressState {
    pub fn new(total: u64) -> Self {
        Self {
            slices: Mutex::new(HashMap::new()),
            total,
        }
    }

    pub async fn put(&self, slice_index: usize, progress: Progress) {
        self.slices.lock().await.insert(slice_index, progress);
    }

    /// Aggregate over the current snapshot, measured against the probed size.
    pub async fn get(&self) -> Progress {
        let slices = self.slices.lock().await;
        let downloaded = slices.values().map(|p| p.downloaded).sum();
        Progress::new(downloaded, self.total)
    }
}

/// Handle given to slice tasks: records into the shared state, then offers
/// the value to the throttled channel.
#[derive(Clone)]
pub struct ProgressReporter {
    state: Arc<ProgressState>,
    throttle: Throttle<SliceProgress>,
}

impl ProgressReporter {
    pub fn new(state: Arc<ProgressState>, throttle: Throttle<SliceProgress>) -> Self {
        Self { state, throttle }
    }

    pub async fn report(&self, slice: SliceProgress) {
        self.state.put(slice.slice_index, slice.progress).await;
        self.throttle.try_emit(slice);
    }
}
