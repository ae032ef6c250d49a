use super::compositor::Compositor;
use super::{RenderRequest, RenderResult, WatermarkError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Fixed number of slots. Submitting waits for a free slot instead of
/// queueing, and a slot is released when its task ends, panics included.
pub struct WorkerPool {
    capacity: usize,
    slots: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a slot, then run `task` on the blocking thread pool.
    pub async fn submit<F>(&self, task: F) -> Result<(), WatermarkError>
    where
        F: FnOnce() + Send + 'static,
    {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| WatermarkError::Task(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task();
        });
        Ok(())
    }

    /// Wait until every slot is free again.
    pub async fn wait_idle(&self) -> Result<(), WatermarkError> {
        let all = self
            .slots
            .acquire_many(self.capacity as u32)
            .await
            .map_err(|e| WatermarkError::Task(e.to_string()))?;
        drop(all);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<RenderResult>,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Feeds render requests through a [`WorkerPool`].
pub struct BatchDriver {
    compositor: Arc<Compositor>,
    pool: WorkerPool,
}

impl BatchDriver {
    pub fn new(compositor: Arc<Compositor>, max_workers: usize) -> Self {
        Self {
            compositor,
            pool: WorkerPool::new(max_workers),
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Fire and forget: failures are only logged.
    pub async fn submit(&self, request: RenderRequest) -> Result<(), WatermarkError> {
        let compositor = self.compositor.clone();
        self.pool
            .submit(move || {
                let result = compositor.render(&request);
                if let Some(error) = &result.error {
                    warn!("Batch item {:?} failed: {}", request.source_path, error);
                }
            })
            .await
    }

    /// Render every request and collect the results in submission order.
    pub async fn run(&self, requests: Vec<RenderRequest>) -> Result<BatchReport, WatermarkError> {
        let started = Instant::now();
        let total = requests.len();
        let sink: Arc<Mutex<Vec<(usize, RenderResult)>>> =
            Arc::new(Mutex::new(Vec::with_capacity(total)));

        info!(
            "Starting batch of {} images with {} workers",
            total,
            self.pool.capacity()
        );

        for (index, request) in requests.into_iter().enumerate() {
            let compositor = self.compositor.clone();
            let sink = sink.clone();
            self.pool
                .submit(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| compositor.render(&request)))
                        .unwrap_or_else(|_| {
                            let mut failed = RenderResult::failure("render task panicked");
                            failed.source_path = request.source_path.to_string_lossy().to_string();
                            failed
                        });
                    if let Some(error) = &result.error {
                        warn!("Batch item {:?} failed: {}", request.source_path, error);
                    }
                    sink.lock().push((index, result));
                })
                .await?;
            debug!("Submitted batch item {}/{}", index + 1, total);
        }
        self.pool.wait_idle().await?;

        let mut collected = std::mem::take(&mut *sink.lock());
        collected.sort_by_key(|(index, _)| *index);
        let results: Vec<RenderResult> = collected.into_iter().map(|(_, r)| r).collect();
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        // an item missing from the sink counts as failed
        let failed = total - succeeded;
        let elapsed = started.elapsed();

        info!(
            "Batch finished: {} succeeded, {} failed in {:.2}s",
            succeeded,
            failed,
            elapsed.as_secs_f64()
        );
        Ok(BatchReport {
            results,
            succeeded,
            failed,
            elapsed,
        })
    }
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
        .unwrap_or(false)
}

/// Expand files and directories into a sorted list of JPEG and PNG paths.
pub fn collect_images(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && is_supported_image(entry.path()) {
                    found.push(entry.path().to_path_buf());
                }
            }
        } else if is_supported_image(input) {
            found.push(input.clone());
        } else {
            debug!("Skipping non-image input {:?}", input);
        }
    }
    found.sort();
    found.dedup();
    found
}

/// Deepest directory containing every source.
fn common_root(sources: &[PathBuf]) -> Option<PathBuf> {
    let mut parents = sources.iter().filter_map(|s| s.parent());
    let mut root = parents.next()?.to_path_buf();
    for parent in parents {
        while !parent.starts_with(&root) {
            root = root.parent()?.to_path_buf();
        }
    }
    Some(root)
}

/// Requests writing each source into `output_dir`, keeping its path below
/// the deepest directory shared by all sources. Two sources that would land
/// on the same save path are rejected.
pub fn requests_for(
    sources: &[PathBuf],
    output_dir: &Path,
    template_id: &str,
) -> Result<Vec<RenderRequest>, WatermarkError> {
    let root = common_root(sources);
    let mut targets = HashSet::with_capacity(sources.len());
    let mut requests = Vec::with_capacity(sources.len());

    for source in sources {
        let relative = root
            .as_deref()
            .and_then(|root| source.strip_prefix(root).ok())
            .filter(|rel| rel.file_name().is_some());
        let request = match relative {
            Some(rel) => RenderRequest::new(source.clone(), output_dir.join(rel), template_id),
            None => RenderRequest::preview(source.clone(), output_dir, template_id)?,
        };
        if !targets.insert(request.save_path.clone()) {
            return Err(WatermarkError::InvalidRequest(format!(
                "{:?} would overwrite another output at {:?}",
                source, request.save_path
            )));
        }
        requests.push(request);
    }
    Ok(requests)
}
