use super::fixtures::{Fixture, TEMPLATES, write_source};
use crate::watermark::batch::requests_for;
use crate::watermark::metadata::{MetadataProvider, MetadataRecord};
use crate::watermark::{
    BatchDriver, CacheService, Compositor, CompositorOptions, ConfiguredLogos, MetadataError,
    RenderRequest, TemplateRegistry, WorkerPool, collect_images,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pool_never_exceeds_capacity() {
    let pool = WorkerPool::new(3);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));

    for _ in 0..12 {
        let running = running.clone();
        let peak = peak.clone();
        let finished = finished.clone();
        pool.submit(move || {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            running.fetch_sub(1, Ordering::SeqCst);
            finished.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();
    }
    pool.wait_idle().await.unwrap();

    assert_eq!(finished.load(Ordering::SeqCst), 12);
    let peak = peak.load(Ordering::SeqCst);
    assert!((1..=3).contains(&peak), "peak concurrency {}", peak);
    assert_eq!(pool.available(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submit_waits_for_free_slot() {
    let pool = WorkerPool::new(1);
    let (release, gate) = std::sync::mpsc::channel::<()>();

    pool.submit(move || {
        let _ = gate.recv();
    })
    .await
    .unwrap();
    assert_eq!(pool.available(), 0);

    let blocked = tokio::time::timeout(Duration::from_millis(50), pool.submit(|| {})).await;
    assert!(blocked.is_err());

    release.send(()).unwrap();
    pool.wait_idle().await.unwrap();
    assert_eq!(pool.available(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_task_releases_slot() {
    let pool = WorkerPool::new(2);
    pool.submit(|| panic!("task blew up")).await.unwrap();
    pool.wait_idle().await.unwrap();
    assert_eq!(pool.available(), 2);
}

#[test]
fn test_zero_capacity_rounds_up() {
    assert_eq!(WorkerPool::new(0).capacity(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_run_reports_in_submission_order() {
    let fixture = Fixture::camera();
    let mut sources = Vec::new();
    for i in 0..4 {
        sources.push(write_source(fixture.dir.path(), &format!("img_{}.jpg", i), 64, 48));
    }
    let out_dir = fixture.dir.path().join("batch");
    let mut requests = requests_for(&sources, &out_dir, "left").unwrap();
    requests.insert(
        2,
        RenderRequest::new(fixture.dir.path().join("missing.jpg"), out_dir.join("missing.jpg"), "left"),
    );

    let compositor = Arc::new(fixture.compositor);
    let driver = BatchDriver::new(compositor, 2);
    let report = driver.run(requests).await.unwrap();

    assert_eq!(report.results.len(), 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed, 1);
    assert!(report.results[2].error.is_some());
    assert!(report.results[0].save_path.ends_with("img_0.jpg"));
    assert!(report.results[4].save_path.ends_with("img_3.jpg"));
    for i in 0..4 {
        assert!(out_dir.join(format!("img_{}.jpg", i)).exists());
    }

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["succeeded"], 4);
    assert!(json["elapsed"].is_f64());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fire_and_forget_submit() {
    let fixture = Fixture::camera();
    let save = fixture.output("ff.jpg");
    let request = RenderRequest::new(&fixture.source, &save, "left");
    let driver = BatchDriver::new(Arc::new(fixture.compositor), 1);

    driver.submit(request).await.unwrap();
    driver.pool().wait_idle().await.unwrap();
    assert!(save.exists());
}

#[test]
fn test_collect_images_walks_directories() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "b.jpg", 4, 4);
    write_source(dir.path(), "a.JPEG", 4, 4);
    std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_source(&dir.path().join("nested"), "c.png", 4, 4);

    let single = dir.path().join("b.jpg");
    let found = collect_images(&[dir.path().to_path_buf(), single]);

    let names: Vec<PathBuf> = found
        .iter()
        .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        names,
        vec![
            PathBuf::from("a.JPEG"),
            PathBuf::from("b.jpg"),
            PathBuf::from("nested/c.png"),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_same_file_names_in_sibling_directories() {
    let fixture = Fixture::camera();
    let root = fixture.dir.path().join("cards");
    for card in ["card1", "card2"] {
        std::fs::create_dir_all(root.join(card)).unwrap();
        write_source(&root.join(card), "DSC_0001.jpg", 64, 48);
    }

    let sources = collect_images(&[root.clone()]);
    assert_eq!(sources.len(), 2);
    let out_dir = fixture.dir.path().join("out");
    let requests = requests_for(&sources, &out_dir, "left").unwrap();
    assert_eq!(requests[0].save_path, out_dir.join("card1/DSC_0001.jpg"));
    assert_eq!(requests[1].save_path, out_dir.join("card2/DSC_0001.jpg"));

    let driver = BatchDriver::new(Arc::new(fixture.compositor), 2);
    let report = driver.run(requests).await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_ne!(report.results[0].save_path, report.results[1].save_path);
    assert!(out_dir.join("card1/DSC_0001.jpg").exists());
    assert!(out_dir.join("card2/DSC_0001.jpg").exists());
}

#[test]
fn test_single_directory_keeps_flat_names() {
    let dir = TempDir::new().unwrap();
    let a = write_source(dir.path(), "a.jpg", 4, 4);
    let b = write_source(dir.path(), "b.jpg", 4, 4);
    let out_dir = dir.path().join("out");

    let requests = requests_for(&[a, b], &out_dir, "left").unwrap();
    assert_eq!(requests[0].save_path, out_dir.join("a.jpg"));
    assert_eq!(requests[1].save_path, out_dir.join("b.jpg"));
}

#[test]
fn test_duplicate_sources_are_rejected() {
    let dir = TempDir::new().unwrap();
    let a = write_source(dir.path(), "a.jpg", 4, 4);

    let result = requests_for(&[a.clone(), a], &dir.path().join("out"), "left");
    assert!(result.is_err());
}

struct PanickingProvider;

impl MetadataProvider for PanickingProvider {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn extract(&self, _path: &Path) -> Result<MetadataRecord, MetadataError> {
        panic!("metadata reader crashed");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_render_counts_as_failure() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(TemplateRegistry::new());
    registry.load_from_str(TEMPLATES).unwrap();
    let compositor = Compositor::new(
        registry,
        Arc::new(CacheService::new(Arc::new(PanickingProvider))),
        Arc::new(ConfiguredLogos::new(Vec::new())),
        CompositorOptions::default(),
    );
    let sources = vec![
        write_source(dir.path(), "a.jpg", 8, 8),
        write_source(dir.path(), "b.jpg", 8, 8),
    ];
    let requests = requests_for(&sources, &dir.path().join("out"), "left").unwrap();

    let driver = BatchDriver::new(Arc::new(compositor), 2);
    let report = driver.run(requests).await.unwrap();

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 2);
    assert!(report.results.iter().all(|r| r.error.is_some()));
    assert!(report.results[0].source_path.ends_with("a.jpg"));
    assert_eq!(driver.pool().available(), 2);
}
