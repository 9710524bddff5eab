use dupescout::duplicates::{get_results, spawn_stream, SearchConfig};
use dupescout::scanner::KeyError;
use dupescout::signal::ShutdownHandler;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_interrupt_during_search_stops_key_generation() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        fs::write(dir.path().join(format!("{:02}.txt", i)), "same").unwrap();
    }

    let shutdown = ShutdownHandler::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let interrupter = shutdown.clone();
    let counter = Arc::clone(&calls);
    let config = SearchConfig::new([dir.path()])
        .with_key_generator(move |_: &Path| -> Result<String, KeyError> {
            counter.fetch_add(1, Ordering::SeqCst);
            interrupter.request_shutdown();
            Ok("same".to_string())
        })
        .with_workers(1)
        .with_shutdown_handler(shutdown.clone())
        .with_signal_handling(false);

    let results = get_results(config).unwrap();

    assert!(shutdown.is_shutdown_requested());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.is_empty());
}

#[test]
fn test_interrupt_before_start_returns_empty() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "same").unwrap();
    fs::write(dir.path().join("b.txt"), "same").unwrap();

    let shutdown = ShutdownHandler::new();
    shutdown.request_shutdown();

    let config = SearchConfig::new([dir.path()])
        .with_shutdown_handler(shutdown)
        .with_signal_handling(false);

    assert!(get_results(config).unwrap().is_empty());
}

#[test]
fn test_interrupted_stream_closes_without_error() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        fs::write(dir.path().join(format!("{:02}.txt", i)), "same").unwrap();
    }

    let shutdown = ShutdownHandler::new();
    let interrupter = shutdown.clone();
    let config = SearchConfig::new([dir.path()])
        .with_key_generator(move |_: &Path| -> Result<String, KeyError> {
            interrupter.request_shutdown();
            Ok("same".to_string())
        })
        .with_workers(1)
        .with_shutdown_handler(shutdown)
        .with_signal_handling(false);

    let (dupes, handle) = spawn_stream(config);
    assert_eq!(dupes.iter().count(), 0);
    handle.join().unwrap().unwrap();
}

#[test]
fn test_search_with_signal_subscription_completes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "same").unwrap();
    fs::write(dir.path().join("b.txt"), "same").unwrap();

    let shutdown = ShutdownHandler::new();
    let config = SearchConfig::new([dir.path()]).with_shutdown_handler(shutdown.clone());

    assert_eq!(get_results(config).unwrap().len(), 2);
    assert!(!shutdown.is_shutdown_requested());
}
