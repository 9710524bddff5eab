use dupescout::duplicates::{get_results, spawn_stream, ErrorKind, FinderError, SearchConfig};
use dupescout::scanner::{KeyError, PathFilter, ScanError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

/// Removes `victim` when the walker reaches the sibling directory `trigger`.
///
/// The parent listing already holds `victim`, so reading it fails with
/// NotFound unless the filter prunes it. Works regardless of privileges.
struct VanishingDir {
    trigger: PathBuf,
    victim: PathBuf,
    prune_victim: bool,
}

impl PathFilter for VanishingDir {
    fn should_prune_dir(&self, path: &Path) -> bool {
        if path == self.trigger {
            let _ = fs::remove_dir_all(&self.victim);
        }
        self.prune_victim && path == self.victim
    }

    fn should_skip_file(&self, _path: &Path) -> bool {
        false
    }
}

/// Panics when asked about a file named `b.txt`.
struct PanickingFilter;

impl PathFilter for PanickingFilter {
    fn should_prune_dir(&self, _path: &Path) -> bool {
        false
    }

    fn should_skip_file(&self, path: &Path) -> bool {
        if path.ends_with("b.txt") {
            panic!("filter bug");
        }
        false
    }
}

fn vanishing_tree(prune_victim: bool) -> (tempfile::TempDir, Arc<dyn PathFilter>) {
    let dir = tempdir().unwrap();
    let trigger = dir.path().join("a_first");
    let victim = dir.path().join("b_gone");
    fs::create_dir(&trigger).unwrap();
    fs::create_dir(&victim).unwrap();
    fs::write(victim.join("inside.txt"), "same").unwrap();
    fs::write(dir.path().join("x.txt"), "same").unwrap();
    fs::write(dir.path().join("y.txt"), "same").unwrap();

    let filter: Arc<dyn PathFilter> = Arc::new(VanishingDir {
        trigger,
        victim,
        prune_victim,
    });
    (dir, filter)
}

#[test]
fn test_key_generator_error_aborts_search() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("good.txt"), "x").unwrap();
    fs::write(dir.path().join("bad.txt"), "x").unwrap();

    let config = SearchConfig::new([dir.path()])
        .with_key_generator(|path: &Path| -> Result<String, KeyError> {
            if path.ends_with("bad.txt") {
                Err(KeyError::failed(path, "cannot key this file"))
            } else {
                Ok("k".to_string())
            }
        })
        .with_signal_handling(false);

    let err = get_results(config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyGeneration);
    assert!(err.to_string().contains("cannot key this file"));
}

#[test]
fn test_empty_key_is_configuration_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "x").unwrap();

    let config = SearchConfig::new([dir.path()])
        .with_key_generator(|_: &Path| -> Result<String, KeyError> { Ok(String::new()) })
        .with_signal_handling(false);

    let err = get_results(config).unwrap_err();
    assert!(matches!(err, FinderError::EmptyKey(_)));
    assert!(err.is_configuration());
}

#[test]
fn test_whitespace_key_is_configuration_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "x").unwrap();

    let config = SearchConfig::new([dir.path()])
        .with_key_generator(|_: &Path| -> Result<String, KeyError> { Ok(" \t\n".to_string()) })
        .with_signal_handling(false);

    assert!(get_results(config).unwrap_err().is_configuration());
}

#[test]
fn test_no_roots_rejected() {
    let config = SearchConfig::new(Vec::<PathBuf>::new()).with_signal_handling(false);

    let err = get_results(config).unwrap_err();
    assert!(matches!(err, FinderError::NoRoots));
}

#[test]
fn test_missing_root_is_traversal_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let err = get_results(SearchConfig::new([&missing]).with_signal_handling(false)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Traversal);
    assert!(matches!(err, FinderError::Scan(ScanError::NotFound(_))));
}

#[test]
fn test_stream_error_still_closes_channel() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        fs::write(dir.path().join(format!("{}.txt", i)), "x").unwrap();
    }

    let config = SearchConfig::new([dir.path()])
        .with_key_generator(|path: &Path| -> Result<String, KeyError> {
            Err(KeyError::failed(path, "boom"))
        })
        .with_workers(2)
        .with_signal_handling(false);

    let (dupes, handle) = spawn_stream(config);
    assert_eq!(dupes.iter().count(), 0);

    let err = handle.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyGeneration);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_with_builtin_key() {
    use dupescout::scanner::KeyStrategy;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked.bin");
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let readable = fs::File::open(&locked).is_ok();

    let config = SearchConfig::new([dir.path()])
        .with_key_strategy(KeyStrategy::Full)
        .with_signal_handling(false);
    let result = get_results(config);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    if readable {
        // Privileged users bypass the mode bits; a single file has no duplicate
        assert!(result.unwrap().is_empty());
    } else {
        assert!(matches!(
            result.unwrap_err(),
            FinderError::KeyGeneration(KeyError::PermissionDenied(_))
        ));
    }
}

#[test]
fn test_traversal_error_below_root_is_fatal() {
    let (dir, filter) = vanishing_tree(false);

    let config = SearchConfig::new([dir.path()])
        .with_filter(filter)
        .with_workers(1)
        .with_signal_handling(false);

    let err = get_results(config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Traversal);
    assert!(matches!(err, FinderError::Scan(ScanError::NotFound(_))));
}

#[test]
fn test_traversal_error_in_pruned_directory_is_ignored() {
    let (dir, filter) = vanishing_tree(true);

    let config = SearchConfig::new([dir.path()])
        .with_filter(filter)
        .with_workers(1)
        .with_signal_handling(false);

    let mut results = get_results(config).unwrap();
    results.sort();
    assert_eq!(
        results,
        vec![dir.path().join("x.txt"), dir.path().join("y.txt")]
    );
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_pruned_or_fatal() {
    use dupescout::scanner::Filters;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("inside.txt"), "same").unwrap();
    fs::write(dir.path().join("x.txt"), "same").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    let readable = fs::read_dir(&locked).is_ok();

    let search = |filters: Filters| {
        get_results(
            SearchConfig::new([dir.path()])
                .with_filters(filters)
                .with_signal_handling(false),
        )
    };
    let pruned = search(Filters::new().exclude_dir("locked"));
    let walked = search(Filters::new());

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(pruned.unwrap().is_empty());
    if readable {
        // Privileged users can list the directory, so it is searched
        assert_eq!(walked.unwrap().len(), 2);
    } else {
        let err = walked.unwrap_err();
        assert!(matches!(err, FinderError::Scan(ScanError::PermissionDenied(_))));
    }
}

#[test]
fn test_panicking_filter_fails_search() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "same").unwrap();
    fs::write(dir.path().join("b.txt"), "same").unwrap();

    let config = SearchConfig::new([dir.path()])
        .with_filter(Arc::new(PanickingFilter))
        .with_key_generator(|path: &Path| -> Result<String, KeyError> {
            fs::read_to_string(path).map_err(|e| KeyError::from_io(path, e))
        })
        .with_signal_handling(false);

    let err = get_results(config).unwrap_err();
    assert!(matches!(err, FinderError::WalkerPanicked));
    assert_eq!(err.kind(), ErrorKind::Runtime);
}

