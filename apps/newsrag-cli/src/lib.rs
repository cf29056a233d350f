use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use newsrag_core::config::Settings;

/// Log to stderr; `RUST_LOG` wins over the `--verbose` default.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

/// `--snapshot-dir` if given, else `paths.snapshot_dir` relative to the cwd.
pub fn snapshot_dir(settings: &Settings, flag: Option<&Path>) -> PathBuf {
    flag.map_or_else(|| settings.snapshot_dir(Path::new(".")), Path::to_path_buf)
}

/// Embedding cache kept next to the snapshot so rebuilds reuse vectors.
pub fn cache_path(snapshot_dir: &Path) -> PathBuf {
    let name = snapshot_dir.file_name().map_or_else(|| "snapshot".into(), |n| n.to_string_lossy().to_string());
    snapshot_dir.with_file_name(format!("{name}.embeddings.json"))
}
