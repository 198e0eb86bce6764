use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const ROOT_VAR: &str = "GAIL_RAG_ROOT";
const DATA_DIR_VAR: &str = "GAIL_RAG_DATA_DIR";
const DATA_DIR_NAME: &str = "gail-rag";

/// Filesystem locations for config, logs and the index snapshot database.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub index_db_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// Resolves locations from the process environment.
    pub fn new() -> Self {
        let lookup = |key: &str| env::var(key).ok();
        let project_root = resolve_project_root(lookup);
        let user_data_dir = resolve_data_dir(&project_root, cfg!(debug_assertions), lookup);
        Self::with_data_dir(project_root, user_data_dir)
    }

    /// Derives every path from the two roots and creates the data and log
    /// directories.
    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!("cannot create log directory {}: {}", log_dir.display(), e);
        }

        AppPaths {
            index_db_path: user_data_dir.join("vector_index.db"),
            secrets_path: user_data_dir.join("secrets.yaml"),
            project_root,
            user_data_dir,
            log_dir,
        }
    }
}

fn resolve_project_root(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(root) = lookup(ROOT_VAR) {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }
    env::current_dir().unwrap_or(manifest_dir)
}

/// Explicit override first; development builds keep data next to the
/// project; otherwise the XDG data home.
fn resolve_data_dir(
    project_root: &Path,
    development: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    if let Some(dir) = lookup(DATA_DIR_VAR) {
        return PathBuf::from(dir);
    }
    if development {
        return project_root.join("data");
    }

    let data_home = lookup("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            lookup("HOME")
                .or_else(|| lookup("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".local").join("share"))
        });
    match data_home {
        Some(base) => base.join(DATA_DIR_NAME),
        None => project_root.join("data"),
    }
}
