use std::{
    env,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Once,
};

use dirs::home_dir;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_DIR_NAME: &str = ".fintrack";
const HOME_ENV: &str = "FINTRACK_HOME";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const DATA_DIR: &str = "data";
const TMP_SUFFIX: &str = "tmp";

pub const DEFAULT_LOG_FILTER: &str = "fintrack_core=info";

static TRACING_INIT: Once = Once::new();

/// Installs the global fmt subscriber once. `RUST_LOG` directives take
/// precedence over `filter`.
pub fn init_tracing(filter: &str) {
    TRACING_INIT.call_once(|| {
        let filter = log_filter(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), filter);
        // A subscriber installed by the host application wins.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}

/// Picks the first directive set that parses: environment, configured, default.
pub fn log_filter(env_directives: Option<&str>, configured: &str) -> EnvFilter {
    env_directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Returns the application data directory, defaulting to `~/.fintrack`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn config_dir_in(base: &Path) -> PathBuf {
    base.join(CONFIG_DIR)
}

pub fn config_file_in(base: &Path) -> PathBuf {
    config_dir_in(base).join(CONFIG_FILE)
}

/// Directory holding the JSON table files.
pub fn data_dir_in(base: &Path) -> PathBuf {
    base.join(DATA_DIR)
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Staging sibling of `path`, e.g. `goals.json.tmp`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

pub fn write_atomic(path: &Path, data: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}
