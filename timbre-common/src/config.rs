//! Configuration loading and root folder resolution

use std::path::{Path, PathBuf};

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(config_path) = user_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Platform config file location: `<config dir>/timbre/config.toml`.
fn user_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("timbre").join("config.toml");
    path.exists().then_some(path)
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("timbre"))
        .unwrap_or_else(|| PathBuf::from("./timbre_data"))
}

/// Create the root folder if it does not exist yet.
pub fn ensure_root_folder(root: &Path) -> crate::Result<()> {
    if !root.exists() {
        tracing::info!("Creating root folder: {}", root.display());
        std::fs::create_dir_all(root)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_takes_priority() {
        let root = resolve_root_folder(Some("/tmp/timbre-cli"), "TIMBRE_TEST_UNSET_VAR");
        assert_eq!(root, PathBuf::from("/tmp/timbre-cli"));
    }

    #[test]
    fn test_default_when_nothing_set() {
        let root = resolve_root_folder(None, "TIMBRE_TEST_UNSET_VAR");
        assert_eq!(root, default_root_folder());
    }

    #[test]
    fn test_ensure_root_folder_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("root");
        ensure_root_folder(&root).unwrap();
        assert!(root.is_dir());
    }
}
