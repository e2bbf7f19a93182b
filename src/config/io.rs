use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_dirs;

use super::{ConfigError, Settings};

/// Name of the settings file inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load settings from the application directory, returning defaults if the file is missing.
pub fn load_or_default() -> Result<Settings, ConfigError> {
    load_from(&config_path()?)
}

/// Load and normalize settings from `path`. A missing file yields defaults.
pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}; using defaults", path.display());
        return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(settings.normalized())
}

/// Persist settings to the application directory.
pub fn save(settings: &Settings) -> Result<(), ConfigError> {
    save_to_path(settings, &config_path()?)
}

/// Save settings to a specific path, creating parent directories as needed.
pub fn save_to_path(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, data.as_bytes())
}

/// Write through a uniquely named sibling file and rename it over `path`.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let write_error = |path: &Path, source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let (Some(dir), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Err(write_error(
            path,
            std::io::Error::other("config path has no parent directory or file name"),
        ));
    };

    let mut last_err = None;
    for _ in 0..5 {
        let suffix = format!("{:012x}", rand::random::<u64>() & 0xffff_ffff_ffff);
        let tmp_path = dir.join(format!("{}.tmp-{suffix}", file_name.to_string_lossy()));
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                last_err = Some(err);
                continue;
            }
            Err(err) => return Err(write_error(&tmp_path, err)),
        };
        if let Err(err) = file.write_all(data).and_then(|_| file.sync_all()) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_error(&tmp_path, err));
        }
        drop(file);
        if let Err(err) = replace_file(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_error(path, err));
        }
        return Ok(());
    }

    Err(write_error(
        path,
        last_err.unwrap_or_else(|| std::io::Error::other("failed to create temporary file")),
    ))
}

fn replace_file(temp_path: &Path, path: &Path) -> Result<(), std::io::Error> {
    match std::fs::rename(temp_path, path) {
        Ok(()) => Ok(()),
        Err(err) => {
            #[cfg(target_os = "windows")]
            if matches!(
                err.kind(),
                std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::PermissionDenied
            ) {
                if let Err(inner) = std::fs::remove_file(path)
                    && inner.kind() != std::io::ErrorKind::NotFound
                {
                    return Err(inner);
                }
                return std::fs::rename(temp_path, path);
            }
            Err(err)
        }
    }
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => ConfigError::CreateDir { path, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_dirs::test_support::OverrideGuard;
    use crate::calibration::CalibrationMode;
    use crate::view::{SortDirection, SortField};
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut settings = Settings::default();
        settings.calibration.mode = CalibrationMode::Deferred;
        settings.calibration.high_percentile = 0.8;
        settings.view.default_sort_field = SortField::TenureYears;
        settings.view.default_sort_direction = SortDirection::Asc;
        settings.logging.file_output = false;

        save_to_path(&settings, &path).unwrap();
        assert_eq!(load_from(&path).unwrap(), settings);

        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[calibration\nmode = ").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[calibration]\nmode = \"eager\"\n").unwrap();
        assert!(matches!(
            load_from(&path),
            Err(ConfigError::ParseToml { .. })
        ));
    }

    #[test]
    fn config_path_lives_in_app_root() {
        let base = tempdir().unwrap();
        let _guard = OverrideGuard::set(base.path().to_path_buf());
        let path = config_path().unwrap();
        assert_eq!(
            path,
            base.path().join(app_dirs::APP_DIR_NAME).join(CONFIG_FILE_NAME)
        );
        let mut settings = Settings::default();
        settings.view.default_sort_field = SortField::Department;
        save(&settings).unwrap();
        assert_eq!(load_or_default().unwrap(), settings);
    }
}
