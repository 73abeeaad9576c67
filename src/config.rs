use eyre::Result;
use std::path::PathBuf;

/// Resolve the application data directory.
///
/// Everything we keep on disk is state (the library database, the log
/// file), so this follows XDG data-home conventions rather than
/// config-home. Reading preferences live inside the database itself.
pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(data_home) = std::env::var_os("XDG_DATA_HOME") {
        return Ok(PathBuf::from(data_home).join("juan"));
    } else if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home.clone())
            .join(".local")
            .join("share")
            .join("juan");
        if path.exists() {
            return Ok(path);
        } else {
            return Ok(PathBuf::from(home).join(".juan"));
        }
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(".juan"));
    }

    Err(eyre::eyre!(
        "Could not determine application data directory"
    ))
}

/// Path of the library database, creating the parent directory if needed.
pub fn library_db_path() -> Result<PathBuf> {
    let prefix = get_app_data_prefix()?;
    std::fs::create_dir_all(&prefix)?;
    Ok(prefix.join("library.db"))
}

/// Path of the log file. Best effort; callers treat a failure here as
/// "logging disabled".
pub fn log_file_path() -> Result<PathBuf> {
    let prefix = get_app_data_prefix()?;
    std::fs::create_dir_all(&prefix)?;
    Ok(prefix.join("juan.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    // Env-var tests share process state; serialize them.
    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn test_prefix_prefers_xdg_data_home() {
        let _guard = env_lock().lock().unwrap();
        let old = env::var_os("XDG_DATA_HOME");
        unsafe {
            env::set_var("XDG_DATA_HOME", "/tmp/xdg-data");
        }
        let prefix = get_app_data_prefix().unwrap();
        assert_eq!(prefix, PathBuf::from("/tmp/xdg-data/juan"));
        unsafe {
            match old {
                Some(v) => env::set_var("XDG_DATA_HOME", v),
                None => env::remove_var("XDG_DATA_HOME"),
            }
        }
    }

    #[test]
    fn test_prefix_falls_back_to_home() {
        let _guard = env_lock().lock().unwrap();
        let old_xdg = env::var_os("XDG_DATA_HOME");
        let old_home = env::var_os("HOME");
        unsafe {
            env::remove_var("XDG_DATA_HOME");
            env::set_var("HOME", "/tmp/juan-test-home");
        }
        let prefix = get_app_data_prefix().unwrap();
        // The XDG path does not exist under this fake HOME, so we get the
        // dotdir fallback.
        assert_eq!(prefix, PathBuf::from("/tmp/juan-test-home/.juan"));
        unsafe {
            match old_xdg {
                Some(v) => env::set_var("XDG_DATA_HOME", v),
                None => env::remove_var("XDG_DATA_HOME"),
            }
            match old_home {
                Some(v) => env::set_var("HOME", v),
                None => env::remove_var("HOME"),
            }
        }
    }
}
