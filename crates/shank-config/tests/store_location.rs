//! Integration tests for store location resolution.

use std::ffi::{OsStr, OsString};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use shank_config::{CONFIG_PATH_ENV, ConfigStore};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        let previous = std::env::var_os(key);
        // Environment mutation is unsafe on the 2024 edition; the override is
        // serialised by ENV_MUTEX and undone in Drop.
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

#[test]
fn explicit_path_variable_wins() {
    let _override = EnvOverride::set_var(CONFIG_PATH_ENV, OsStr::new("/srv/shank/config.json"));

    let store = ConfigStore::locate().expect("locate store");

    assert_eq!(store.path().as_str(), "/srv/shank/config.json");
}

#[test]
fn empty_variable_falls_back_to_home() {
    let _override = EnvOverride::set_var(CONFIG_PATH_ENV, OsStr::new(""));

    if let Ok(store) = ConfigStore::locate() {
        assert_eq!(store.path().file_name(), Some(".shankrc"));
    }
}
