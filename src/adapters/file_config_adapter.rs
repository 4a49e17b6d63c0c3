//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive; both `=` and `:` separate a
//! key from its value.

use crate::domain::error::StocksimError;
use crate::ports::config_port::{BadValue, ConfigPort};
use configparser::ini::Ini;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug)]
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StocksimError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| StocksimError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        tracing::debug!(file = %path.display(), "configuration loaded");
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, StocksimError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| StocksimError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { ini })
    }

    fn parsed<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, BadValue> {
        match self.ini.get(section, key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|_| BadValue(raw)),
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, BadValue> {
        self.parsed(section, key)
    }

    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, BadValue> {
        self.parsed(section, key)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .ini
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
