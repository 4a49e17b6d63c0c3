//! Configuration access port trait.

/// Raw text of a value that is present but does not parse as the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadValue(pub String);

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, BadValue>;
    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, BadValue>;
    /// Keys present in `section`, sorted. Empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
}
