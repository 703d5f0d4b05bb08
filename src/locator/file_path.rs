use reqwest::Url;
use std::path::Path;

use super::traits::{LocateError, Locator};
use crate::intent::Intent;

/// Claims bare absolute filesystem paths and turns them into `file://` URLs
#[derive(Debug, Clone)]
pub struct FilePathLocator {
    name: String,
}

impl FilePathLocator {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for FilePathLocator {
    fn default() -> Self {
        Self::new("file_path")
    }
}

impl Locator for FilePathLocator {
    fn name(&self) -> &str {
        &self.name
    }

    fn locate(&self, intent: &Intent) -> Result<Option<Url>, LocateError> {
        let path = Path::new(intent.uri());
        if !path.is_absolute() {
            return Ok(None);
        }

        Url::from_file_path(path)
            .map(Some)
            .map_err(|_| LocateError::Malformed {
                value: intent.uri().to_string(),
                reason: "not representable as a file URL".to_string(),
            })
    }
}
