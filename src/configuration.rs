use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::shapes::CornerRounding;

/// The knobs of the compositor, read from a camelCase JSON file. Every field has a default, so an
/// empty object is a valid configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompositorConfiguration {
    /// The resolution reported in the printable metadata.
    pub dpi: u32,
    pub rounding: CornerRounding,
    /// Fail the interior document when its page count is not a multiple of four, instead of
    /// only logging a warning.
    pub strict_interior_parity: bool,
    pub image_fetch_timeout_seconds: u64,
    pub upload: UploadConfiguration,
    pub catalogue_timeout_seconds: u64,
    /// Prefix of the identifiers written into the produced PDF documents.
    pub document_identifier: String,
    pub store_base_url: Option<String>,
    pub catalogue_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfiguration {
    pub max_attempts: u32,
    pub base_delay_milliseconds: u64,
    /// Timeout of a single upload request.
    pub timeout_seconds: u64,
}

impl Default for UploadConfiguration {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_milliseconds: 500,
            timeout_seconds: 60,
        }
    }
}

impl Default for CompositorConfiguration {
    fn default() -> Self {
        Self {
            dpi: 300,
            rounding: CornerRounding::default(),
            strict_interior_parity: false,
            image_fetch_timeout_seconds: 30,
            upload: UploadConfiguration::default(),
            catalogue_timeout_seconds: 10,
            document_identifier: "bookpress".into(),
            store_base_url: None,
            catalogue_url: None,
        }
    }
}

impl CompositorConfiguration {
    pub fn from_path<P: AsRef<Path>>(configuration_file_path: P) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path.as_ref())
            .map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path.as_ref()
                    ),
                    &error,
                )
                .kind(ErrorKind::Configuration)
            })?;

        Self::from_json(&configuration_file_contents)
    }

    pub fn from_json(configuration_contents: &str) -> Result<Self, ContextError> {
        serde_json::from_str(configuration_contents).map_err(|error| {
            ContextError::with_error("Failed to parse the configuration file", &error)
                .kind(ErrorKind::Configuration)
        })
    }

    pub fn image_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.image_fetch_timeout_seconds)
    }

    pub fn catalogue_timeout(&self) -> Duration {
        Duration::from_secs(self.catalogue_timeout_seconds)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_empty_configuration_is_the_default_one() {
        let configuration = CompositorConfiguration::from_json("{}").unwrap();
        assert_eq!(configuration, CompositorConfiguration::default());
        assert_eq!(configuration.dpi, 300);
        assert_eq!(configuration.rounding, CornerRounding::Overlap);
        assert_eq!(configuration.upload.max_attempts, 3);
    }

    #[test]
    fn partial_configurations_keep_the_other_defaults() {
        let configuration = CompositorConfiguration::from_json(
            r#"{"rounding": "path", "strictInteriorParity": true, "upload": {"maxAttempts": 5}}"#,
        )
        .unwrap();
        assert_eq!(configuration.rounding, CornerRounding::Path);
        assert!(configuration.strict_interior_parity);
        assert_eq!(configuration.upload.max_attempts, 5);
        assert_eq!(configuration.upload.base_delay_milliseconds, 500);
        assert_eq!(configuration.upload_timeout(), Duration::from_secs(60));
        assert_eq!(configuration.image_fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn unreadable_configurations_are_configuration_errors() {
        let error = CompositorConfiguration::from_json("{\"dpi\": \"high\"}").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);

        let error = CompositorConfiguration::from_path("/nonexistent/bookpress.json").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);
    }
}
