//! Registry configuration

use sparktag_core::Alias;

/// Registry configuration
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Tags with an alias below this are still read and flagged, but never
    /// raise the bulk "any changed" signal (housekeeping tags)
    pub publish_alias_threshold: Alias,
    /// Alias handed out on collision when no tag holds a higher one
    pub first_auto_alias: Alias,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            publish_alias_threshold: 0,
            first_auto_alias: 1,
        }
    }
}

impl RegistryConfig {
    /// Every tag contributes to the bulk change signal
    pub fn include_all() -> Self {
        RegistryConfig {
            publish_alias_threshold: Alias::MIN,
            ..RegistryConfig::default()
        }
    }

    /// Set the housekeeping threshold
    pub fn with_publish_threshold(mut self, threshold: Alias) -> Self {
        self.publish_alias_threshold = threshold;
        self
    }

    /// Whether a tag with `alias` contributes to the bulk change signal
    #[inline]
    pub fn publishes(&self, alias: Alias) -> bool {
        alias >= self.publish_alias_threshold
    }
}
