//! Release template package metadata
//!
//! Older servers and clients spell the package fields `NuGetPackageId`,
//! `NuGetFeedId` and `NuGetFeedName`. Both spellings are accepted on input
//! and both are written on output; the current name wins when a document
//! carries both.

use serde::{Deserialize, Serialize};

/// A package referenced by a release template step
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "WirePackage", into = "WirePackage")]
pub struct ReleaseTemplatePackage {
    /// Name of the deployment step using the package
    pub step_name: String,
    /// Package identifier
    pub package_id: Option<String>,
    /// Feed the package is pulled from
    pub feed_id: Option<String>,
    /// Display name of the feed
    pub feed_name: Option<String>,
    /// Version chosen for the previous release, if any
    pub version_selected_last_release: Option<String>,
    /// False when the package or feed id references variables, meaning the
    /// package can't be resolved until deployment time
    pub is_resolvable: bool,
}

impl ReleaseTemplatePackage {
    /// Legacy alias of [`Self::package_id`]
    #[deprecated(note = "use `package_id`")]
    #[must_use]
    pub fn nuget_package_id(&self) -> Option<&str> {
        self.package_id.as_deref()
    }

    /// Legacy alias setter for [`Self::package_id`]
    #[deprecated(note = "use `package_id`")]
    pub fn set_nuget_package_id(&mut self, value: impl Into<String>) {
        self.package_id = Some(value.into());
    }

    /// Legacy alias of [`Self::feed_id`]
    #[deprecated(note = "use `feed_id`")]
    #[must_use]
    pub fn nuget_feed_id(&self) -> Option<&str> {
        self.feed_id.as_deref()
    }

    /// Legacy alias setter for [`Self::feed_id`]
    #[deprecated(note = "use `feed_id`")]
    pub fn set_nuget_feed_id(&mut self, value: impl Into<String>) {
        self.feed_id = Some(value.into());
    }

    /// Legacy alias of [`Self::feed_name`]
    #[deprecated(note = "use `feed_name`")]
    #[must_use]
    pub fn nuget_feed_name(&self) -> Option<&str> {
        self.feed_name.as_deref()
    }

    /// Legacy alias setter for [`Self::feed_name`]
    #[deprecated(note = "use `feed_name`")]
    pub fn set_nuget_feed_name(&mut self, value: impl Into<String>) {
        self.feed_name = Some(value.into());
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WirePackage {
    #[serde(default)]
    step_name: String,
    #[serde(default)]
    package_id: Option<String>,
    #[serde(default, rename = "NuGetPackageId")]
    nuget_package_id: Option<String>,
    #[serde(default)]
    feed_id: Option<String>,
    #[serde(default, rename = "NuGetFeedId")]
    nuget_feed_id: Option<String>,
    #[serde(default)]
    feed_name: Option<String>,
    #[serde(default, rename = "NuGetFeedName")]
    nuget_feed_name: Option<String>,
    #[serde(default)]
    version_selected_last_release: Option<String>,
    #[serde(default)]
    is_resolvable: bool,
}

impl From<WirePackage> for ReleaseTemplatePackage {
    fn from(wire: WirePackage) -> Self {
        Self {
            step_name: wire.step_name,
            package_id: wire.package_id.or(wire.nuget_package_id),
            feed_id: wire.feed_id.or(wire.nuget_feed_id),
            feed_name: wire.feed_name.or(wire.nuget_feed_name),
            version_selected_last_release: wire.version_selected_last_release,
            is_resolvable: wire.is_resolvable,
        }
    }
}

impl From<ReleaseTemplatePackage> for WirePackage {
    fn from(package: ReleaseTemplatePackage) -> Self {
        Self {
            step_name: package.step_name,
            nuget_package_id: package.package_id.clone(),
            package_id: package.package_id,
            nuget_feed_id: package.feed_id.clone(),
            feed_id: package.feed_id,
            nuget_feed_name: package.feed_name.clone(),
            feed_name: package.feed_name,
            version_selected_last_release: package.version_selected_last_release,
            is_resolvable: package.is_resolvable,
        }
    }
}
