//! Device xpath prefixes for each location variant.

use super::Location;
use crate::xmlapi::xpath_attr_quoted;

impl Location {
    /// Renders the device xpath under which this location's objects live,
    /// quoting entry names with the default `'`.
    ///
    /// Object xpaths are formed as `prefix + suffix path + entry[@name]`;
    /// see [`crate::xmlapi::entry_xpath`].
    #[must_use]
    pub fn xpath_prefix(&self) -> String {
        self.xpath_prefix_with('\'')
    }

    /// Renders the xpath prefix with an explicit quote character.
    #[must_use]
    pub fn xpath_prefix_with(&self, quote: char) -> String {
        let name = |value: &str| xpath_attr_quoted("name", value, quote);
        match self {
            Self::Shared(_) => "/config/shared".to_string(),
            Self::Vsys(loc) => format!(
                "/config/devices/entry[{}]/vsys/entry[{}]",
                name(&loc.ngfw_device),
                name(&loc.vsys),
            ),
            Self::DeviceGroup(loc) => format!(
                "/config/devices/entry[{}]/device-group/entry[{}]",
                name(&loc.panorama_device),
                name(&loc.device_group),
            ),
            Self::FromPanoramaShared(_) => "/config/panorama".to_string(),
            Self::FromPanoramaVsys(loc) => {
                format!("/config/panorama/vsys/entry[{}]", name(&loc.vsys))
            }
            Self::Template(loc) => format!(
                "/config/devices/entry[{}]/template/entry[{}]/config/shared",
                name(&loc.panorama_device),
                name(&loc.template),
            ),
            Self::TemplateVsys(loc) => format!(
                "/config/devices/entry[{}]/template/entry[{}]/config/devices/entry[{}]/vsys/entry[{}]",
                name(&loc.panorama_device),
                name(&loc.template),
                name(&loc.ngfw_device),
                name(&loc.vsys),
            ),
            Self::TemplateStack(loc) => format!(
                "/config/devices/entry[{}]/template-stack/entry[{}]/config/shared",
                name(&loc.panorama_device),
                name(&loc.template_stack),
            ),
            Self::TemplateStackVsys(loc) => format!(
                "/config/devices/entry[{}]/template-stack/entry[{}]/config/devices/entry[{}]/vsys/entry[{}]",
                name(&loc.panorama_device),
                name(&loc.template_stack),
                name(&loc.ngfw_device),
                name(&loc.vsys),
            ),
            Self::Panorama(loc) => {
                format!("/config/devices/entry[{}]", name(&loc.panorama_device))
            }
        }
    }
}
