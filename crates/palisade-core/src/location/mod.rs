//! Placement model for device-side configuration objects.
//!
//! Every configuration object on a PAN-OS device lives in exactly one
//! *location*: shared config, a vsys on an NGFW, a device group or
//! template on Panorama, or (read-only) the config a Panorama pushed to
//! an NGFW. [`Location`] is the canonical sum type; [`LocationModel`] is
//! the orchestrator-facing mirror with one optional cell per variant.
//!
//! The JSON wire shape of [`Location`] is externally tagged with
//! snake_case tags (`{"vsys":{"ngfw_device":"…","vsys":"…"}}`). This
//! shape is persisted inside tfid strings and MUST stay stable across
//! versions.

mod xpath;


use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical device name used when the caller does not specify one.
pub const DEFAULT_DEVICE: &str = "localhost.localdomain";

/// Canonical vsys name used when the caller does not specify one.
pub const DEFAULT_VSYS: &str = "vsys1";

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_vsys() -> String {
    DEFAULT_VSYS.to_string()
}

/// Errors from location resolution and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LocationError {
    /// No variant was selected on the model.
    #[error("invalid location: no variant is set")]
    NoneSet,

    /// More than one variant was selected on the model.
    #[error("invalid location: multiple variants are set: {variants:?}")]
    MultipleSet {
        /// The snake_case tags of the variants that were set.
        variants: Vec<&'static str>,
    },

    /// A required sub-field is empty.
    #[error("invalid location: {variant} requires a non-empty '{field}'")]
    EmptyField {
        /// The snake_case tag of the variant.
        variant: &'static str,
        /// The empty sub-field.
        field: &'static str,
    },

    /// The variant is not allowed for this resource.
    #[error("location variant '{variant}' is not supported by this resource")]
    Unsupported {
        /// The snake_case tag of the rejected variant.
        variant: &'static str,
    },
}

/// Placement of an object in a vsys on an NGFW.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsysLocation {
    /// The NGFW device hosting the vsys.
    #[serde(default = "default_device")]
    pub ngfw_device: String,
    /// The vsys name.
    #[serde(default = "default_vsys")]
    pub vsys: String,
}

/// Placement of an object in a Panorama device group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroupLocation {
    /// The Panorama device owning the device group.
    #[serde(default = "default_device")]
    pub panorama_device: String,
    /// The device group name.
    pub device_group: String,
}

/// Placement in the vsys section of config pushed down by Panorama.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromPanoramaVsysLocation {
    /// The vsys name.
    #[serde(default = "default_vsys")]
    pub vsys: String,
}

/// Placement in the shared section of a Panorama template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLocation {
    /// The Panorama device owning the template.
    #[serde(default = "default_device")]
    pub panorama_device: String,
    /// The template name.
    pub template: String,
}

/// Placement in a vsys inside a Panorama template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVsysLocation {
    /// The Panorama device owning the template.
    #[serde(default = "default_device")]
    pub panorama_device: String,
    /// The templated NGFW device.
    #[serde(default = "default_device")]
    pub ngfw_device: String,
    /// The template name.
    pub template: String,
    /// The vsys name.
    #[serde(default = "default_vsys")]
    pub vsys: String,
}

/// Placement in the shared section of a Panorama template stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStackLocation {
    /// The Panorama device owning the template stack.
    #[serde(default = "default_device")]
    pub panorama_device: String,
    /// The template stack name.
    pub template_stack: String,
}

/// Placement in a vsys inside a Panorama template stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStackVsysLocation {
    /// The Panorama device owning the template stack.
    #[serde(default = "default_device")]
    pub panorama_device: String,
    /// The templated NGFW device.
    #[serde(default = "default_device")]
    pub ngfw_device: String,
    /// The template stack name.
    pub template_stack: String,
    /// The vsys name.
    #[serde(default = "default_vsys")]
    pub vsys: String,
}

/// Placement at the top level of a Panorama.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanoramaLocation {
    /// The Panorama device.
    #[serde(default = "default_device")]
    pub panorama_device: String,
}

/// Where an object lives on the device.
///
/// Exactly one variant is ever selected; multi-selection is only
/// representable on [`LocationModel`] and is rejected by
/// [`LocationModel::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Shared config, visible to every vsys or device group.
    Shared(bool),
    /// A vsys on an NGFW.
    Vsys(VsysLocation),
    /// A Panorama device group.
    DeviceGroup(DeviceGroupLocation),
    /// The shared section of config pushed down by Panorama (read-only).
    FromPanoramaShared(bool),
    /// A vsys section of config pushed down by Panorama (read-only).
    FromPanoramaVsys(FromPanoramaVsysLocation),
    /// The shared section of a Panorama template.
    Template(TemplateLocation),
    /// A vsys inside a Panorama template.
    TemplateVsys(TemplateVsysLocation),
    /// The shared section of a Panorama template stack.
    TemplateStack(TemplateStackLocation),
    /// A vsys inside a Panorama template stack.
    TemplateStackVsys(TemplateStackVsysLocation),
    /// The top level of a Panorama.
    Panorama(PanoramaLocation),
}

/// Discriminant of a [`Location`], used in per-resource allow lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    /// See [`Location::Shared`].
    Shared,
    /// See [`Location::Vsys`].
    Vsys,
    /// See [`Location::DeviceGroup`].
    DeviceGroup,
    /// See [`Location::FromPanoramaShared`].
    FromPanoramaShared,
    /// See [`Location::FromPanoramaVsys`].
    FromPanoramaVsys,
    /// See [`Location::Template`].
    Template,
    /// See [`Location::TemplateVsys`].
    TemplateVsys,
    /// See [`Location::TemplateStack`].
    TemplateStack,
    /// See [`Location::TemplateStackVsys`].
    TemplateStackVsys,
    /// See [`Location::Panorama`].
    Panorama,
}

impl LocationKind {
    /// Returns the snake_case tag used on the wire and in diagnostics.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Vsys => "vsys",
            Self::DeviceGroup => "device_group",
            Self::FromPanoramaShared => "from_panorama_shared",
            Self::FromPanoramaVsys => "from_panorama_vsys",
            Self::Template => "template",
            Self::TemplateVsys => "template_vsys",
            Self::TemplateStack => "template_stack",
            Self::TemplateStackVsys => "template_stack_vsys",
            Self::Panorama => "panorama",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Location {
    /// Returns the variant discriminant.
    #[must_use]
    pub const fn kind(&self) -> LocationKind {
        match self {
            Self::Shared(_) => LocationKind::Shared,
            Self::Vsys(_) => LocationKind::Vsys,
            Self::DeviceGroup(_) => LocationKind::DeviceGroup,
            Self::FromPanoramaShared(_) => LocationKind::FromPanoramaShared,
            Self::FromPanoramaVsys(_) => LocationKind::FromPanoramaVsys,
            Self::Template(_) => LocationKind::Template,
            Self::TemplateVsys(_) => LocationKind::TemplateVsys,
            Self::TemplateStack(_) => LocationKind::TemplateStack,
            Self::TemplateStackVsys(_) => LocationKind::TemplateStackVsys,
            Self::Panorama(_) => LocationKind::Panorama,
        }
    }

    /// Shape check: every required sub-field must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::EmptyField`] naming the first offending
    /// sub-field.
    pub fn validate(&self) -> Result<(), LocationError> {
        fn require(
            variant: &'static str,
            field: &'static str,
            value: &str,
        ) -> Result<(), LocationError> {
            if value.is_empty() {
                Err(LocationError::EmptyField { variant, field })
            } else {
                Ok(())
            }
        }

        match self {
            Self::Shared(true) | Self::FromPanoramaShared(true) => Ok(()),
            Self::Shared(false) => Err(LocationError::EmptyField {
                variant: "shared",
                field: "shared",
            }),
            Self::FromPanoramaShared(false) => Err(LocationError::EmptyField {
                variant: "from_panorama_shared",
                field: "from_panorama_shared",
            }),
            Self::Vsys(loc) => {
                require("vsys", "ngfw_device", &loc.ngfw_device)?;
                require("vsys", "vsys", &loc.vsys)
            }
            Self::DeviceGroup(loc) => {
                require("device_group", "panorama_device", &loc.panorama_device)?;
                require("device_group", "device_group", &loc.device_group)
            }
            Self::FromPanoramaVsys(loc) => require("from_panorama_vsys", "vsys", &loc.vsys),
            Self::Template(loc) => {
                require("template", "panorama_device", &loc.panorama_device)?;
                require("template", "template", &loc.template)
            }
            Self::TemplateVsys(loc) => {
                require("template_vsys", "panorama_device", &loc.panorama_device)?;
                require("template_vsys", "ngfw_device", &loc.ngfw_device)?;
                require("template_vsys", "template", &loc.template)?;
                require("template_vsys", "vsys", &loc.vsys)
            }
            Self::TemplateStack(loc) => {
                require("template_stack", "panorama_device", &loc.panorama_device)?;
                require("template_stack", "template_stack", &loc.template_stack)
            }
            Self::TemplateStackVsys(loc) => {
                require("template_stack_vsys", "panorama_device", &loc.panorama_device)?;
                require("template_stack_vsys", "ngfw_device", &loc.ngfw_device)?;
                require("template_stack_vsys", "template_stack", &loc.template_stack)?;
                require("template_stack_vsys", "vsys", &loc.vsys)
            }
            Self::Panorama(loc) => require("panorama", "panorama_device", &loc.panorama_device),
        }
    }

    /// Returns true for the read-only `from_panorama_*` mirror variants.
    ///
    /// These are valid for data sources only; resources reject them.
    #[must_use]
    pub const fn is_from_panorama(&self) -> bool {
        matches!(
            self,
            Self::FromPanoramaShared(_) | Self::FromPanoramaVsys(_)
        )
    }

    /// Checks this location against a resource's allowed variant set.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Unsupported`] when the variant is not in
    /// `allowed`.
    pub fn check_allowed(&self, allowed: &[LocationKind]) -> Result<(), LocationError> {
        let kind = self.kind();
        if allowed.contains(&kind) {
            Ok(())
        } else {
            Err(LocationError::Unsupported {
                variant: kind.tag(),
            })
        }
    }

    /// The import command extras for template-scoped locations.
    ///
    /// Returns `(target_tpl, target_tpl_vsys)`; both are `None` outside
    /// the template family.
    #[must_use]
    pub fn import_targets(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Self::Template(loc) => (Some(loc.template.as_str()), None),
            Self::TemplateVsys(loc) => (Some(loc.template.as_str()), Some(loc.vsys.as_str())),
            Self::TemplateStack(loc) => (Some(loc.template_stack.as_str()), None),
            Self::TemplateStackVsys(loc) => {
                (Some(loc.template_stack.as_str()), Some(loc.vsys.as_str()))
            }
            _ => (None, None),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(_) => write!(f, "shared"),
            Self::Vsys(loc) => write!(f, "vsys '{}' on '{}'", loc.vsys, loc.ngfw_device),
            Self::DeviceGroup(loc) => {
                write!(f, "device group '{}' on '{}'", loc.device_group, loc.panorama_device)
            }
            Self::FromPanoramaShared(_) => write!(f, "shared (pushed from Panorama)"),
            Self::FromPanoramaVsys(loc) => {
                write!(f, "vsys '{}' (pushed from Panorama)", loc.vsys)
            }
            Self::Template(loc) => {
                write!(f, "template '{}' on '{}'", loc.template, loc.panorama_device)
            }
            Self::TemplateVsys(loc) => write!(
                f,
                "vsys '{}' in template '{}' on '{}'",
                loc.vsys, loc.template, loc.panorama_device
            ),
            Self::TemplateStack(loc) => write!(
                f,
                "template stack '{}' on '{}'",
                loc.template_stack, loc.panorama_device
            ),
            Self::TemplateStackVsys(loc) => write!(
                f,
                "vsys '{}' in template stack '{}' on '{}'",
                loc.vsys, loc.template_stack, loc.panorama_device
            ),
            Self::Panorama(loc) => write!(f, "panorama '{}'", loc.panorama_device),
        }
    }
}

/// Orchestrator-facing mirror of [`Location`]: one optional cell per
/// variant, sub-fields optional so the user can rely on defaulting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationModel {
    /// Shared config. Only `Some(true)` selects the variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    /// A vsys on an NGFW.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsys: Option<VsysModel>,
    /// A Panorama device group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_group: Option<DeviceGroupModel>,
    /// Config pushed from Panorama, shared section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_panorama_shared: Option<bool>,
    /// Config pushed from Panorama, vsys section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_panorama_vsys: Option<FromPanoramaVsysModel>,
    /// The shared section of a Panorama template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateModel>,
    /// A vsys inside a Panorama template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_vsys: Option<TemplateVsysModel>,
    /// The shared section of a Panorama template stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_stack: Option<TemplateStackModel>,
    /// A vsys inside a Panorama template stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_stack_vsys: Option<TemplateStackVsysModel>,
    /// The top level of a Panorama.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panorama: Option<PanoramaModel>,
}

/// Model cell for [`VsysLocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsysModel {
    /// The NGFW device; defaults to `localhost.localdomain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ngfw_device: Option<String>,
    /// The vsys name; defaults to `vsys1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsys: Option<String>,
}

/// Model cell for [`DeviceGroupLocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroupModel {
    /// The Panorama device; defaults to `localhost.localdomain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panorama_device: Option<String>,
    /// The device group name; required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_group: Option<String>,
}

/// Model cell for [`FromPanoramaVsysLocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromPanoramaVsysModel {
    /// The vsys name; defaults to `vsys1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsys: Option<String>,
}

/// Model cell for [`TemplateLocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateModel {
    /// The Panorama device; defaults to `localhost.localdomain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panorama_device: Option<String>,
    /// The template name; required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Model cell for [`TemplateVsysLocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVsysModel {
    /// The Panorama device; defaults to `localhost.localdomain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panorama_device: Option<String>,
    /// The templated NGFW device; defaults to `localhost.localdomain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ngfw_device: Option<String>,
    /// The template name; required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// The vsys name; defaults to `vsys1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsys: Option<String>,
}

/// Model cell for [`TemplateStackLocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStackModel {
    /// The Panorama device; defaults to `localhost.localdomain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panorama_device: Option<String>,
    /// The template stack name; required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_stack: Option<String>,
}

/// Model cell for [`TemplateStackVsysLocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStackVsysModel {
    /// The Panorama device; defaults to `localhost.localdomain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panorama_device: Option<String>,
    /// The templated NGFW device; defaults to `localhost.localdomain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ngfw_device: Option<String>,
    /// The template stack name; required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_stack: Option<String>,
    /// The vsys name; defaults to `vsys1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsys: Option<String>,
}

/// Model cell for [`PanoramaLocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanoramaModel {
    /// The Panorama device; defaults to `localhost.localdomain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panorama_device: Option<String>,
}

fn or_device(value: &Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.clone(),
        _ => default_device(),
    }
}

fn or_vsys(value: &Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.clone(),
        _ => default_vsys(),
    }
}

impl LocationModel {
    /// Extracts the sole selected variant, defaulting unset textual
    /// sub-fields (`localhost.localdomain`, `vsys1`).
    ///
    /// A `shared`/`from_panorama_shared` cell holding `false` counts as
    /// unset.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::NoneSet`] or [`LocationError::MultipleSet`]
    /// unless exactly one variant is selected, and
    /// [`LocationError::EmptyField`] when a required name is missing.
    pub fn resolve(&self) -> Result<Location, LocationError> {
        let mut set: Vec<&'static str> = Vec::new();
        if self.shared == Some(true) {
            set.push("shared");
        }
        if self.vsys.is_some() {
            set.push("vsys");
        }
        if self.device_group.is_some() {
            set.push("device_group");
        }
        if self.from_panorama_shared == Some(true) {
            set.push("from_panorama_shared");
        }
        if self.from_panorama_vsys.is_some() {
            set.push("from_panorama_vsys");
        }
        if self.template.is_some() {
            set.push("template");
        }
        if self.template_vsys.is_some() {
            set.push("template_vsys");
        }
        if self.template_stack.is_some() {
            set.push("template_stack");
        }
        if self.template_stack_vsys.is_some() {
            set.push("template_stack_vsys");
        }
        if self.panorama.is_some() {
            set.push("panorama");
        }

        match set.len() {
            0 => return Err(LocationError::NoneSet),
            1 => {}
            _ => return Err(LocationError::MultipleSet { variants: set }),
        }

        let location = match set[0] {
            "shared" => Location::Shared(true),
            "vsys" => {
                let cell = self.vsys.as_ref().expect("cell checked above");
                Location::Vsys(VsysLocation {
                    ngfw_device: or_device(&cell.ngfw_device),
                    vsys: or_vsys(&cell.vsys),
                })
            }
            "device_group" => {
                let cell = self.device_group.as_ref().expect("cell checked above");
                Location::DeviceGroup(DeviceGroupLocation {
                    panorama_device: or_device(&cell.panorama_device),
                    device_group: cell.device_group.clone().unwrap_or_default(),
                })
            }
            "from_panorama_shared" => Location::FromPanoramaShared(true),
            "from_panorama_vsys" => {
                let cell = self.from_panorama_vsys.as_ref().expect("cell checked above");
                Location::FromPanoramaVsys(FromPanoramaVsysLocation {
                    vsys: or_vsys(&cell.vsys),
                })
            }
            "template" => {
                let cell = self.template.as_ref().expect("cell checked above");
                Location::Template(TemplateLocation {
                    panorama_device: or_device(&cell.panorama_device),
                    template: cell.template.clone().unwrap_or_default(),
                })
            }
            "template_vsys" => {
                let cell = self.template_vsys.as_ref().expect("cell checked above");
                Location::TemplateVsys(TemplateVsysLocation {
                    panorama_device: or_device(&cell.panorama_device),
                    ngfw_device: or_device(&cell.ngfw_device),
                    template: cell.template.clone().unwrap_or_default(),
                    vsys: or_vsys(&cell.vsys),
                })
            }
            "template_stack" => {
                let cell = self.template_stack.as_ref().expect("cell checked above");
                Location::TemplateStack(TemplateStackLocation {
                    panorama_device: or_device(&cell.panorama_device),
                    template_stack: cell.template_stack.clone().unwrap_or_default(),
                })
            }
            "template_stack_vsys" => {
                let cell = self.template_stack_vsys.as_ref().expect("cell checked above");
                Location::TemplateStackVsys(TemplateStackVsysLocation {
                    panorama_device: or_device(&cell.panorama_device),
                    ngfw_device: or_device(&cell.ngfw_device),
                    template_stack: cell.template_stack.clone().unwrap_or_default(),
                    vsys: or_vsys(&cell.vsys),
                })
            }
            "panorama" => {
                let cell = self.panorama.as_ref().expect("cell checked above");
                Location::Panorama(PanoramaLocation {
                    panorama_device: or_device(&cell.panorama_device),
                })
            }
            _ => unreachable!("variant tags are exhaustive"),
        };

        location.validate()?;
        Ok(location)
    }
}

impl From<&Location> for LocationModel {
    fn from(location: &Location) -> Self {
        let mut model = Self::default();
        match location {
            Location::Shared(_) => model.shared = Some(true),
            Location::Vsys(loc) => {
                model.vsys = Some(VsysModel {
                    ngfw_device: Some(loc.ngfw_device.clone()),
                    vsys: Some(loc.vsys.clone()),
                });
            }
            Location::DeviceGroup(loc) => {
                model.device_group = Some(DeviceGroupModel {
                    panorama_device: Some(loc.panorama_device.clone()),
                    device_group: Some(loc.device_group.clone()),
                });
            }
            Location::FromPanoramaShared(_) => model.from_panorama_shared = Some(true),
            Location::FromPanoramaVsys(loc) => {
                model.from_panorama_vsys = Some(FromPanoramaVsysModel {
                    vsys: Some(loc.vsys.clone()),
                });
            }
            Location::Template(loc) => {
                model.template = Some(TemplateModel {
                    panorama_device: Some(loc.panorama_device.clone()),
                    template: Some(loc.template.clone()),
                });
            }
            Location::TemplateVsys(loc) => {
                model.template_vsys = Some(TemplateVsysModel {
                    panorama_device: Some(loc.panorama_device.clone()),
                    ngfw_device: Some(loc.ngfw_device.clone()),
                    template: Some(loc.template.clone()),
                    vsys: Some(loc.vsys.clone()),
                });
            }
            Location::TemplateStack(loc) => {
                model.template_stack = Some(TemplateStackModel {
                    panorama_device: Some(loc.panorama_device.clone()),
                    template_stack: Some(loc.template_stack.clone()),
                });
            }
            Location::TemplateStackVsys(loc) => {
                model.template_stack_vsys = Some(TemplateStackVsysModel {
                    panorama_device: Some(loc.panorama_device.clone()),
                    ngfw_device: Some(loc.ngfw_device.clone()),
                    template_stack: Some(loc.template_stack.clone()),
                    vsys: Some(loc.vsys.clone()),
                });
            }
            Location::Panorama(loc) => {
                model.panorama = Some(PanoramaModel {
                    panorama_device: Some(loc.panorama_device.clone()),
                });
            }
        }
        model
    }
}
