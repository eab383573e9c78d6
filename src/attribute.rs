//! Identity attributes of database records and the schema grouping them.
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Names one identity attribute of a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Attribute {
    Device,
    DeviceVendor,
    DeviceType,
    DeviceArchitecture,
    DeviceComputeUnits,
    DeviceCoreClock,
    Precision,
    KernelFamily,
    Kernel,
    ArgM,
    ArgN,
    ArgK,
    ArgAlpha,
    ArgBeta,
}

impl Attribute {
    /// All the attributes, in declaration order.
    pub const ALL: [Attribute; 14] = [
        Attribute::Device,
        Attribute::DeviceVendor,
        Attribute::DeviceType,
        Attribute::DeviceArchitecture,
        Attribute::DeviceComputeUnits,
        Attribute::DeviceCoreClock,
        Attribute::Precision,
        Attribute::KernelFamily,
        Attribute::Kernel,
        Attribute::ArgM,
        Attribute::ArgN,
        Attribute::ArgK,
        Attribute::ArgAlpha,
        Attribute::ArgBeta,
    ];

    /// The name of the attribute in the database files.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Device => "device",
            Attribute::DeviceVendor => "device_vendor",
            Attribute::DeviceType => "device_type",
            Attribute::DeviceArchitecture => "device_architecture",
            Attribute::DeviceComputeUnits => "device_compute_units",
            Attribute::DeviceCoreClock => "device_core_clock",
            Attribute::Precision => "precision",
            Attribute::KernelFamily => "kernel_family",
            Attribute::Kernel => "kernel",
            Attribute::ArgM => "arg_m",
            Attribute::ArgN => "arg_n",
            Attribute::ArgK => "arg_k",
            Attribute::ArgAlpha => "arg_alpha",
            Attribute::ArgBeta => "arg_beta",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unknown attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAttribute(pub String);

impl fmt::Display for UnknownAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown attribute `{}`", self.0)
    }
}

impl std::error::Error for UnknownAttribute {}

impl FromStr for Attribute {
    type Err = UnknownAttribute;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .iter()
            .cloned()
            .find(|attr| attr.name() == name)
            .ok_or_else(|| UnknownAttribute(name.to_string()))
    }
}

impl std::convert::TryFrom<String> for Attribute {
    type Error = UnknownAttribute;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Attribute> for String {
    fn from(attr: Attribute) -> String {
        attr.name().to_string()
    }
}

/// A record that exposes identity attributes.
pub trait Record {
    /// Returns the value of the attribute, or `None` if it does not apply to this
    /// record.
    fn attribute(&self, attr: Attribute) -> Option<String>;

    /// Returns the values of the given attributes, in order.
    fn key(&self, attributes: &[Attribute]) -> GroupKey {
        GroupKey(attributes.iter().map(|&attr| self.attribute(attr)).collect())
    }
}

/// The values of a list of attributes on one record. Absent attributes are kept as
/// `None` so two records never share a key because of a missing attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(pub Vec<Option<String>>);

impl GroupKey {
    /// Iterates over the values of the attributes present in the key.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|value| value.as_ref().map(|s| s.as_str()))
    }
}

/// Displays the group identifier: present values separated by `;`.
impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.values().join(";"))
    }
}

/// Lists of attributes used to group the database at the different reduction steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    /// Attributes naming a family of devices (e.g. AMD GPUs).
    pub device_type: Vec<Attribute>,
    /// Attributes identifying a single device within its family.
    pub device: Vec<Attribute>,
    /// Attributes identifying the tuned kernel family and precision.
    pub kernel: Vec<Attribute>,
    /// Problem-shape arguments the kernel was tuned for.
    pub arguments: Vec<Attribute>,
}

impl Default for Schema {
    fn default() -> Self {
        Schema {
            device_type: vec![Attribute::DeviceVendor, Attribute::DeviceType],
            device: vec![
                Attribute::Device,
                Attribute::DeviceCoreClock,
                Attribute::DeviceComputeUnits,
            ],
            kernel: vec![Attribute::Precision, Attribute::KernelFamily],
            arguments: vec![
                Attribute::ArgM,
                Attribute::ArgN,
                Attribute::ArgK,
                Attribute::ArgAlpha,
                Attribute::ArgBeta,
            ],
        }
    }
}

impl Schema {
    /// Device, device type, kernel and argument attributes.
    pub fn attributes(&self) -> Vec<Attribute> {
        concat(&[&self.device, &self.device_type, &self.kernel, &self.arguments])
    }

    /// Attributes identifying the results of one device for one kernel.
    pub fn best_attributes(&self) -> Vec<Attribute> {
        let mut attributes = self.attributes();
        attributes.push(Attribute::Kernel);
        attributes.push(Attribute::DeviceArchitecture);
        attributes
    }

    /// Attributes of a kernel on a family of devices, across architectures.
    pub fn group_attributes(&self) -> Vec<Attribute> {
        concat(&[
            &self.device_type,
            &self.kernel,
            &[Attribute::Kernel],
            &self.arguments,
        ])
    }

    /// Attributes of a kernel on one architecture of a family of devices.
    pub fn architecture_attributes(&self) -> Vec<Attribute> {
        let mut attributes = self.group_attributes();
        attributes.push(Attribute::DeviceArchitecture);
        attributes
    }

    /// Attributes of a kernel on a family of devices, ignoring the arguments.
    pub fn mismatch_attributes(&self) -> Vec<Attribute> {
        concat(&[&self.device_type, &self.kernel, &[Attribute::Kernel]])
    }

    /// Attributes of a kernel regardless of the device.
    pub fn global_attributes(&self) -> Vec<Attribute> {
        concat(&[&self.kernel, &[Attribute::Kernel], &self.arguments])
    }
}

fn concat(lists: &[&[Attribute]]) -> Vec<Attribute> {
    lists.iter().flat_map(|list| list.iter().cloned()).collect()
}
