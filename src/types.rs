//! Closed option sets for the deployment context
//!
//! Each enum carries the exact literals accepted in the context file. Any
//! other literal is a validation error naming the allowed set.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Minimum TLS policy enforced on the domain endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum TlsSecurityPolicy {
    #[strum(serialize = "TLS_1_0")]
    #[serde(rename = "TLS_1_0")]
    Tls10,
    #[default]
    #[strum(serialize = "TLS_1_2")]
    #[serde(rename = "TLS_1_2")]
    Tls12,
    #[strum(serialize = "TLS_1_2_PFS")]
    #[serde(rename = "TLS_1_2_PFS")]
    Tls12Pfs,
}

/// EBS volume type for data nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EbsVolumeType {
    Standard,
    Io1,
    Io2,
    Gp2,
    #[default]
    Gp3,
    St1,
    Sc1,
}

impl EbsVolumeType {
    /// Whether provisioned IOPS may be set for this volume type
    pub fn supports_iops(&self) -> bool {
        matches!(self, Self::Io1 | Self::Io2 | Self::Gp3)
    }
}

/// What happens to the domain when its unit is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RemovalPolicy {
    Destroy,
    #[default]
    Retain,
    Snapshot,
}

/// Comma-separated list of every literal an enum accepts.
pub fn allowed_values<T: IntoEnumIterator + std::fmt::Display>() -> String {
    T::iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
