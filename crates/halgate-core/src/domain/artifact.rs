//! The closed set of artifact types the registry knows how to judge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::HalgateError;

/// One generated file kind.
///
/// The serialized form is the stable tag the generation layer uses
/// (`aidl`, `cpp`, `selinux`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArtifactType {
    /// AIDL interface definition.
    #[serde(rename = "aidl")]
    InterfaceDefinition,
    /// C++ VHAL service implementation.
    #[serde(rename = "cpp")]
    NativeService,
    /// SELinux `.te` policy.
    #[serde(rename = "selinux")]
    SecurityPolicy,
    /// Soong `Android.bp` build file.
    #[serde(rename = "build")]
    BuildDescriptor,
    /// VINTF manifest XML plus the companion init.rc section.
    #[serde(rename = "vintf")]
    ServiceManifest,
    /// PlantUML diagram source.
    #[serde(rename = "puml")]
    DiagramSource,
    /// Kotlin fragment driving the HAL from the app side.
    #[serde(rename = "android_app")]
    UiController,
    /// Android layout XML.
    #[serde(rename = "android_layout")]
    UiLayout,
    /// Python REST server (FastAPI style).
    #[serde(rename = "backend")]
    RestServer,
    /// Python data models (pydantic style).
    #[serde(rename = "backend_model")]
    DataModel,
    /// Python property simulator.
    #[serde(rename = "simulator")]
    Simulator,
    /// Markdown design document.
    #[serde(rename = "design_doc")]
    DesignDocument,
}

impl ArtifactType {
    /// Every registered type, in registry order.
    pub const ALL: [ArtifactType; 12] = [
        ArtifactType::InterfaceDefinition,
        ArtifactType::NativeService,
        ArtifactType::SecurityPolicy,
        ArtifactType::BuildDescriptor,
        ArtifactType::ServiceManifest,
        ArtifactType::DiagramSource,
        ArtifactType::UiController,
        ArtifactType::UiLayout,
        ArtifactType::RestServer,
        ArtifactType::DataModel,
        ArtifactType::Simulator,
        ArtifactType::DesignDocument,
    ];

    /// Stable tag for this type.
    pub fn tag(&self) -> &'static str {
        match self {
            ArtifactType::InterfaceDefinition => "aidl",
            ArtifactType::NativeService => "cpp",
            ArtifactType::SecurityPolicy => "selinux",
            ArtifactType::BuildDescriptor => "build",
            ArtifactType::ServiceManifest => "vintf",
            ArtifactType::DiagramSource => "puml",
            ArtifactType::UiController => "android_app",
            ArtifactType::UiLayout => "android_layout",
            ArtifactType::RestServer => "backend",
            ArtifactType::DataModel => "backend_model",
            ArtifactType::Simulator => "simulator",
            ArtifactType::DesignDocument => "design_doc",
        }
    }

    /// Tags of every registered type.
    pub fn valid_tags() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.tag()).collect()
    }

    /// Whether this type is one of the Python-source types sharing the
    /// syntax-tree validator.
    pub fn is_script(&self) -> bool {
        matches!(
            self,
            ArtifactType::RestServer | ArtifactType::DataModel | ArtifactType::Simulator
        )
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ArtifactType {
    type Err = HalgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == wanted)
            .ok_or_else(|| HalgateError::UnknownArtifactType {
                given: s.to_string(),
                valid: Self::valid_tags(),
            })
    }
}
