//! Kubernetes scale subresource types.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ScaleError;

/// The `autoscaling/v1` `Scale` document sent to the scale subresource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    pub kind: String,
    pub api_version: String,
    pub metadata: ScaleMetadata,
    pub spec: ScaleSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScaleMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScaleSpec {
    pub replicas: u32,
}

impl Scale {
    pub fn new(name: &str, replicas: u32) -> Self {
        Self {
            kind: "Scale".to_string(),
            api_version: "autoscaling/v1".to_string(),
            metadata: ScaleMetadata {
                name: name.to_string(),
            },
            spec: ScaleSpec { replicas },
        }
    }
}

/// Where the controlled Deployment lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRef {
    /// API server base, e.g. `https://kubernetes.default.svc`.
    pub api_base: String,
    pub namespace: String,
    pub name: String,
}

impl WorkloadRef {
    pub fn new(api_base: &str, namespace: &str, name: &str) -> Self {
        Self {
            api_base: api_base.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// URL of the Deployment's scale subresource.
    pub fn scale_url(&self) -> Result<Url, ScaleError> {
        let raw = format!(
            "{}/apis/apps/v1/namespaces/{}/deployments/{}/scale",
            self.api_base.trim_end_matches('/'),
            self.namespace,
            self.name
        );
        Url::parse(&raw).map_err(|e| ScaleError::Configuration(format!("invalid scale URL {raw}: {e}")))
    }
}
