//! CLI commands and manifest loading

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use spire_entry::{ClusterSPIFFEID, ClusterSpiffeIdSpec};
use tracing::debug;

use crate::{Error, Result};

pub mod render;
pub mod validate;

/// Read a file, keeping the path in the error.
pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a single YAML document.
pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = read_file(path)?;
    serde_yaml::from_str(&contents).map_err(|source| Error::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every document of a `---` separated YAML stream.
///
/// Empty documents (a trailing `---`, say) are skipped.
pub fn load_yaml_documents<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let contents = read_file(path)?;
    let mut docs = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(&contents) {
        let value = serde_yaml::Value::deserialize(doc).map_err(|source| Error::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        if value.is_null() {
            continue;
        }
        docs.push(
            serde_yaml::from_value(value).map_err(|source| Error::Yaml {
                path: path.to_path_buf(),
                source,
            })?,
        );
    }
    debug!(path = %path.display(), documents = docs.len(), "Loaded YAML stream");
    Ok(docs)
}

/// Load a ClusterSPIFFEID spec.
///
/// Accepts either a full `ClusterSPIFFEID` manifest or its bare `spec`.
pub fn load_spec(path: &Path) -> Result<ClusterSpiffeIdSpec> {
    let value: serde_yaml::Value = load_yaml(path)?;
    let yaml_err = |source| Error::Yaml {
        path: path.to_path_buf(),
        source,
    };
    if value.get("spec").is_some() {
        let resource: ClusterSPIFFEID = serde_yaml::from_value(value).map_err(yaml_err)?;
        Ok(resource.spec)
    } else {
        serde_yaml::from_value(value).map_err(yaml_err)
    }
}
