//! WFS request construction and GeoJSON feature decoding for the vector
//! backend.

use serde_json::{Map, Value};

use crate::error::FetchError;

/// A vector backend endpoint (GeoServer-style WFS URL).
#[derive(Debug, Clone)]
pub struct WfsEndpoint {
    base_url: String,
}

impl WfsEndpoint {
    /// Wrap a base WFS URL, e.g. `http://backend:8600/geoserver/wfs`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GetFeature URL filtered to one feature by its id attribute.
    pub fn feature_by_id_url(&self, type_name: &str, id_property: &str, id: &str) -> String {
        format!(
            "{}?service=WFS&version=1.1.0&request=GetFeature&typeName={}\
             &outputFormat=application/json&cql_filter={}",
            self.base_url,
            type_name,
            encode_component(&format!("{}='{}'", id_property, id))
        )
    }

    /// GetFeature URL listing selected properties of every feature in a
    /// layer (no geometry, used for place listings).
    pub fn list_features_url(&self, type_name: &str, properties: &[&str]) -> String {
        format!(
            "{}?service=WFS&version=1.1.0&request=GetFeature&typeName={}\
             &outputFormat=application/json&propertyName={}",
            self.base_url,
            type_name,
            properties.join(",")
        )
    }
}

/// One decoded GeoJSON feature.
#[derive(Debug, Clone)]
pub struct Feature {
    pub properties: Map<String, Value>,
    pub geometry: Option<Value>,
}

impl Feature {
    /// A string property, if present.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }
}

/// Decode a WFS GetFeature response body into its features.
///
/// Zero features is not an error here; the caller decides whether an empty
/// result means "unknown area" or just an empty listing.
pub fn parse_feature_collection(body: &Value) -> Result<Vec<Feature>, FetchError> {
    let features = body
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            FetchError::Decode("WFS response has no \"features\" array".to_string())
        })?;

    features
        .iter()
        .map(|feature| {
            let properties = match feature.get("properties") {
                Some(Value::Object(map)) => map.clone(),
                Some(Value::Null) | None => Map::new(),
                Some(other) => {
                    return Err(FetchError::Decode(format!(
                        "feature properties is not an object: {}",
                        other
                    )))
                }
            };
            let geometry = feature.get("geometry").filter(|g| !g.is_null()).cloned();
            Ok(Feature {
                properties,
                geometry,
            })
        })
        .collect()
}

/// Percent-encode a URL query component.
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}
