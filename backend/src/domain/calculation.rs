//! The JSON contract exchanged with the external carbon calculator.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{MaterialSiteDistance, ReferenceData, Row, Scheme};

/// Raster datasets the calculator samples along the scheme.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RasterPaths {
    /// Digital elevation model.
    pub dem: PathBuf,
    /// Land cover classification.
    pub landcover: PathBuf,
    /// Bedrock geology.
    pub bedrock: PathBuf,
    /// Superficial deposits.
    pub superficial: PathBuf,
}

/// Everything the calculator needs, written to its standard input.
///
/// The payload describes a user's design and is never logged or written to
/// disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationPayload {
    user_input: Value,
    assets: Vec<Row>,
    assets_parameters: Vec<Row>,
    components: Vec<Row>,
    carbon_factors: Vec<Row>,
    desire_lines: Value,
    material_sites: Vec<MaterialSiteDistance>,
    path_dem: PathBuf,
    path_landcover: PathBuf,
    path_bedrock: PathBuf,
    path_superficial: PathBuf,
}

impl CalculationPayload {
    /// Assembles the payload from pipeline outputs.
    ///
    /// `desire_lines` must already be a GeoJSON `FeatureCollection`.
    pub fn new(
        scheme: &Scheme,
        reference: ReferenceData,
        desire_lines: Value,
        material_sites: Vec<MaterialSiteDistance>,
        rasters: &RasterPaths,
    ) -> Self {
        Self {
            user_input: scheme.collection().clone(),
            assets: reference.assets,
            assets_parameters: reference.asset_parameters,
            components: reference.components,
            carbon_factors: reference.carbon_factors,
            desire_lines,
            material_sites,
            path_dem: rasters.dem.clone(),
            path_landcover: rasters.landcover.clone(),
            path_bedrock: rasters.bedrock.clone(),
            path_superficial: rasters.superficial.clone(),
        }
    }

    /// Serialises the payload as a single JSON document.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Calculator output could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("calculator output must be a JSON object, got {found}")]
pub struct NotAnObject {
    found: &'static str,
}

/// Calculator output: a JSON object passed to the client unmodified.
///
/// Known members include the `pas2080`, `timeseries`, `demand_change` and
/// `itemised_emissions` tables, summary scalars such as `netzero_compatible`,
/// `payback_time` and `emissions_whole_life`, and a `geometry` used to
/// annotate the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalculationResult(Map<String, Value>);

impl CalculationResult {
    /// Accepts `value` when it is an object.
    pub fn from_value(value: Value) -> Result<Self, NotAnObject> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(NotAnObject { found: "null" }),
            Value::Bool(_) => Err(NotAnObject { found: "a boolean" }),
            Value::Number(_) => Err(NotAnObject { found: "a number" }),
            Value::String(_) => Err(NotAnObject { found: "a string" }),
            Value::Array(_) => Err(NotAnObject { found: "an array" }),
        }
    }

    /// Member lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Unwraps the JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn scheme() -> Scheme {
        Scheme::from_value(json!({
            "type": "FeatureCollection",
            "features": [{
                "_interventionTypeIndex": 0,
                "type": "Feature",
                "properties": { "intervention": "hsr_line" },
                "geometry": { "type": "LineString", "coordinates": [[0.0, 51.0], [0.1, 51.1]] }
            }]
        }))
        .expect("scheme")
    }

    #[rstest]
    fn payload_uses_calculator_field_names() {
        let rasters = RasterPaths {
            dem: PathBuf::from("/data/dem.tif"),
            landcover: PathBuf::from("/data/landcover.tif"),
            bedrock: PathBuf::from("/data/bedrock.tif"),
            superficial: PathBuf::from("/data/superficial.tif"),
        };
        let payload = CalculationPayload::new(
            &scheme(),
            ReferenceData::default(),
            json!({ "type": "FeatureCollection", "features": [] }),
            vec![MaterialSiteDistance {
                material_type: "cement".to_owned(),
                distance_km: 2.5,
            }],
            &rasters,
        );

        let bytes = payload.to_json_bytes().expect("serialise");
        let value: Value = serde_json::from_slice(&bytes).expect("json");

        let keys: Vec<&String> = value.as_object().expect("object").keys().collect();
        assert_eq!(
            keys,
            [
                "user_input",
                "assets",
                "assets_parameters",
                "components",
                "carbon_factors",
                "desire_lines",
                "material_sites",
                "path_dem",
                "path_landcover",
                "path_bedrock",
                "path_superficial",
            ]
        );
        assert_eq!(value["user_input"], *scheme().collection());
        assert_eq!(value["material_sites"][0]["type"], json!("cement"));
        assert_eq!(value["path_dem"], json!("/data/dem.tif"));
    }

    #[rstest]
    #[case(json!([1, 2]))]
    #[case(json!("done"))]
    #[case(json!(null))]
    fn results_must_be_objects(#[case] value: Value) {
        assert!(CalculationResult::from_value(value).is_err());
    }

    #[rstest]
    fn results_pass_through_unmodified() {
        let raw = json!({ "payback_time": 14, "pas2080": [{ "pas2080_code": "A1-3" }] });

        let result = CalculationResult::from_value(raw.clone()).expect("object");

        assert_eq!(result.get("payback_time"), Some(&json!(14)));
        assert_eq!(result.into_value(), raw);
    }
}
