//! Opaque reference-data rows and their GeoJSON view.
//!
//! Reference tables are read as JSON objects keyed by column name. The
//! pipeline never interprets most columns; it only needs to pick out join
//! keys and, for spatial layers, the `geometry` column.

use serde_json::{Map, Value, json};

/// One database row as a JSON object, columns in select order.
pub type Row = Map<String, Value>;

/// Failures converting rows into a `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowGeometryError {
    /// A string geometry column did not hold GeoJSON.
    #[error("row {index} geometry is not valid GeoJSON: {message}")]
    Unparseable {
        /// Row position.
        index: usize,
        /// Parser message.
        message: String,
    },
    /// The geometry column held neither text, an object nor null.
    #[error("row {index} geometry has unsupported JSON type")]
    UnsupportedType {
        /// Row position.
        index: usize,
    },
}

/// Reinterprets `rows` as a GeoJSON `FeatureCollection`.
///
/// The `geometry` column of each row becomes the feature geometry, decoded
/// when stored as text. Every other column goes under `properties`. A row
/// without a geometry column yields a feature with a null geometry.
///
/// # Examples
/// ```
/// use sdca_backend::domain::{Row, feature_collection};
/// use serde_json::json;
///
/// let row: Row = serde_json::from_value(json!({
///     "lsoa11": "E01014485",
///     "geometry": "{\"type\":\"Point\",\"coordinates\":[-2.6,51.4]}"
/// }))
/// .expect("row");
/// let collection = feature_collection(&[row]).expect("valid geometry");
/// assert_eq!(collection["features"][0]["geometry"]["type"], "Point");
/// assert_eq!(collection["features"][0]["properties"]["lsoa11"], "E01014485");
/// ```
pub fn feature_collection(rows: &[Row]) -> Result<Value, RowGeometryError> {
    let features = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut properties = row.clone();
            let geometry = match properties.remove("geometry") {
                None | Some(Value::Null) => Value::Null,
                Some(Value::String(text)) => serde_json::from_str(&text).map_err(|e| {
                    RowGeometryError::Unparseable {
                        index,
                        message: e.to_string(),
                    }
                })?,
                Some(object @ Value::Object(_)) => object,
                Some(_) => return Err(RowGeometryError::UnsupportedType { index }),
            };
            Ok(json!({
                "type": "Feature",
                "geometry": geometry,
                "properties": properties,
            }))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}
