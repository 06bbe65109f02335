//! Query-parameter validation for the data API.
//!
//! A request names a call (the `{call}` path segment, optionally carrying a
//! format extension such as `locations.json`) and supplies loose query
//! parameters. [`validate`] turns them into an [`ApiRequest`] or the first
//! validation [`Error`], before any database or process work happens.
//!
//! Checks run in a fixed order: documentation shortcut, format, action,
//! format support, viewport, scheme.

use super::{Error, Scheme, SchemeError};

/// Wire format of a data response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFormat {
    /// JSON passthrough.
    Json,
    /// GeoJSON `FeatureCollection` attachment.
    Geojson,
    /// CSV attachment.
    Csv,
}

impl ApiFormat {
    /// Parses a format name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Self::Json),
            "geojson" => Some(Self::Geojson),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Lower-case format name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Geojson => "geojson",
            Self::Csv => "csv",
        }
    }
}

/// The closed set of API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiAction {
    /// Run the full carbon calculation for a scheme.
    Calculate,
    /// Desire lines near a scheme.
    DesireLines,
    /// Nearest material site of each type to a scheme.
    MaterialSites,
    /// Carbon zones inside the map viewport.
    Locations,
    /// HTML documentation of the other calls.
    Documentation,
}

impl ApiAction {
    /// Every data call, in documentation order.
    pub const DATA_CALLS: [Self; 4] = [
        Self::Calculate,
        Self::DesireLines,
        Self::MaterialSites,
        Self::Locations,
    ];

    /// Parses a call name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "calculate" => Some(Self::Calculate),
            "desirelines" => Some(Self::DesireLines),
            "materialsites" => Some(Self::MaterialSites),
            "locations" => Some(Self::Locations),
            "documentation" => Some(Self::Documentation),
            _ => None,
        }
    }

    /// Call name as used in URLs and attachment names.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Calculate => "calculate",
            Self::DesireLines => "desirelines",
            Self::MaterialSites => "materialsites",
            Self::Locations => "locations",
            Self::Documentation => "documentation",
        }
    }

    /// Formats this call can be rendered in.
    pub const fn supported_formats(self) -> &'static [ApiFormat] {
        match self {
            Self::Calculate => &[ApiFormat::Json],
            Self::DesireLines | Self::Locations => {
                &[ApiFormat::Json, ApiFormat::Geojson, ApiFormat::Csv]
            }
            Self::MaterialSites => &[ApiFormat::Json, ApiFormat::Csv],
            Self::Documentation => &[],
        }
    }

    /// Whether `format` is supported by this call.
    pub fn supports(self, format: ApiFormat) -> bool {
        self.supported_formats().contains(&format)
    }

    /// Whether `bbox` and `zoom` must be supplied.
    pub const fn requires_viewport(self) -> bool {
        matches!(self, Self::Locations)
    }

    /// Whether a scheme (`geojson` or `line`) must be supplied.
    pub const fn requires_scheme(self) -> bool {
        matches!(
            self,
            Self::Calculate | Self::DesireLines | Self::MaterialSites
        )
    }
}

/// Bounding box of the map canvas in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    /// Western longitude.
    pub west: f64,
    /// Southern latitude.
    pub south: f64,
    /// Eastern longitude.
    pub east: f64,
    /// Northern latitude.
    pub north: f64,
}

impl Bbox {
    /// Parses `w,s,e,n`.
    ///
    /// # Examples
    /// ```
    /// use sdca_backend::domain::Bbox;
    ///
    /// let bbox = Bbox::parse(Some("-2.6404,51.4698,-2.5417,51.4926")).expect("valid bbox");
    /// assert_eq!(bbox.west, -2.6404);
    /// assert!(Bbox::parse(Some("1,2,3")).is_err());
    /// ```
    pub fn parse(raw: Option<&str>) -> Result<Self, Error> {
        let text = raw
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::invalid_request("No bbox was supplied."))?;
        let invalid = || Error::invalid_request("An invalid bbox was supplied.");
        if text.matches(',').count() != 3 {
            return Err(invalid());
        }
        let values = text
            .split(',')
            .map(parse_number)
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(invalid)?;
        match values.as_slice() {
            [west, south, east, north] => Ok(Self {
                west: *west,
                south: *south,
                east: *east,
                north: *north,
            }),
            _ => Err(invalid()),
        }
    }
}

/// Map zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom(f64);

impl Zoom {
    /// Parses a numeric zoom.
    pub fn parse(raw: Option<&str>) -> Result<Self, Error> {
        let text = raw
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::invalid_request("No zoom was supplied."))?;
        parse_number(text)
            .map(Self)
            .ok_or_else(|| Error::invalid_request("An invalid zoom was supplied."))
    }

    /// Zoom as a float.
    pub const fn value(self) -> f64 {
        self.0
    }
}

/// Map viewport sent by the client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Visible area.
    pub bbox: Bbox,
    /// Zoom level.
    pub zoom: Zoom,
}

/// Which family of zone tables to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableSet {
    /// Published tables.
    #[default]
    Standard,
    /// Alternative tables prefixed with `alt_`, selected by `beta=1`.
    Beta,
}

impl TableSet {
    /// Table name prefix.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Standard => "",
            Self::Beta => "alt_",
        }
    }
}

/// Unvalidated query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParameters {
    /// `format`
    pub format: Option<String>,
    /// `bbox`
    pub bbox: Option<String>,
    /// `zoom`
    pub zoom: Option<String>,
    /// `geojson`
    pub geojson: Option<String>,
    /// `line`
    pub line: Option<String>,
    /// `beta`
    pub beta: Option<String>,
}

/// Validated data operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOperation {
    /// Full calculation.
    Calculate(Scheme),
    /// Desire-line selection.
    DesireLines(Scheme),
    /// Material-site distances.
    MaterialSites(Scheme),
    /// Zones in view.
    Locations {
        /// Requested viewport.
        viewport: Viewport,
        /// Table family.
        tables: TableSet,
    },
}

impl ApiOperation {
    /// The call this operation answers.
    pub const fn action(&self) -> ApiAction {
        match self {
            Self::Calculate(_) => ApiAction::Calculate,
            Self::DesireLines(_) => ApiAction::DesireLines,
            Self::MaterialSites(_) => ApiAction::MaterialSites,
            Self::Locations { .. } => ApiAction::Locations,
        }
    }
}

/// Result of request validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    /// Render the documentation page.
    Documentation,
    /// Run a data operation and render it in `format`.
    Data {
        /// Output format.
        format: ApiFormat,
        /// Operation to run.
        operation: ApiOperation,
    },
}

/// Validates a call and its parameters.
///
/// # Examples
/// ```
/// use sdca_backend::domain::{ApiFormat, ApiRequest, RawParameters, validate};
///
/// let params = RawParameters {
///     bbox: Some("-2.64,51.46,-2.54,51.49".into()),
///     zoom: Some("15".into()),
///     ..RawParameters::default()
/// };
/// let request = validate("locations.csv", &params).expect("valid request");
/// assert!(matches!(request, ApiRequest::Data { format: ApiFormat::Csv, .. }));
/// ```
pub fn validate(call: &str, params: &RawParameters) -> Result<ApiRequest, Error> {
    let (name, extension) = match call.rsplit_once('.') {
        Some((name, extension)) => (name, Some(extension)),
        None => (call, None),
    };
    if name == ApiAction::Documentation.name() {
        return Ok(ApiRequest::Documentation);
    }

    let format_name = params
        .format
        .as_deref()
        .filter(|format| !format.is_empty())
        .or(extension.filter(|ext| !ext.is_empty()))
        .ok_or_else(|| Error::invalid_request("No API format was specified."))?;
    let format = ApiFormat::from_name(format_name)
        .ok_or_else(|| Error::invalid_request("An invalid API format was specified."))?;

    if name.is_empty() {
        return Err(Error::invalid_request("No API call was specified."));
    }
    let action = ApiAction::from_name(name)
        .ok_or_else(|| Error::invalid_request("An invalid API call was specified."))?;
    if !action.supports(format) {
        return Err(Error::invalid_request("An invalid API format was specified."));
    }

    let operation = match action {
        ApiAction::Locations => ApiOperation::Locations {
            viewport: Viewport {
                bbox: Bbox::parse(params.bbox.as_deref())?,
                zoom: Zoom::parse(params.zoom.as_deref())?,
            },
            tables: if params.beta.as_deref() == Some("1") {
                TableSet::Beta
            } else {
                TableSet::Standard
            },
        },
        ApiAction::Calculate => ApiOperation::Calculate(scheme_from(params)?),
        ApiAction::DesireLines => ApiOperation::DesireLines(scheme_from(params)?),
        ApiAction::MaterialSites => ApiOperation::MaterialSites(scheme_from(params)?),
        ApiAction::Documentation => return Ok(ApiRequest::Documentation),
    };
    Ok(ApiRequest::Data { format, operation })
}

fn scheme_from(params: &RawParameters) -> Result<Scheme, Error> {
    let parsed = match (params.geojson.as_deref(), params.line.as_deref()) {
        (Some(geojson), _) if !geojson.is_empty() => Scheme::from_geojson(geojson),
        (_, Some(line)) if !line.is_empty() => Scheme::from_line(line),
        _ => return Err(Error::invalid_request("No scheme was supplied.")),
    };
    parsed.map_err(scheme_error)
}

fn scheme_error(error: SchemeError) -> Error {
    let invalid = Error::invalid_request(format!("An invalid scheme was supplied: {error}."));
    match error.feature_index() {
        Some(index) => invalid.with_details(serde_json::json!({ "feature": index })),
        None => invalid,
    }
}

/// Decimal or exponent notation, surrounding whitespace tolerated, finite
/// values only.
fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
