//! HTML documentation of the data API, served as the `documentation` call.

use std::fmt::Write as _;

use crate::domain::{ApiAction, ApiFormat};

/// One documented request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDoc {
    /// Query parameter name.
    pub name: &'static str,
    /// Value type shown next to the name.
    pub kind: &'static str,
    /// Expected shape, when there is one.
    pub values: Option<&'static str>,
    /// Description.
    pub description: &'static str,
}

/// Documentation for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDoc {
    /// Call being documented.
    pub action: ApiAction,
    /// Display name.
    pub name: &'static str,
    /// Example request URL.
    pub example: String,
    /// Required query parameters.
    pub fields: Vec<FieldDoc>,
}

const BBOX: FieldDoc = FieldDoc {
    name: "bbox",
    kind: "string",
    values: Some("w,s,e,n"),
    description: "Bounding box of the map canvas.",
};

const ZOOM: FieldDoc = FieldDoc {
    name: "zoom",
    kind: "int",
    values: None,
    description: "Zoom level of the map.",
};

const GEOJSON: FieldDoc = FieldDoc {
    name: "geojson",
    kind: "string",
    values: Some("GeoJSON FeatureCollection"),
    description: "The drawn scheme. Each feature carries an _interventionTypeIndex \
                  property. A bare coordinate array may be sent as line instead.",
};

const EXAMPLE_SCHEME: &str = "geojson=%7B%22type%22%3A%22FeatureCollection%22%2C%22features%22%3A%5B%7B%22_interventionTypeIndex%22%3A0%2C%22type%22%3A%22Feature%22%2C%22properties%22%3A%7B%22intervention%22%3A%22hsr_line%22%7D%2C%22geometry%22%3A%7B%22type%22%3A%22LineString%22%2C%22coordinates%22%3A%5B%5B-2.6%2C51.45%5D%2C%5B-2.55%2C51.47%5D%5D%7D%7D%5D%7D";

fn scheme_call(action: ApiAction, name: &'static str) -> CallDoc {
    CallDoc {
        action,
        name,
        example: format!("/api/v1/{}.json?{EXAMPLE_SCHEME}", action.name()),
        fields: vec![GEOJSON],
    }
}

/// Documentation entries for every data call, in display order.
pub fn call_docs() -> Vec<CallDoc> {
    ApiAction::DATA_CALLS
        .into_iter()
        .filter_map(|action| match action {
            ApiAction::Calculate => Some(scheme_call(action, "Carbon assessment of a scheme")),
            ApiAction::DesireLines => {
                Some(scheme_call(action, "Travel desire lines near a scheme"))
            }
            ApiAction::MaterialSites => {
                Some(scheme_call(action, "Nearest material sites to a scheme"))
            }
            ApiAction::Locations => Some(CallDoc {
                action,
                name: "Carbon zones in the map view",
                example: "/api/v1/locations.json?bbox=-2.6404,51.4698,-2.5417,51.4926&zoom=15"
                    .to_owned(),
                fields: vec![BBOX, ZOOM],
            }),
            ApiAction::Documentation => None,
        })
        .collect()
}

/// Minimal HTML text escaping for attribute and element content.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const STYLE: &str = r#"
<style type="text/css">
	body {max-width: 1000px; margin: 0 auto; font-family: arial;}
	div.apicall {border-top: 1px solid gray; padding: 20px 0; margin-bottom: 20px;}
	h1 {margin: 1.5em 0 1em;}
	h2 a {font-size: 0.6em; color: #ccc; text-decoration: none; font-weight: normal;}
	dl dt {margin-top: 1.2em; margin-bottom: 0.5em;}
	dl dt tt {margin-left: 0.5em; font-style: italic;}
	.example {padding: 10px 10px 10px 15px; background-color: #eee;}
	.example p:first-child {text-transform: uppercase; float: right; padding: 0; margin: 0; color: #999; font-size: 0.74em;}
</style>
"#;

fn formats_text(action: ApiAction) -> String {
    action
        .supported_formats()
        .iter()
        .map(|format| format!("<tt>.{}</tt>", format.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the documentation page.
///
/// # Examples
/// ```
/// use sdca_backend::inbound::http::documentation::render;
///
/// let html = render();
/// assert!(html.contains("<h1>SDCA API documentation</h1>"));
/// assert!(html.contains("href=\"#locations\""));
/// ```
pub fn render() -> String {
    let docs = call_docs();
    let mut html = String::from(STYLE);
    html.push_str("\n<h1>SDCA API documentation</h1>");
    html.push_str("\n<p>Welcome to the API for the SDCA project.</p>");
    html.push_str("\n<p>Please note that this API is subject to change without notice.</p>");
    let _ = write!(
        html,
        "\n<p>Append <tt>.{}</tt>, <tt>.{}</tt> or <tt>.{}</tt> to the call, or pass \
         <tt>&amp;format=</tt>, to choose the output format. The examples below use JSON.</p>",
        ApiFormat::Json.name(),
        ApiFormat::Geojson.name(),
        ApiFormat::Csv.name(),
    );

    html.push_str("\n<p>Jump to:</p>\n<ul>");
    for doc in &docs {
        let _ = write!(
            html,
            "\n\t<li><a href=\"#{}\">{}</a></li>",
            doc.action.name(),
            escape_html(doc.name)
        );
    }
    html.push_str("\n</ul>");

    for doc in &docs {
        let call = doc.action.name();
        let example = escape_html(&doc.example);
        let _ = write!(
            html,
            "\n<div class=\"apicall\">\
             \n<h2 id=\"{call}\"><a href=\"#{call}\">#</a> {name}</h2>\
             \n<p><pre>/api/v1/{call}.json</pre></p>\
             \n<p>Formats: {formats}</p>\
             \n<div class=\"example\">\n<p>Example</p>\n<p><a href=\"{example}\">{example}</a></p>\n</div>\
             \n<h3>Required fields</h3>",
            name = escape_html(doc.name),
            formats = formats_text(doc.action),
        );
        if doc.fields.is_empty() {
            html.push_str("\n<p>None.</p>");
        } else {
            html.push_str("\n<dl>");
            for field in &doc.fields {
                let values = field
                    .values
                    .map(|values| format!(", {}", escape_html(values)))
                    .unwrap_or_default();
                let _ = write!(
                    html,
                    "\n<dt>{} <tt>{}{}</tt></dt>\n<dd>{}</dd>",
                    field.name,
                    escape_html(field.kind),
                    values,
                    escape_html(field.description)
                );
            }
            html.push_str("\n</dl>");
        }
        html.push_str("\n</div>");
    }
    html
}
