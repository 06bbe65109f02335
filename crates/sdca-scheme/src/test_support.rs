//! Shared fixtures for unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use geojson::{Geometry, Value as GeometryValue};
use mockable::Clock;
use rstest::fixture;

use crate::lexicon::InterventionLexicon;

/// Clock pinned to a fixed instant.
pub(crate) struct FixtureClock {
    pub(crate) utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

#[fixture]
pub(crate) fn clock() -> Arc<dyn Clock> {
    let utc_now = Utc
        .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid fixture time");
    Arc::new(FixtureClock { utc_now })
}

#[fixture]
pub(crate) fn lexicon() -> InterventionLexicon {
    InterventionLexicon::from_json(
        r#"[
            {
                "infrastructure_type": "Rail",
                "mode_class": "Rail",
                "mode": "High speed rail",
                "intervention_class": "New build",
                "intervention_name": "High speed line",
                "intervention": "hsr_line",
                "geometry": "line"
            },
            {
                "infrastructure_type": "Rail",
                "mode_class": "Rail",
                "mode": "Heavy rail",
                "intervention_class": "New build",
                "intervention_name": "New station",
                "intervention": "rail_station",
                "geometry": "point"
            }
        ]"#,
    )
    .expect("fixture lexicon")
}

/// Roughly 1.11 km along the equator.
pub(crate) fn short_line() -> Geometry {
    Geometry::new(GeometryValue::LineString(vec![vec![0.0, 0.0], vec![0.01, 0.0]]))
}

pub(crate) fn station() -> Geometry {
    Geometry::new(GeometryValue::Point(vec![-1.5, 53.8]))
}
