//! Tests for the scheme assessment service.

use std::path::PathBuf;
use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{
    FixtureCarbonCalculator, FixtureReferenceDataRepository, FixtureSpatialRepository,
    MockCarbonCalculator, MockReferenceDataRepository, MockSpatialRepository,
};

type MockService =
    SchemeAssessmentService<MockReferenceDataRepository, MockSpatialRepository, MockCarbonCalculator>;

#[fixture]
fn lexicon() -> Arc<InterventionLexicon> {
    let lexicon = InterventionLexicon::from_json(
        &json!([{
            "infrastructure_type": "Rail",
            "mode_class": "Rail",
            "mode": "High speed rail",
            "intervention_class": "New build",
            "intervention_name": "High speed line",
            "intervention": "hsr_line"
        }])
        .to_string(),
    )
    .expect("fixture lexicon");
    Arc::new(lexicon)
}

fn scheme(type_index: Value) -> Scheme {
    Scheme::from_value(json!({
        "type": "FeatureCollection",
        "features": [{
            "_interventionTypeIndex": type_index,
            "type": "Feature",
            "properties": { "intervention": "hsr_line" },
            "geometry": { "type": "LineString", "coordinates": [[-1.5, 53.8], [-1.4, 53.9]] }
        }]
    }))
    .expect("scheme")
}

fn rows(value: Value) -> Vec<Row> {
    serde_json::from_value(value).expect("rows")
}

fn make_service(
    lexicon: Arc<InterventionLexicon>,
    reference: MockReferenceDataRepository,
    spatial: MockSpatialRepository,
    calculator: MockCarbonCalculator,
) -> MockService {
    SchemeAssessmentService::new(
        lexicon,
        Arc::new(reference),
        Arc::new(spatial),
        Arc::new(calculator),
    )
}

fn reference_with_one_asset() -> MockReferenceDataRepository {
    let mut reference = MockReferenceDataRepository::new();
    reference
        .expect_assets_for()
        .return_once(|_| Ok(rows(json!([{ "asset_id": 1, "intervention": "hsr_line" }]))));
    reference
        .expect_asset_parameters_for()
        .return_once(|_| Ok(Vec::new()));
    reference
        .expect_components_for()
        .return_once(|_| Ok(rows(json!([{ "asset_id": 1, "cf_name": "steel" }]))));
    reference
        .expect_carbon_factors_for()
        .return_once(|_| Ok(rows(json!([{ "cf_name": "steel", "factor": 1.5 }]))));
    reference
}

fn spatial_with_results() -> MockSpatialRepository {
    let mut spatial = MockSpatialRepository::new();
    spatial
        .expect_desire_lines_near()
        .withf(|buffers| buffers.len() == 1 && buffers[0].distance > 0.0)
        .return_once(|_| {
            Ok(rows(json!([{
                "from": "E02000001",
                "to": "E02000002",
                "rail": 12,
                "geometry": "{\"type\":\"LineString\",\"coordinates\":[[-1.5,53.8],[-1.45,53.85]]}"
            }])))
        });
    spatial.expect_material_site_distances().return_once(|_| {
        Ok(vec![
            MaterialSiteDistance { material_type: "steel".to_owned(), distance_km: 8.0 },
            MaterialSiteDistance { material_type: "steel".to_owned(), distance_km: 3.0 },
        ])
    });
    spatial
}

#[rstest]
#[tokio::test]
async fn calculate_assembles_payload_and_returns_result(lexicon: Arc<InterventionLexicon>) {
    let mut calculator = MockCarbonCalculator::new();
    calculator
        .expect_calculate()
        .withf(|payload| {
            let bytes = payload.to_json_bytes().expect("serialise");
            let value: Value = serde_json::from_slice(&bytes).expect("json");
            value["assets"].as_array().map(Vec::len) == Some(1)
                && value["carbon_factors"][0]["cf_name"] == json!("steel")
                && value["desire_lines"]["features"][0]["geometry"]["type"] == json!("LineString")
                && value["desire_lines"]["features"][0]["properties"]["rail"] == json!(12)
                && value["material_sites"] == json!([{ "type": "steel", "distance_km": 3.0 }])
                && value["path_dem"] == json!("/rasters/dem.tif")
        })
        .times(1)
        .return_once(|_| {
            CalculationResult::from_value(json!({ "payback_time": 12 }))
                .map_err(|err| CarbonCalculatorError::invalid_output(err.to_string()))
        });
    let service = make_service(
        lexicon,
        reference_with_one_asset(),
        spatial_with_results(),
        calculator,
    )
    .with_rasters(RasterPaths {
        dem: PathBuf::from("/rasters/dem.tif"),
        ..RasterPaths::default()
    });

    let result = service.calculate(&scheme(json!(0))).await.expect("assessed");

    assert_eq!(result.get("payback_time"), Some(&json!(12)));
}

#[rstest]
#[tokio::test]
async fn unknown_intervention_type_stops_before_any_query(lexicon: Arc<InterventionLexicon>) {
    let mut reference = MockReferenceDataRepository::new();
    reference.expect_assets_for().never();
    let mut calculator = MockCarbonCalculator::new();
    calculator.expect_calculate().never();
    let service = make_service(lexicon, reference, MockSpatialRepository::new(), calculator);

    let error = service
        .calculate(&scheme(json!(4)))
        .await
        .expect_err("rejected");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.details(), Some(&json!({ "feature": 0 })));
}

#[rstest]
#[tokio::test]
async fn database_failure_never_reaches_the_calculator(lexicon: Arc<InterventionLexicon>) {
    let mut reference = MockReferenceDataRepository::new();
    reference
        .expect_assets_for()
        .return_once(|_| Err(ReferenceDataRepositoryError::connection("refused")));
    let mut spatial = MockSpatialRepository::new();
    spatial.expect_desire_lines_near().never();
    let mut calculator = MockCarbonCalculator::new();
    calculator.expect_calculate().never();
    let service = make_service(lexicon, reference, spatial, calculator);

    let error = service
        .calculate(&scheme(json!(0)))
        .await
        .expect_err("rejected");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(error.message(), "Unable to connect to the database.");
    assert!(!error.message().contains("refused"));
}

#[rstest]
#[case(SpatialRepositoryError::resource_exhausted("out of memory"), ErrorCode::InterventionTooLarge)]
#[case(SpatialRepositoryError::query("syntax error"), ErrorCode::ServiceUnavailable)]
#[tokio::test]
async fn spatial_failures_map_to_domain_errors(
    lexicon: Arc<InterventionLexicon>,
    #[case] failure: SpatialRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut spatial = MockSpatialRepository::new();
    spatial
        .expect_desire_lines_near()
        .return_once(move |_| Err(failure));
    let mut calculator = MockCarbonCalculator::new();
    calculator.expect_calculate().never();
    let service = make_service(lexicon, reference_with_one_asset(), spatial, calculator);

    let error = service
        .calculate(&scheme(json!(0)))
        .await
        .expect_err("rejected");

    assert_eq!(error.code(), expected);
}

#[rstest]
#[case(CarbonCalculatorError::timeout(120_u64), ErrorCode::CalculationTimeout)]
#[case(CarbonCalculatorError::non_zero_exit("exit status: 1"), ErrorCode::CalculationFailed)]
#[case(CarbonCalculatorError::invalid_output("expected value"), ErrorCode::CalculationFailed)]
#[case(CarbonCalculatorError::payload_too_large(10_usize, 5_usize), ErrorCode::InterventionTooLarge)]
#[tokio::test]
async fn calculator_failures_map_to_domain_errors(
    lexicon: Arc<InterventionLexicon>,
    #[case] failure: CarbonCalculatorError,
    #[case] expected: ErrorCode,
) {
    let mut calculator = MockCarbonCalculator::new();
    calculator
        .expect_calculate()
        .times(1)
        .return_once(move |_| Err(failure));
    let service = make_service(
        lexicon,
        reference_with_one_asset(),
        spatial_with_results(),
        calculator,
    );

    let error = service
        .calculate(&scheme(json!(0)))
        .await
        .expect_err("rejected");

    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn material_sites_are_normalised(lexicon: Arc<InterventionLexicon>) {
    let service = make_service(
        lexicon,
        MockReferenceDataRepository::new(),
        spatial_with_results(),
        MockCarbonCalculator::new(),
    );

    let sites = service
        .material_sites(&scheme(json!(0)))
        .await
        .expect("sites");

    assert_eq!(
        sites,
        [MaterialSiteDistance { material_type: "steel".to_owned(), distance_km: 3.0 }]
    );
}

#[rstest]
#[tokio::test]
async fn locations_query_the_selected_tables(lexicon: Arc<InterventionLexicon>) {
    let mut spatial = MockSpatialRepository::new();
    spatial
        .expect_zones_in_view()
        .withf(|_, tables| *tables == TableSet::Beta)
        .times(1)
        .return_once(|_, _| Ok(rows(json!([{ "lsoa11": "E01000001", "geometry": null }]))));
    let service = make_service(
        lexicon,
        MockReferenceDataRepository::new(),
        spatial,
        MockCarbonCalculator::new(),
    );
    let bbox = Bbox::parse(Some("-2.6,51.4,-2.5,51.5")).expect("bbox");

    let zones = service
        .locations(&bbox, TableSet::Beta)
        .await
        .expect("zones");

    assert_eq!(zones.len(), 1);
}

#[rstest]
#[tokio::test]
async fn fixture_ports_produce_a_result(lexicon: Arc<InterventionLexicon>) {
    let service = SchemeAssessmentService::new(
        lexicon,
        Arc::new(FixtureReferenceDataRepository),
        Arc::new(FixtureSpatialRepository),
        Arc::new(FixtureCarbonCalculator),
    );

    let result = service.calculate(&scheme(json!("0"))).await.expect("assessed");

    assert!(result.get("pas2080").is_some());
}
