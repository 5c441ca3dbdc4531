//! MapMaker server API

use crate::app_state::{AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::error::MapMakerError;
use crate::metrics;
use crate::models::{
    GlobeDataQuery, GridSnapshot, LineDataQuery, MapDataQuery, Selection, Source,
    TimeSeriesRecord,
};
use crate::operation::Operation;
use crate::operations::snapshot::ReadSnapshot;
use crate::operations::timeseries::ExtractSeries;
use crate::validated_query::ValidatedQuery;

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower::Layer;
use tower::ServiceBuilder;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Value of the `Cache-Control` header on API responses
const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Application service
pub type Service = NormalizePath<Router>;

/// Returns a [Service] with all routes.
///
/// Trailing slashes are stripped from request paths before routing.
pub fn service(args: &CommandLineArgs) -> Service {
    let state = Arc::new(AppState::new(args));
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// Returns a [axum::Router] with all routes.
pub fn router(state: SharedAppState) -> Router {
    fn api(state: SharedAppState) -> Router {
        Router::new()
            .route("/globe-data", get(globe_data))
            .route("/map-data", get(map_data))
            .route("/line-data", get(line_data))
            .layer(
                ServiceBuilder::new()
                    .layer(SetResponseHeaderLayer::overriding(
                        header::CACHE_CONTROL,
                        HeaderValue::from_static(NO_CACHE),
                    ))
                    .layer(SetResponseHeaderLayer::overriding(
                        header::PRAGMA,
                        HeaderValue::from_static("no-cache"),
                    ))
                    .layer(SetResponseHeaderLayer::overriding(
                        header::EXPIRES,
                        HeaderValue::from_static("0"),
                    )),
            )
            .with_state(state)
    }

    Router::new()
        .nest("/api", api(state))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            TraceLayer::new_for_http()
                .on_request(metrics::request_counter)
                .on_response(metrics::record_response_metrics),
        )
}

/// Run a dataset operation on a worker thread while holding the dataset lock.
///
/// The lock permit moves onto the worker with the operation and is released when the worker
/// finishes, whatever the outcome.
async fn run<O: Operation>(
    state: &AppState,
    operation: O,
) -> Result<Json<O::Output>, MapMakerError> {
    let permit = state.resource_manager.dataset().await?;
    let task = move || {
        let _permit = permit;
        operation.execute()
    };
    let output = if state.args.use_rayon {
        tokio_rayon::spawn(task).await
    } else {
        tokio::task::spawn_blocking(task).await?
    }?;
    Ok(Json(output))
}

/// Handler for the global overview map.
///
/// The `index` parameter names an environmental parameter or an ecological index depending on
/// the source.
#[tracing::instrument(skip(state))]
async fn globe_data(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<GlobeDataQuery>,
) -> Result<Json<GridSnapshot>, MapMakerError> {
    let descriptor = match query.source {
        Source::Env => {
            state
                .catalog
                .resolve_environmental(&query.index, &query.scenario, &query.model)?
        }
        Source::Plankton => state.catalog.resolve_grid(
            &query.index,
            query.group(),
            &query.scenario,
            &query.model,
        )?,
    };
    run(
        &state,
        ReadSnapshot {
            path: descriptor.path,
            variable: descriptor.variable,
            year: Some(query.year),
        },
    )
    .await
}

/// Handler for the regional map of an ecological index.
#[tracing::instrument(skip(state))]
async fn map_data(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<MapDataQuery>,
) -> Result<Json<GridSnapshot>, MapMakerError> {
    let descriptor =
        state
            .catalog
            .resolve_grid(&query.index, query.group(), &query.scenario, &query.model)?;
    run(
        &state,
        ReadSnapshot {
            path: descriptor.path,
            variable: descriptor.variable,
            year: Some(query.year),
        },
    )
    .await
}

/// Handler for the time series of an ecological index, optionally paired with an environmental
/// parameter.
#[tracing::instrument(skip(state))]
async fn line_data(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<LineDataQuery>,
) -> Result<Json<TimeSeriesRecord>, MapMakerError> {
    let selection = Selection::try_from(&query)?;
    let primary =
        state
            .catalog
            .resolve_grid(&query.index, query.group(), &query.scenario, &query.model)?;
    let environmental = query
        .env_param()
        .map(|parameter| {
            state
                .catalog
                .resolve_environmental(parameter, &query.scenario, &query.model)
        })
        .transpose()?;
    run(
        &state,
        ExtractSeries {
            primary,
            selection,
            years: query.years(),
            environmental,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use clap::Parser;
    use regex::Regex;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    fn args(data_dir: &std::path::Path, use_rayon: bool) -> CommandLineArgs {
        let mut args = CommandLineArgs::try_parse_from(["mapmaker"]).unwrap();
        args.data_dir = data_dir.to_path_buf();
        args.use_rayon = use_rayon;
        args
    }

    async fn get_with(args: &CommandLineArgs, uri: &str) -> Response {
        service(args)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    // Request `uri` against a data directory holding every fixture.
    async fn get(uri: &str) -> (StatusCode, Value) {
        let dir = tempfile::tempdir().unwrap();
        test_utils::write_catalog(dir.path());
        let response = get_with(&args(dir.path(), false), uri).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn error_message(body: &Value) -> String {
        body["error"]["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn globe_data_environmental() {
        let (status, body) =
            get("/api/globe-data?scenario=RCP26&model=Model%20Mean&index=Temperature&year=2013")
                .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!([-10.0, 0.0, 10.0]), body["lats"]);
        assert_eq!(json!([0.0, 10.0, 20.0, 30.0]), body["lons"]);
        assert_eq!(json!([21.0, 21.0, 21.0, 21.0]), body["variable"][0]);
        assert_eq!("Viridis", body["colorscale"]);
        assert_eq!(json!(20.0), body["minValue"]);
        assert_eq!(json!(24.0), body["maxValue"]);
    }

    #[tokio::test]
    async fn globe_data_plankton() {
        let (status, body) = get(
            "/api/globe-data?source=plankton&scenario=RCP26&model=Model%20Mean\
             &index=Change%20in%20HSI&group=Total%20Plankton",
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("Picnic", body["colorscale"]);
        assert_eq!(json!(-3.0), body["minValue"]);
        assert_eq!(json!(3.0), body["maxValue"]);
    }

    #[tokio::test]
    async fn globe_data_invalid_source() {
        let (status, body) =
            get("/api/globe-data?source=ocean&scenario=RCP26&model=Model%20Mean&index=Temperature")
                .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!("request data is not valid", error_message(&body));
    }

    #[tokio::test]
    async fn map_data_missing_value() {
        let (status, body) = get(
            "/api/map-data?year=2012&index=Habitat%20Suitability%20Index%20(HSI)\
             &group=Total%20Plankton&scenario=RCP%202.6%20(Paris%20Agreement)&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(Value::Null, body["variable"][0][0]);
        assert_eq!(json!(10.25), body["variable"][1][0]);
    }

    #[tokio::test]
    async fn map_data_biomes_without_group() {
        let (status, body) =
            get("/api/map-data?year=2050&index=Biomes&scenario=RCP26&model=GFDL-ESM2M").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!([1.0, 2.0, 3.0, 1.0]), body["variable"][0]);
    }

    #[tokio::test]
    async fn map_data_missing_group() {
        let (status, body) =
            get("/api/map-data?index=Species%20Turnover&scenario=RCP26&model=Model%20Mean").await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!("group must be provided", error_message(&body));
    }

    #[tokio::test]
    async fn map_data_unknown_scenario() {
        let (status, body) = get(
            "/api/map-data?index=Species%20Turnover&group=Diatoms&scenario=RCP99&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(r#"unknown scenario "RCP99""#, error_message(&body));
    }

    #[tokio::test]
    async fn map_data_year_out_of_range() {
        let (status, body) = get(
            "/api/map-data?year=2100&index=Change%20in%20HSI&group=Total%20Plankton\
             &scenario=RCP26&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(
            "year 2100 is outside the available range 2012-2015",
            error_message(&body)
        );
    }

    #[tokio::test]
    async fn map_data_dataset_unavailable() {
        let (status, body) = get(
            "/api/map-data?index=Species%20Richness&group=Diatoms&scenario=RCP26&model=CNRM-CM5",
        )
        .await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);
        let re =
            Regex::new(r"^dataset .*Presence_Data_for_App_CNRM-PISCES_RCP26\.nc is unavailable$")
                .unwrap();
        let message = error_message(&body);
        assert!(re.is_match(&message), "message: {message}");
    }

    #[tokio::test]
    async fn line_data_point_with_environment() {
        let (status, body) = get(
            "/api/line-data?x=10&y=0&startYear=2012&endYear=2015\
             &index=Habitat%20Suitability%20Index%20(HSI)&group=Total%20Plankton\
             &scenario=RCP26&model=Model%20Mean&envParam=Temperature",
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!([2012, 2013, 2014, 2015]), body["years"]);
        assert_eq!("hsiTot", body["variable"]["name"]);
        assert_eq!(
            json!([110.25, 111.25, 112.25, 113.25]),
            body["variable"]["values"]
        );
        assert_eq!(json!([0.0, 0.0, 0.0, 0.0]), body["variable"]["std"]);
        assert_eq!(4, body["variable"]["trend"].as_array().unwrap().len());
        assert_eq!("SST", body["environmental_variable"]["name"]);
        assert_eq!(
            json!([20.5, 21.5, 22.5, 23.5]),
            body["environmental_variable"]["values"]
        );
    }

    #[tokio::test]
    async fn globe_data_difference_scenario() {
        let dir = tempfile::tempdir().unwrap();
        test_utils::write_environmental(dir.path());
        let response = get_with(
            &args(dir.path(), false),
            "/api/globe-data?scenario=RCP%208.5%20-%20RCP2.6&model=Model%20Mean\
             &index=Temperature&year=2013",
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let body = body_json(response).await;
        assert_eq!(json!([1.5, 1.5, 1.5, 1.5]), body["variable"][0]);
    }

    #[tokio::test]
    async fn line_data_box_without_environment() {
        let (status, body) = get(
            "/api/line-data?xMin=0&xMax=10&yMin=-10&yMax=0&startYear=2012&endYear=2013\
             &index=Habitat%20Suitability%20Index%20(HSI)&group=Total%20Plankton\
             &scenario=RCP26&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!([73.58, 56.25]), body["variable"]["values"]);
        assert_eq!(Value::Null, body["environmental_variable"]);
    }

    #[tokio::test]
    async fn line_data_missing_value_trend() {
        let (status, body) = get(
            "/api/line-data?x=0&y=-10\
             &index=Habitat%20Suitability%20Index%20(HSI)&group=Total%20Plankton\
             &scenario=RCP26&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!([2012, 2013, 2014, 2015]), body["years"]);
        assert_eq!(json!([null]), body["variable"]["trend"]);
    }

    #[tokio::test]
    async fn line_data_invalid_selection() {
        let (status, body) = get(
            "/api/line-data?x=10&yMin=0&index=Change%20in%20HSI&group=Diatoms\
             &scenario=RCP26&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(
            "either (x, y) or (xMin, xMax, yMin, yMax) must be provided",
            error_message(&body)
        );
    }

    #[tokio::test]
    async fn line_data_start_after_end() {
        let (status, body) = get(
            "/api/line-data?x=10&y=0&startYear=2015&endYear=2013&index=Change%20in%20HSI\
             &group=Diatoms&scenario=RCP26&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!("request data is not valid", error_message(&body));
    }

    #[tokio::test]
    async fn line_data_extreme_year_range() {
        let (status, body) = get(
            "/api/line-data?x=10&y=0&startYear=-2147483648&endYear=2147483647\
             &index=Change%20in%20HSI&group=Total%20Plankton&scenario=RCP26&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!("request data is not valid", error_message(&body));
    }

    #[tokio::test]
    async fn line_data_end_year_before_first_year() {
        let (status, body) = get(
            "/api/line-data?x=10&y=0&endYear=2005&index=Change%20in%20HSI\
             &group=Total%20Plankton&scenario=RCP26&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(
            "year 2005 is outside the available range 2012-2015",
            error_message(&body)
        );
    }

    #[tokio::test]
    async fn line_data_unknown_env_param() {
        let (status, body) = get(
            "/api/line-data?x=10&y=0&index=Change%20in%20HSI&group=Diatoms\
             &scenario=RCP26&model=Model%20Mean&envParam=Salinity",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(
            r#"unknown environmental parameter "Salinity""#,
            error_message(&body)
        );
    }

    #[tokio::test]
    async fn responses_disable_caching() {
        let dir = tempfile::tempdir().unwrap();
        test_utils::write_catalog(dir.path());
        for uri in [
            "/api/map-data?index=Biomes&scenario=RCP26&model=Model%20Mean",
            "/api/map-data?index=Biomes&scenario=RCP99&model=Model%20Mean",
        ] {
            let response = get_with(&args(dir.path(), false), uri).await;
            let headers = response.headers();
            assert_eq!(NO_CACHE, headers[header::CACHE_CONTROL]);
            assert_eq!("no-cache", headers[header::PRAGMA]);
            assert_eq!("0", headers[header::EXPIRES]);
        }
    }

    #[tokio::test]
    async fn trailing_slash_and_rayon() {
        let dir = tempfile::tempdir().unwrap();
        test_utils::write_catalog(dir.path());
        let response = get_with(
            &args(dir.path(), true),
            "/api/map-data/?index=Biomes&scenario=RCP26&model=Model%20Mean",
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(
            mime::APPLICATION_JSON.as_ref(),
            response.headers()[header::CONTENT_TYPE]
        );
    }

    #[tokio::test]
    async fn concurrent_requests_share_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        test_utils::write_catalog(dir.path());
        let state = Arc::new(AppState::new(&args(dir.path(), false)));
        let uri = "/api/map-data?year=2014&index=Change%20in%20HSI&group=Total%20Plankton\
                   &scenario=RCP26&model=Model%20Mean";
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
                tokio::spawn(router(state.clone()).oneshot(request))
            })
            .collect();
        let mut bodies = vec![];
        for handle in handles {
            let response = handle.await.unwrap().unwrap();
            assert_eq!(StatusCode::OK, response.status());
            bodies.push(hyper::body::to_bytes(response.into_body()).await.unwrap());
        }
        assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
        // The lock is free again once every request has completed.
        tokio::time::timeout(Duration::from_secs(1), state.resource_manager.dataset())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn metrics_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        metrics::register_metrics();
        let response = get_with(&args(dir.path(), false), "/metrics").await;
        assert_eq!(StatusCode::OK, response.status());
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
    }
}
