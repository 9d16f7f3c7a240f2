use actix_cors::Cors;
use actix_web::error::InternalError;
use actix_web::{middleware, web, App, HttpResponse, HttpServer, Result as ActixResult};
use prodsim_core::{Error, MatchFilter, Signals, SimilarityMode};
use prodsim_storage::DataManager;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

const DEFAULT_SEARCH_TOP_K: usize = 24;
const DEFAULT_SIMILAR_TOP_K: usize = 12;
const DEFAULT_MATCHES_TOP_K: usize = 12;
const DEFAULT_CLIENT_PAGE: usize = 12;
const DEFAULT_SAMPLE_LIMIT: usize = 200;

#[derive(Deserialize)]
struct SearchParams {
    query: Option<String>,
    q: Option<String>,
    #[serde(rename = "topK")]
    top_k: Option<String>,
    mode: Option<String>,
    signals: Option<String>,
}

#[derive(Deserialize)]
struct SimilarParams {
    #[serde(rename = "productId")]
    product_id: Option<String>,
    #[serde(rename = "topK")]
    top_k: Option<String>,
    mode: Option<String>,
    signals: Option<String>,
}

#[derive(Deserialize)]
struct EvalSetParams {
    seed: Option<String>,
    user: Option<String>,
}

/// Seeds arrive as numbers or numeric strings
#[derive(Deserialize)]
#[serde(untagged)]
enum SeedValue {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
struct FeedbackRequest {
    seed: Option<SeedValue>,
    base_id: Option<String>,
    selected_ids: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct MatchingsParams {
    #[serde(rename = "clientId")]
    client_id: Option<String>,
    list: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
    nocache: Option<String>,
    #[serde(rename = "topK")]
    top_k: Option<String>,
    threshold: Option<String>,
    #[serde(rename = "includeInactive")]
    include_inactive: Option<String>,
}

#[derive(Deserialize)]
struct SampleParams {
    q: Option<String>,
    limit: Option<String>,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(manager: Arc<DataManager>, host: &str, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .wrap(middleware::Logger::default())
                .app_data(web::Data::new(manager.clone()))
                .configure(Self::routes)
        })
        .bind((host, port))?
        .run()
        .await
    }

    /// Route table; expects a `web::Data<Arc<DataManager>>` in app data.
    pub fn routes(cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
            let body = serde_json::json!({ "error": err.to_string() });
            InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        }))
        .route("/api/search", web::get().to(search))
            .route("/api/similar", web::get().to(similar))
            .route("/api/eval-set", web::get().to(eval_set))
            .route("/api/eval-set", web::post().to(submit_eval_feedback))
            .route("/api/matchings", web::get().to(matchings))
            .route("/api/sample-products", web::get().to(sample_products));
    }
}

fn error_response(err: &Error) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match err {
        Error::ProductNotFound(_) | Error::ClientNotFound(_) => HttpResponse::NotFound().json(body),
        Error::InvalidRequest(_) => HttpResponse::BadRequest().json(body),
        _ => {
            error!("Request failed: {}", err);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Positive count from a query string, `default` when absent or unusable
fn count_param(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite() && *n >= 1.0)
        .map_or(default, |n| n as usize)
}

fn offset_param(value: Option<&str>) -> usize {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite() && *n > 0.0)
        .map_or(0, |n| n as usize)
}

/// Presence switch: any non-empty value is on, `0` and `false` included
fn flag_param(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Boolean value; only `false` and `0` switch it off
fn bool_param(value: Option<&str>, default: bool) -> bool {
    match value.map(str::trim) {
        Some("false" | "0") => false,
        Some(_) => true,
        None => default,
    }
}

/// Integer seed; unparsable or zero means 1
fn parse_seed(value: Option<&str>) -> i64 {
    let seed = value
        .and_then(|v| {
            let v = v.trim();
            v.parse::<i64>()
                .ok()
                .or_else(|| v.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        })
        .unwrap_or(0);
    if seed == 0 {
        1
    } else {
        seed
    }
}

async fn search(
    manager: web::Data<Arc<DataManager>>,
    params: web::Query<SearchParams>,
) -> ActixResult<HttpResponse> {
    let params = params.into_inner();
    let query = params.query.or(params.q).unwrap_or_default();
    let top_k = count_param(params.top_k.as_deref(), DEFAULT_SEARCH_TOP_K);
    let mode = SimilarityMode::parse_or(params.mode.as_deref(), SimilarityMode::Text);
    let signals = params.signals.as_deref().and_then(Signals::parse);

    match manager.search(&query, top_k, mode, signals).await {
        Ok(results) => Ok(HttpResponse::Ok().json(results)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn similar(
    manager: web::Data<Arc<DataManager>>,
    params: web::Query<SimilarParams>,
) -> ActixResult<HttpResponse> {
    let params = params.into_inner();
    let Some(product_id) = params.product_id.filter(|id| !id.is_empty()) else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "productId required"
        })));
    };
    let top_k = count_param(params.top_k.as_deref(), DEFAULT_SIMILAR_TOP_K);
    let mode = SimilarityMode::parse_or(params.mode.as_deref(), SimilarityMode::Mixed);
    let signals = params.signals.as_deref().and_then(Signals::parse);

    match manager.find_similar(&product_id, mode, top_k, signals).await {
        Ok(results) => Ok(HttpResponse::Ok().json(results)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn eval_set(
    manager: web::Data<Arc<DataManager>>,
    params: web::Query<EvalSetParams>,
) -> ActixResult<HttpResponse> {
    let params = params.into_inner();
    let seed = parse_seed(params.seed.or(params.user).as_deref());

    match manager.eval_set(seed).await {
        Ok(set) => Ok(HttpResponse::Ok().json(set)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn submit_eval_feedback(
    manager: web::Data<Arc<DataManager>>,
    req: web::Json<FeedbackRequest>,
) -> ActixResult<HttpResponse> {
    let req = req.into_inner();
    let (Some(seed), Some(base_id), Some(selected_ids)) = (req.seed, req.base_id, req.selected_ids) else {
        return Ok(error_response(&Error::InvalidRequest(
            "seed, base_id and selected_ids are required".to_string(),
        )));
    };
    let seed = match seed {
        SeedValue::Number(n) => parse_seed(Some(&n.to_string())),
        SeedValue::Text(s) => parse_seed(Some(&s)),
    };

    match manager.submit_feedback(seed, &base_id, selected_ids).await {
        Ok(record) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "ok": true,
            "record": record
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn matchings(
    manager: web::Data<Arc<DataManager>>,
    params: web::Query<MatchingsParams>,
) -> ActixResult<HttpResponse> {
    let params = params.into_inner();
    let refresh = flag_param(params.nocache.as_deref());

    let index = match manager.matchings(refresh).await {
        Ok(index) => index,
        Err(e) => return Ok(error_response(&e)),
    };

    if flag_param(params.list.as_deref()) {
        let offset = offset_param(params.offset.as_deref());
        let limit = count_param(params.limit.as_deref(), DEFAULT_CLIENT_PAGE);
        return Ok(HttpResponse::Ok().json(index.list_clients(offset, limit)));
    }

    if let Some(client_id) = params.client_id.filter(|id| !id.is_empty()) {
        let top_k = count_param(params.top_k.as_deref(), DEFAULT_MATCHES_TOP_K);
        let filter = MatchFilter {
            threshold: params
                .threshold
                .as_deref()
                .and_then(|t| t.trim().parse::<f64>().ok())
                .filter(|t| t.is_finite()),
            include_inactive: bool_param(params.include_inactive.as_deref(), true),
        };

        return match index.client_matches(&client_id, top_k, &manager.config().presentation, &filter) {
            Ok(matches) => Ok(HttpResponse::Ok().json(serde_json::json!({
                "clientIds": index.client_ids(),
                "client": matches.client,
                "competitors": matches.competitors,
            }))),
            Err(Error::ClientNotFound(_)) => Ok(HttpResponse::NotFound().json(serde_json::json!({
                "error": "client not found",
                "clientIds": index.client_ids(),
            }))),
            Err(e) => Ok(error_response(&e)),
        };
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "clientIds": index.client_ids()
    })))
}

async fn sample_products(
    manager: web::Data<Arc<DataManager>>,
    params: web::Query<SampleParams>,
) -> ActixResult<HttpResponse> {
    let params = params.into_inner();
    let limit = count_param(params.limit.as_deref(), DEFAULT_SAMPLE_LIMIT);

    match manager.sample_products(params.q.as_deref(), limit).await {
        Ok(items) => Ok(HttpResponse::Ok().json(serde_json::json!({ "items": items }))),
        Err(e) => {
            error!("Reading sample products failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({ "items": [] })))
        }
    }
}
