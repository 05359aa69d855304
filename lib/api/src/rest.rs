use actix_cors::Cors;
use actix_web::error::InternalError;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use blendx_core::{Error, Recommendation};
use blendx_storage::ModelManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

#[derive(Deserialize)]
struct TrainRequest {
    #[serde(default = "default_rebuild")]
    rebuild_features: bool,
}

fn default_rebuild() -> bool {
    true
}

#[derive(Deserialize)]
struct RecommendQuery {
    top_n: Option<usize>,
}

#[derive(Serialize)]
struct RecommendResponse {
    query: String,
    recommendations: Vec<Recommendation>,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(manager: Arc<ModelManager>, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .configure(Self::configure(manager.clone()))
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Registers state and routes; shared by the server and tests
    pub fn configure(manager: Arc<ModelManager>) -> impl FnOnce(&mut web::ServiceConfig) {
        move |cfg| {
            cfg.app_data(web::Data::new(manager))
                .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                    let body = serde_json::json!({ "detail": err.to_string() });
                    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
                }))
                .route("/", web::get().to(health))
                .route("/build-features", web::post().to(build_features))
                .route("/train", web::post().to(train))
                .route("/recommend/{filename}", web::get().to(recommend));
        }
    }
}

/// 404 for unknown tracks, 400 for any other failure
fn error_response(e: &Error) -> HttpResponse {
    let body = serde_json::json!({ "detail": e.to_string() });
    if e.is_not_found() {
        HttpResponse::NotFound().json(body)
    } else {
        warn!(error = %e, "request failed");
        HttpResponse::BadRequest().json(body)
    }
}

async fn health(manager: web::Data<Arc<ModelManager>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "service": "track-blending",
        "status": "ok",
        "trained": manager.is_trained(),
    })))
}

async fn build_features(manager: web::Data<Arc<ModelManager>>) -> ActixResult<HttpResponse> {
    let manager = manager.get_ref().clone();
    match web::block(move || manager.build_features()).await? {
        Ok(summary) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "features_built",
            "count": summary.count,
            "failed": summary.failures,
            "path": summary.path,
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn train(
    manager: web::Data<Arc<ModelManager>>,
    body: Option<web::Json<TrainRequest>>,
) -> ActixResult<HttpResponse> {
    let rebuild = body.map(|b| b.rebuild_features).unwrap_or(true);
    let manager = manager.get_ref().clone();

    match web::block(move || manager.train(rebuild)).await? {
        Ok(summary) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "trained",
            "model_path": summary.model_path,
            "rows": summary.rows,
            "bundle_id": summary.bundle_id,
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn recommend(
    manager: web::Data<Arc<ModelManager>>,
    path: web::Path<String>,
    query: web::Query<RecommendQuery>,
) -> ActixResult<HttpResponse> {
    let filename = path.into_inner();
    let top_n = query.top_n;
    let manager = manager.get_ref().clone();

    let name = filename.clone();
    match web::block(move || manager.recommend(&name, top_n)).await? {
        Ok(recommendations) => Ok(HttpResponse::Ok().json(RecommendResponse {
            query: filename,
            recommendations,
        })),
        Err(e) => Ok(error_response(&e)),
    }
}
