use crate::session::{SessionError, SessionId, SessionStore, Upload};
use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use csvsense_core::Error as CoreError;
use futures_util::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(store: Arc<SessionStore>, port: u16) -> std::io::Result<()> {
        info!(port, "Starting REST API");
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(store.clone()))
                .configure(RestApi::configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Register the session routes on an app
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.route("/sessions", web::post().to(create_session))
            .route("/sessions/{id}", web::get().to(get_session))
            .route("/sessions/{id}", web::delete().to(delete_session))
            .route("/sessions/{id}/table", web::put().to(replace_table))
            .route("/sessions/{id}/ask", web::post().to(ask));
    }
}

fn error_response(err: &SessionError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match err {
        SessionError::NotFound(_) => HttpResponse::NotFound().json(body),
        SessionError::Unavailable(_) => HttpResponse::ServiceUnavailable().json(body),
        SessionError::Table(CoreError::Parse(_)) | SessionError::Table(CoreError::EmptyTable) => {
            HttpResponse::BadRequest().json(body)
        }
        SessionError::Table(e) if e.is_fatal() => HttpResponse::ServiceUnavailable().json(body),
        SessionError::Table(_) => HttpResponse::InternalServerError().json(body),
    }
}

fn parse_session_id(raw: &str) -> Result<SessionId, HttpResponse> {
    SessionId::parse_str(raw).map_err(|_| {
        HttpResponse::NotFound().json(serde_json::json!({
            "error": "Session not found"
        }))
    })
}

/// Compute embeddings for an upload on the blocking pool
fn spawn_prepare(store: Arc<SessionStore>, upload: Upload) {
    actix_web::rt::task::spawn_blocking(move || {
        let status = store.prepare(upload);
        debug!(session = %upload.session_id, ?status, "Background embedding finished");
    });
}

/// First field of a multipart upload
async fn read_upload(payload: &mut Multipart) -> ActixResult<Option<Vec<u8>>> {
    if let Some(item) = payload.next().await {
        let mut field = item?;
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        return Ok(Some(bytes));
    }
    Ok(None)
}

/// Whole request body, read without the default payload size limit
async fn read_body(payload: &mut web::Payload) -> ActixResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = payload.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(bytes)
}

async fn create_session(
    store: web::Data<Arc<SessionStore>>,
    mut payload: Multipart,
) -> ActixResult<HttpResponse> {
    let csv = match read_upload(&mut payload).await? {
        Some(bytes) => bytes,
        None => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "No file in upload"
            })));
        }
    };

    let store = store.get_ref().clone();
    let parsing = store.clone();
    let upload = match web::block(move || parsing.create(&csv)).await? {
        Ok(upload) => upload,
        Err(e) => return Ok(error_response(&e)),
    };

    let info = match store.info(upload.session_id) {
        Ok(info) => info,
        Err(e) => return Ok(error_response(&e)),
    };
    spawn_prepare(store, upload);

    Ok(HttpResponse::Created().json(info))
}

async fn replace_table(
    store: web::Data<Arc<SessionStore>>,
    path: web::Path<String>,
    mut payload: web::Payload,
) -> ActixResult<HttpResponse> {
    let session_id = match parse_session_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let body = read_body(&mut payload).await?;

    let store = store.get_ref().clone();
    let parsing = store.clone();
    let upload = match web::block(move || parsing.replace(session_id, &body)).await? {
        Ok(upload) => upload,
        Err(e) => return Ok(error_response(&e)),
    };

    let info = match store.info(session_id) {
        Ok(info) => info,
        Err(e) => return Ok(error_response(&e)),
    };
    spawn_prepare(store, upload);

    Ok(HttpResponse::Ok().json(info))
}

async fn get_session(
    store: web::Data<Arc<SessionStore>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let session_id = match parse_session_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match store.info(session_id) {
        Ok(info) => Ok(HttpResponse::Ok().json(info)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn delete_session(
    store: web::Data<Arc<SessionStore>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let session_id = match parse_session_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    if store.remove(session_id) {
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "result": true
        })))
    } else {
        Ok(error_response(&SessionError::NotFound(session_id)))
    }
}

async fn ask(
    store: web::Data<Arc<SessionStore>>,
    path: web::Path<String>,
    req: web::Json<AskRequest>,
) -> ActixResult<HttpResponse> {
    let session_id = match parse_session_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let store = store.get_ref().clone();
    let question = req.into_inner().question;
    match web::block(move || store.ask(session_id, &question)).await? {
        Ok(view) => Ok(HttpResponse::Ok().json(view)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LoadStatus;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use csvsense_query::EngineConfig;
    use csvsense_similarity::{EmbeddingBackend, ModelLoader};
    use serde_json::Value;

    const BOUNDARY: &str = "csvsenseboundary";

    fn store() -> Arc<SessionStore> {
        Arc::new(
            SessionStore::new(
                Arc::new(ModelLoader::new(EmbeddingBackend::Hashing { dim: 64 })),
                EngineConfig::default(),
            )
            .unwrap(),
        )
    }

    fn multipart_body(csv: &str) -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
            b = BOUNDARY,
            csv = csv
        )
    }

    fn upload_request(csv: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/sessions")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(csv))
    }

    #[actix_web::test]
    async fn test_upload_then_ask() {
        let store = store();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(store.clone()))
                .configure(RestApi::configure),
        )
        .await;

        let resp = test::call_service(&app, upload_request("nombre,precio\npan,10\nleche,20\nqueso,30").to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = created["session_id"].as_str().unwrap().to_string();
        assert_eq!(created["rows"], 3);

        let req = test::TestRequest::post()
            .uri(&format!("/sessions/{}/ask", id))
            .set_json(serde_json::json!({ "question": "productos con precio mayor a 15" }))
            .to_request();
        let answer: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(answer["status"], "rows");
        assert_eq!(answer["column"], "precio");
        assert_eq!(answer["rows"].as_array().unwrap().len(), 2);
        assert_eq!(answer["rows"][0]["values"]["nombre"], "leche");
    }

    #[actix_web::test]
    async fn test_session_becomes_ready() {
        let store = store();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(store.clone()))
                .configure(RestApi::configure),
        )
        .await;

        let created: Value = test::call_and_read_body_json(&app, upload_request("a,b\nx,1\ny,2").to_request()).await;
        let id = SessionId::parse_str(created["session_id"].as_str().unwrap()).unwrap();

        let mut status = LoadStatus::Loading;
        for _ in 0..100 {
            status = store.info(id).unwrap().status;
            if status != LoadStatus::Loading {
                break;
            }
            actix_web::rt::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(status, LoadStatus::Ready);

        let req = test::TestRequest::get().uri(&format!("/sessions/{}", id)).to_request();
        let info: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(info["status"], "ready");
        assert_eq!(info["schema"]["columns"][1]["kind"], "numeric");
    }

    #[actix_web::test]
    async fn test_error_statuses() {
        let store = store();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(store.clone()))
                .configure(RestApi::configure),
        )
        .await;

        let resp = test::call_service(&app, upload_request("a,b\n1,2,3").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/sessions/not-a-session/ask")
            .set_json(serde_json::json!({ "question": "hola" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete()
            .uri(&format!("/sessions/{}", SessionId::new_v4()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_replace_table() {
        let store = store();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(store.clone()))
                .configure(RestApi::configure),
        )
        .await;

        let upload = store.create(b"a\n1\n").unwrap();
        let req = test::TestRequest::put()
            .uri(&format!("/sessions/{}/table", upload.session_id))
            .set_payload("fecha\n2020-01-01\n2021-06-01\n")
            .to_request();
        let info: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(info["rows"], 2);
        assert_eq!(info["schema"]["columns"][0]["kind"], "datetime");

        let req = test::TestRequest::post()
            .uri(&format!("/sessions/{}/ask", upload.session_id))
            .set_json(serde_json::json!({ "question": "registros antes de 2021-01-01" }))
            .to_request();
        let answer: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(answer["rows"].as_array().unwrap().len(), 1);
        assert_eq!(answer["rows"][0]["values"]["fecha"], "2020-01-01");
    }

    #[actix_web::test]
    async fn test_replace_table_larger_than_default_payload_limit() {
        let store = store();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(store.clone()))
                .configure(RestApi::configure),
        )
        .await;

        let mut csv = String::from("producto,precio\n");
        for i in 0..20_000 {
            csv.push_str(&format!("producto numero {},{}.5\n", i, i));
        }
        assert!(csv.len() > 256 * 1024);

        let upload = store.create(b"a\n1\n").unwrap();
        let req = test::TestRequest::put()
            .uri(&format!("/sessions/{}/table", upload.session_id))
            .set_payload(csv)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let info: Value = test::read_body_json(resp).await;
        assert_eq!(info["rows"], 20_000);
    }
}
