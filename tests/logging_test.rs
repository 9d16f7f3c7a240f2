// Log setup: tracing and `log` facade records reach the same writer
use actix_web::{middleware, test, web, App, HttpResponse};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::Level;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[actix_web::test]
async fn test_log_facade_and_access_log_are_captured() {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    prodsim::logging::init_with_writer(Level::INFO, move || writer.clone()).unwrap();

    tracing::info!("from tracing macro");
    log::info!("from log facade");
    log::debug!("below the level");

    let app = test::init_service(
        App::new()
            .wrap(middleware::Logger::default())
            .route("/api/ping", web::get().to(|| async { HttpResponse::Ok().body("pong") })),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/ping").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "pong");

    let out = buf.contents();
    assert!(out.contains("from tracing macro"));
    assert!(out.contains("from log facade"));
    assert!(!out.contains("below the level"));
    assert!(out.contains("GET /api/ping"));

    assert!(prodsim::logging::init(Level::INFO).is_err());
}
