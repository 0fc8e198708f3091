//! Minimal wisp example: JSON endpoints and a templated page behind an
//! access logger.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42
//!   curl http://localhost:3000/hello/alice

use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::StatusCode;
use serde_json::{Value, json};
use wisp::middleware::log::{DateFormat, LogHandler, LogOptions, WriterSink};
use wisp::middleware::template::{self, TemplateHandler};
use wisp::template::{Template, TemplateCompiler, TemplateRegistry};
use wisp::{BoxError, BoxFuture, BoxWriter, Handler, Request, Response, ResponseWriter, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let dir = std::env::temp_dir().join("wisp-demo");
    std::fs::create_dir_all(&dir).expect("create template dir");
    std::fs::write(dir.join("hello.html"), "<h1>Hello, {{name}}!</h1>\n").expect("write template");

    let registry = TemplateRegistry::new();
    registry.register_compiler("html", Substitute);
    let compiled = registry.compile_dir(&dir, false).expect("compile templates");
    tracing::info!(compiled, "templates ready");

    let app = Router::new()
        .get("/users/{id}",    get_user)
        .post("/users",        create_user)
        .delete("/users/{id}", delete_user)
        .get("/hello/{name}",  Hello(dir.join("hello.html")));

    let options = LogOptions::new("%s %s %d %s %.3f [%s] %s")
        .tokens(["method", "url", "status", "res[Content-Length]", "response-time", "date", "tenant"])
        .custom_token("tenant", |_, req: &Request| req.header("x-tenant").unwrap_or("-").to_owned())
        .date_format(DateFormat::pattern("%d/%b/%Y:%H:%M:%S %z").expect("valid date pattern"))
        .sink(WriterSink::stdout());

    let app = LogHandler::new(TemplateHandler::new(app, Arc::new(registry)), options);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(json!({ "id": id, "name": "alice" }).to_string())
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

// GET /hello/{name}: writes straight into the chain instead of returning a value.
struct Hello(PathBuf);

impl Handler for Hello {
    fn serve<'a>(&'a self, w: &'a mut BoxWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let data = json!({ "name": req.param("name").unwrap_or("world") });
            if let Err(e) = template::render(w, &self.0, &data) {
                tracing::error!("render failed: {e}");
                w.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        })
    }
}

/// A toy engine: `{{key}}` is replaced by the matching top-level field.
struct Substitute;

struct Compiled(String);

impl TemplateCompiler for Substitute {
    fn compile(&self, path: &Path) -> Result<Arc<dyn Template>, BoxError> {
        Ok(Arc::new(Compiled(std::fs::read_to_string(path)?)))
    }
}

impl Template for Compiled {
    fn render(&self, w: &mut dyn ResponseWriter, data: &Value) -> Result<(), BoxError> {
        let mut out = self.0.clone();
        if let Some(fields) = data.as_object() {
            for (key, value) in fields {
                let value = value.as_str().map_or_else(|| value.to_string(), str::to_owned);
                out = out.replace(&format!("{{{{{key}}}}}"), &value);
            }
        }
        w.write(out.as_bytes())?;
        Ok(())
    }
}
