//! End-to-end behaviour of the logging and template middleware over a router.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use parking_lot::Mutex;
use serde_json::{Value, json};
use wisp::middleware::log::{LogHandler, LogOptions, LogSink};
use wisp::middleware::template::{self, TemplateHandler};
use wisp::template::{Template, TemplateCompiler, TemplateRegistry};
use wisp::{BoxError, BoxFuture, BoxWriter, Handler, Request, Response, ResponseBuffer, ResponseWriter, Router};

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<String>>>);

impl LogSink for Collect {
    fn log(&self, line: &str) {
        self.0.lock().push(line.to_owned());
    }
}

impl Collect {
    fn lines(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

fn request(method: Method, uri: &str) -> Request {
    let req = http::Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap();
    Request::new(req, "10.0.0.7:41000".parse().unwrap())
}

fn options(sink: &Collect) -> LogOptions {
    LogOptions::new("%s %s %d %s")
        .tokens(["method", "url", "status", "res[Content-Length]"])
        .sink(sink.clone())
}

async fn run(handler: &impl Handler, req: &Request) -> ResponseBuffer {
    let mut w: BoxWriter = Box::new(ResponseBuffer::new());
    handler.serve(&mut w, req).await;
    ResponseBuffer::take_from(w.as_mut())
}

async fn get_user(req: Request) -> Response {
    Response::json(format!(r#"{{"id":"{}"}}"#, req.param("id").unwrap_or("")))
}

#[tokio::test]
async fn nested_loggers_write_one_line() {
    let sink = Collect::default();
    let inner = LogHandler::new(Router::new().get("/users/{id}", get_user), options(&sink));
    let outer = LogHandler::new(inner, options(&sink));

    let response = run(&outer, &request(Method::GET, "/users/7")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sink.lines(), ["GET /users/7 200 10"]);
}

#[tokio::test]
async fn router_misses_are_logged_with_their_status() {
    let sink = Collect::default();
    let app = LogHandler::new(Router::new().get("/users/{id}", get_user), options(&sink));

    run(&app, &request(Method::GET, "/nowhere")).await;
    run(&app, &request(Method::DELETE, "/users/7")).await;

    assert_eq!(sink.lines(), ["GET /nowhere 404 ", "DELETE /users/7 405 "]);
}

#[tokio::test]
async fn immediate_lines_precede_the_handler() {
    struct Observe(Collect);

    impl Handler for Observe {
        fn serve<'a>(&'a self, w: &'a mut BoxWriter, _req: &'a Request) -> BoxFuture<'a> {
            Box::pin(async move {
                assert_eq!(self.0.lines().len(), 1, "line must exist before the handler runs");
                w.write_status(StatusCode::ACCEPTED);
            })
        }
    }

    let sink = Collect::default();
    let app = LogHandler::new(Observe(sink.clone()), options(&sink).immediate(true));

    let response = run(&app, &request(Method::POST, "/jobs")).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(sink.lines(), ["POST /jobs 0 "]);
}

#[tokio::test]
async fn a_panicking_handler_is_still_logged_once() {
    async fn boom(_: Request) -> Response {
        panic!("handler failure");
    }

    let sink = Collect::default();
    let app = Arc::new(LogHandler::new(boom, options(&sink)));

    let task = tokio::spawn({
        let app = Arc::clone(&app);
        async move {
            let mut w: BoxWriter = Box::new(ResponseBuffer::new());
            app.serve(&mut w, &request(Method::GET, "/boom")).await;
        }
    });

    assert!(task.await.unwrap_err().is_panic());
    assert_eq!(sink.lines(), ["GET /boom 0 "]);
}

#[tokio::test]
async fn a_cancelled_request_is_still_logged_once() {
    async fn stuck(_: Request) -> Response {
        std::future::pending::<Response>().await
    }

    let sink = Collect::default();
    let app = LogHandler::new(stuck, options(&sink));
    let req = request(Method::GET, "/slow");
    let mut w: BoxWriter = Box::new(ResponseBuffer::new());

    let outcome = tokio::time::timeout(Duration::from_millis(20), app.serve(&mut w, &req)).await;

    assert!(outcome.is_err());
    assert_eq!(sink.lines(), ["GET /slow 0 "]);
}

struct Upper;

struct Shout(String);

impl TemplateCompiler for Upper {
    fn compile(&self, path: &Path) -> Result<Arc<dyn Template>, BoxError> {
        Ok(Arc::new(Shout(std::fs::read_to_string(path)?)))
    }
}

impl Template for Shout {
    fn render(&self, w: &mut dyn ResponseWriter, data: &Value) -> Result<(), BoxError> {
        let name = data["name"].as_str().unwrap_or("");
        w.write(self.0.replace("{{name}}", name).to_uppercase().as_bytes())?;
        Ok(())
    }
}

#[tokio::test]
async fn templates_render_under_the_logger() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("greet.tpl"), "hey {{name}}").unwrap();
    std::fs::write(dir.path().join("readme.txt"), "not a template").unwrap();

    let registry = TemplateRegistry::new();
    registry.register_compiler(".TPL", Upper);
    assert_eq!(registry.compile_dir(dir.path(), false).unwrap(), 1);
    registry.compile(dir.path().join("readme.txt")).unwrap();
    assert_eq!(registry.len(), 1);

    struct Greet(std::path::PathBuf);

    impl Handler for Greet {
        fn serve<'a>(&'a self, w: &'a mut BoxWriter, req: &'a Request) -> BoxFuture<'a> {
            Box::pin(async move {
                template::render(w, &self.0, &json!({ "name": req.path() })).unwrap();
            })
        }
    }

    let sink = Collect::default();
    let app = LogHandler::new(
        TemplateHandler::new(Greet(dir.path().join("greet.tpl")), registry),
        options(&sink),
    );

    let response = run(&app, &request(Method::GET, "/bob")).await;

    assert_eq!(response.body(), b"HEY /BOB");
    // Written straight through the chain, so no content-length is known.
    assert_eq!(sink.lines(), ["GET /bob 200 "]);
}
