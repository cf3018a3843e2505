use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use stencil_core::config::{CacheConfig, CacheOptions, PathList, RendererConfig};
use stencil_core::engine::{
    CompiledTemplate, Engine, EngineResult, HandlebarsEngine, RuntimeStatus,
};
use stencil_core::factory::{assemble, build_renderer, build_resolver};
use stencil_core::helpers::{HelperCatalog, HostHelper};
use stencil_core::renderer::{Renderer, TEMPLATE_ALL};
use stencil_core::store::{CacheStore, MemoryStore};
use stencil_core::{ErrorCategory, StencilError};

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn cache(adapter: &str, cache_dir: Option<PathBuf>) -> Option<CacheConfig> {
    Some(CacheConfig {
        adapter: Some(adapter.into()),
        options: CacheOptions { cache_dir },
    })
}

/// Templates under `<root>/templates`, partials under `<root>/partials`, memory cache.
fn site_config(root: &Path) -> RendererConfig {
    let mut config = RendererConfig::default();
    config
        .paths
        .insert(String::new(), PathList::One(root.join("templates")));
    config
        .paths
        .insert("partials".into(), PathList::One(root.join("partials")));
    config.cache = cache("memory", None);
    config
}

async fn renderer(config: &RendererConfig) -> Renderer {
    build_renderer(config, Box::new(HandlebarsEngine::new()), HelperCatalog::builtin())
        .await
        .unwrap()
}

/// Delegates to [`HandlebarsEngine`] and counts compile calls.
#[derive(Clone, Default)]
struct CountingEngine {
    inner: Arc<HandlebarsEngine>,
    compiles: Arc<AtomicUsize>,
}

impl Engine for CountingEngine {
    fn is_runtime_registered(&self) -> bool {
        self.inner.is_runtime_registered()
    }

    fn register_runtime(&self, source: &str) -> EngineResult<RuntimeStatus> {
        self.inner.register_runtime(source)
    }

    fn precompile(&self, source: &str) -> EngineResult<String> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        self.inner.precompile(source)
    }

    fn template(&self, name: &str, compiled: &str) -> EngineResult<CompiledTemplate> {
        self.inner.template(name, compiled)
    }

    fn execute(
        &self,
        template: &CompiledTemplate,
        params: &serde_json::Value,
    ) -> EngineResult<String> {
        self.inner.execute(template, params)
    }

    fn register_partial(&self, name: &str, template: &CompiledTemplate) -> EngineResult<()> {
        self.inner.register_partial(name, template)
    }

    fn register_script_helper(&self, name: &str, source: &str) -> EngineResult<()> {
        self.inner.register_script_helper(name, source)
    }

    fn register_host_helper(&self, name: &str, helper: HostHelper) -> EngineResult<()> {
        self.inner.register_host_helper(name, helper)
    }
}

/// A store that never keeps anything and refuses every write.
struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> bool {
        false
    }
}

#[tokio::test]
async fn test_hello_world() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/greet.hbs", "Hello {{name}}");

    let renderer = renderer(&site_config(root.path())).await;
    let output = renderer.render("greet", &json!({ "name": "World" })).await.unwrap();
    assert_eq!(output, "Hello World");
}

#[tokio::test]
async fn test_unknown_template_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/greet.hbs", "Hello");

    let renderer = renderer(&site_config(root.path())).await;
    let err = renderer.render("missing", &json!({})).await.unwrap_err();
    assert!(matches!(err, StencilError::TemplateNotFound(ref name) if name == "missing"));
    assert_eq!(err.category(), ErrorCategory::Missing);
}

#[tokio::test]
async fn test_second_render_skips_compilation() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/greet.hbs", "Hello {{name}}");
    let config = site_config(root.path());

    let engine = CountingEngine::default();
    let compiles = engine.compiles.clone();
    let resolver = build_resolver(&config, Arc::new(MemoryStore::new()));
    let renderer = assemble(&config, Box::new(engine), resolver, HelperCatalog::new())
        .await
        .unwrap();

    let first = renderer.render("greet", &json!({ "name": "a" })).await.unwrap();
    assert_eq!(compiles.load(Ordering::SeqCst), 1);

    let cached = renderer.resolver().resolve("greet").await.unwrap().unwrap();
    assert!(cached.is_compiled());

    let second = renderer.render("greet", &json!({ "name": "b" })).await.unwrap();
    assert_eq!(compiles.load(Ordering::SeqCst), 1);
    assert_eq!((first.as_str(), second.as_str()), ("Hello a", "Hello b"));
}

#[tokio::test]
async fn test_cache_shadows_filesystem_once_populated() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/greet.hbs", "first");

    let renderer = renderer(&site_config(root.path())).await;
    assert_eq!(renderer.render("greet", &json!({})).await.unwrap(), "first");

    write(root.path(), "templates/greet.hbs", "second");
    assert_eq!(renderer.render("greet", &json!({})).await.unwrap(), "first");
}

#[tokio::test]
async fn test_failing_store_still_renders() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/greet.hbs", "Hello {{name}}");
    write(root.path(), "partials/sig.hbs", "-- {{name}}");
    write(root.path(), "templates/letter.hbs", "Dear {{name}} {{> sig}}");
    let config = site_config(root.path());

    let resolver = build_resolver(&config, Arc::new(FailingStore));
    let renderer = assemble(
        &config,
        Box::new(HandlebarsEngine::new()),
        resolver,
        HelperCatalog::new(),
    )
    .await
    .unwrap();

    let params = json!({ "name": "Ada" });
    assert_eq!(renderer.render("greet", &params).await.unwrap(), "Hello Ada");
    assert_eq!(renderer.render("letter", &params).await.unwrap(), "Dear Ada -- Ada");
}

#[tokio::test]
async fn test_default_param_precedence() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/page.hbs", "{{a}},{{b}},{{c}}");

    let mut renderer = renderer(&site_config(root.path())).await;
    renderer
        .add_default_param(TEMPLATE_ALL, "a", json!(1))
        .add_default_param(TEMPLATE_ALL, "b", json!(2))
        .add_default_param("page", "b", json!(3));

    let output = renderer.render("page", &json!({ "b": 4, "c": 5 })).await.unwrap();
    assert_eq!(output, "1,4,5");
}

#[tokio::test]
async fn test_partials_are_inlined() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "partials/header.hbs", "<header>{{title}}</header>");
    write(root.path(), "partials/footer.hbs", "<footer>bye</footer>");
    write(root.path(), "templates/page.hbs", "{{> header}}body{{> footer}}");

    let renderer = renderer(&site_config(root.path())).await;
    let output = renderer.render("page", &json!({ "title": "Hi" })).await.unwrap();
    assert_eq!(output, "<header>Hi</header>body<footer>bye</footer>");
}

#[tokio::test]
async fn test_namespaces_resolve_independently() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "foo/bar.hbs", "foo bar");
    write(root.path(), "templates/index.hbs", "index");

    let mut config = site_config(root.path());
    config
        .paths
        .insert("foo".into(), PathList::One(root.path().join("foo")));

    let renderer = renderer(&config).await;
    assert_eq!(renderer.render("foo::bar", &json!({})).await.unwrap(), "foo bar");
    assert!(matches!(
        renderer.render("bar", &json!({})).await,
        Err(StencilError::TemplateNotFound(_))
    ));
    assert!(matches!(
        renderer.render("foo::index", &json!({})).await,
        Err(StencilError::TemplateNotFound(_))
    ));
}

#[tokio::test]
async fn test_bad_syntax_is_compilation_error() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/broken.hbs", "{{#if ready}}never closed");

    let renderer = renderer(&site_config(root.path())).await;
    let err = renderer.render("broken", &json!({})).await.unwrap_err();
    assert!(matches!(err, StencilError::TemplateCompilation { ref name, .. } if name == "broken"));
    assert_eq!(err.category(), ErrorCategory::Syntax);
}

#[tokio::test]
async fn test_non_utf8_template_is_compilation_error() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("templates")).unwrap();
    std::fs::write(root.path().join("templates/bin.hbs"), [0xff, 0xfe, b'{']).unwrap();

    let renderer = renderer(&site_config(root.path())).await;
    let err = renderer.render("bin", &json!({})).await.unwrap_err();
    assert!(matches!(err, StencilError::TemplateCompilation { ref name, .. } if name == "bin"));
    assert_eq!(err.category(), ErrorCategory::Syntax);
}

#[tokio::test]
async fn test_unknown_helper_is_execution_error() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/shout.hbs", "{{nosuchhelper name}}");

    let renderer = renderer(&site_config(root.path())).await;
    let err = renderer.render("shout", &json!({ "name": "x" })).await.unwrap_err();
    assert!(matches!(err, StencilError::TemplateExecution { .. }));
    assert_eq!(err.category(), ErrorCategory::Runtime);
}

#[tokio::test]
async fn test_non_object_params_are_rejected() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/greet.hbs", "Hello");

    let renderer = renderer(&site_config(root.path())).await;
    let err = renderer.render("greet", &json!("World")).await.unwrap_err();
    assert!(matches!(err, StencilError::InvalidParams { .. }));
}

#[tokio::test]
async fn test_runtime_registration_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/greet.hbs", "Hello {{name}}");
    let config = site_config(root.path());

    let first = renderer(&config).await;
    let second = renderer(&config).await;
    let params = json!({ "name": "again" });
    assert_eq!(first.render("greet", &params).await.unwrap(), "Hello again");
    assert_eq!(second.render("greet", &params).await.unwrap(), "Hello again");
}

#[tokio::test]
async fn test_missing_runtime_source() {
    let root = tempfile::tempdir().unwrap();
    let mut config = site_config(root.path());
    config.source = Some(root.path().join("missing.runtime.json"));

    let result =
        build_renderer(&config, Box::new(HandlebarsEngine::new()), HelperCatalog::new()).await;
    assert!(matches!(result, Err(StencilError::SourceNotFound(_))));
}

#[tokio::test]
async fn test_malformed_runtime_source() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "runtime.json", "function Handlebars() {");
    let mut config = site_config(root.path());
    config.source = Some(root.path().join("runtime.json"));

    let err = build_renderer(&config, Box::new(HandlebarsEngine::new()), HelperCatalog::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, StencilError::InvalidSource { .. }));
    assert_eq!(err.category(), ErrorCategory::Misconfiguration);
}

#[tokio::test]
async fn test_script_and_host_helpers() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "helpers/twice.rhai", "params[0] * 2");
    write(root.path(), "templates/calc.hbs", "{{twice n}} {{upper word}}");

    let mut config = site_config(root.path());
    config.script_helpers = vec![root.path().join("helpers/twice.rhai")];
    config.host_helpers = vec!["upper".into()];

    let renderer = renderer(&config).await;
    let output = renderer.render("calc", &json!({ "n": 21, "word": "hi" })).await.unwrap();
    assert_eq!(output, "42 HI");
}

#[tokio::test]
async fn test_missing_helpers() {
    let root = tempfile::tempdir().unwrap();

    let mut config = site_config(root.path());
    config.script_helpers = vec![root.path().join("helpers/absent.rhai")];
    let result =
        build_renderer(&config, Box::new(HandlebarsEngine::new()), HelperCatalog::new()).await;
    assert!(matches!(result, Err(StencilError::HelperNotFound(_))));

    let mut config = site_config(root.path());
    config.host_helpers = vec!["shout".into()];
    let result =
        build_renderer(&config, Box::new(HandlebarsEngine::new()), HelperCatalog::builtin()).await;
    assert!(matches!(result, Err(StencilError::HelperNotFound(ref name)) if name == "shout"));
}

#[tokio::test]
async fn test_invalid_script_helper() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "helpers/broken.rhai", "let x = ;");

    let mut config = site_config(root.path());
    config.script_helpers = vec![root.path().join("helpers/broken.rhai")];
    let result =
        build_renderer(&config, Box::new(HandlebarsEngine::new()), HelperCatalog::new()).await;
    assert!(matches!(result, Err(StencilError::InvalidHelper { ref name, .. }) if name == "broken"));
}

#[tokio::test]
async fn test_filesystem_cache_survives_restart() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/page.hbs", "{{> header}}{{body}}");
    write(root.path(), "partials/header.hbs", "[{{title}}]");

    let mut config = site_config(root.path());
    config.cache = cache("filesystem", Some(root.path().join("cache")));
    let params = json!({ "title": "T", "body": "B" });

    let warm = renderer(&config).await;
    assert_eq!(warm.render("page", &params).await.unwrap(), "[T]B");

    let engine = CountingEngine::default();
    let compiles = engine.compiles.clone();
    let restarted = build_renderer(&config, Box::new(engine), HelperCatalog::new())
        .await
        .unwrap();
    assert_eq!(restarted.render("page", &params).await.unwrap(), "[T]B");
    assert_eq!(compiles.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_warm_reports_each_template() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "templates/greet.hbs", "Hello");
    write(root.path(), "templates/admin/users.hbs", "Users");
    write(root.path(), "templates/bad.hbs", "{{#if x}}");
    write(root.path(), "partials/header.hbs", "Header");

    let renderer = renderer(&site_config(root.path())).await;

    let report = renderer.warm().await.unwrap();
    assert_eq!(report.compiled, vec!["admin/users".to_string(), "greet".to_string()]);
    assert_eq!(report.cached, vec!["partials::header".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "bad");

    let again = renderer.warm().await.unwrap();
    assert!(again.compiled.is_empty());
    assert_eq!(again.cached.len(), 3);
    assert_eq!(renderer.render("admin/users", &json!({})).await.unwrap(), "Users");
}

#[tokio::test]
async fn test_get_paths_reports_namespaces() {
    let root = tempfile::tempdir().unwrap();
    let mut renderer = renderer(&site_config(root.path())).await;
    renderer.add_path(root.path().join("extra"), None);

    let paths = renderer.get_paths();
    assert_eq!(paths.len(), 3);
    assert_eq!(paths[0].namespace, None);
    assert_eq!(paths[0].path, root.path().join("templates"));
    assert_eq!(paths[1].path, root.path().join("extra"));
    assert_eq!(paths[2].namespace.as_deref(), Some("partials"));
}
