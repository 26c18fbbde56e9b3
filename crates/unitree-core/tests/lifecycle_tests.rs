//! ---
//! utr_section: "04-lifecycle-engine"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit lifecycle engine and collaborator seams."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;
use serde_json::{json, Value};
use unitree_common::config::LifecycleConfig;
use unitree_core::{
    base_type, BoundResource, Extension, Fault, FetchOptions, HookContext, HookKind, HookOutput,
    InMemoryLoader, LoadOutcome, LoaderCall, ResourceFlag, Unit, UnitError, UnitOptions,
    UnitServices, UnitType,
};
use unitree_logging::{DiagnosticKind, MemorySink};

fn services() -> (UnitServices, InMemoryLoader, MemorySink) {
    let loader = InMemoryLoader::new();
    let sink = MemorySink::new();
    let services = UnitServices::default()
        .with_loader(Arc::new(loader.clone()))
        .with_diagnostics(Arc::new(sink.clone()));
    (services, loader, sink)
}

fn recording_type(name: &str, log: Arc<Mutex<Vec<String>>>) -> Arc<UnitType> {
    base_type().extend(Extension::named(name).on_load(move |ctx: HookContext, _| {
        log.lock().push(ctx.unit_key().to_owned());
    }))
}

#[tokio::test]
async fn derived_type_overrides_and_falls_back() {
    let shown = Arc::new(AtomicUsize::new(0));
    let counter = shown.clone();
    let panel = base_type().extend(Extension::named("Panel").on_show(move |_ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(Arc::ptr_eq(panel.parent().unwrap(), &base_type()));
    assert!(panel.is_subtype_of(&base_type()));

    let mut unit = Unit::new(&panel, UnitOptions::new());
    assert!(unit.is_instance_of(&base_type()));
    unit.load(Value::Null).await.unwrap();
    unit.show().await.unwrap();
    unit.hide().await.unwrap();
    assert_eq!(shown.load(Ordering::SeqCst), 1);
    assert!(!unit.is_shown());
}

#[tokio::test]
async fn most_derived_initialize_runs_once_with_supplied_options() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(None));
    let (c, s) = (calls.clone(), seen.clone());
    let form = base_type().extend(Extension::named("Form").initialize_with(
        move |unit, options, parent| {
            c.fetch_add(1, Ordering::SeqCst);
            *s.lock() = options.get("a").cloned();
            parent.initialize(unit, options);
        },
    ));
    let login = form.derive("LoginForm");

    let unit = Unit::new(&login, UnitOptions::new().with_option("a", 1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock(), Some(json!(1)));
    assert_eq!(unit.option("a"), Some(&json!(1)));
    assert_eq!(unit.unit_type().name(), "LoginForm");
}

#[tokio::test]
async fn custom_constructor_builds_on_parent_constructor() {
    let ty = base_type().extend(Extension::named("Shell").construct_with(|ctx, options| {
        let mut unit = ctx.construct_parent(options.with_option("constructed", true));
        unit.add_child("status", Unit::new(&base_type(), UnitOptions::new()));
        unit
    }));

    let unit = Unit::new(&ty, UnitOptions::new());
    assert_eq!(unit.option("constructed"), Some(&json!(true)));
    assert_eq!(unit.child_count(), 1);
    assert_eq!(unit.child("status").unwrap().key(), "status");
    assert_eq!(unit.unit_type().name(), "Shell");
}

#[tokio::test]
async fn load_runs_hook_once_with_exact_options() {
    let loads = Arc::new(AtomicUsize::new(0));
    let captured = Arc::new(Mutex::new(None));
    let (l, c) = (loads.clone(), captured.clone());
    let ty = base_type().extend(Extension::named("Feed").on_load(move |_ctx, options| {
        l.fetch_add(1, Ordering::SeqCst);
        *c.lock() = Some(options);
    }));
    let resource = BoundResource::new();
    let mut unit = Unit::new(&ty, UnitOptions::new().with_resource(resource.clone()));

    let first = unit.load(json!({"a": 1})).await.unwrap();
    let second = unit.load(json!({"a": 2})).await.unwrap();

    assert!(matches!(first, LoadOutcome::Loaded));
    assert!(matches!(second, LoadOutcome::AlreadyLoaded));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(*captured.lock(), Some(json!({"a": 1})));
    assert!(unit.is_loaded());
    assert!(resource.has(ResourceFlag::Loaded));
}

#[tokio::test]
async fn children_load_before_parent_hook() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let leaf = recording_type("Leaf", log.clone());
    let page = recording_type("Page", log.clone());

    let mut root = Unit::new(&page, UnitOptions::new())
        .with_child("a", Unit::new(&leaf, UnitOptions::new()))
        .with_child("b", Unit::new(&leaf, UnitOptions::new()));
    root.load(Value::Null).await.unwrap();

    let order = log.lock().clone();
    assert_eq!(order.len(), 3);
    assert_eq!(order.last().map(String::as_str), Some("Page"));
    assert!(order[..2].contains(&"a".to_owned()));
    assert!(order[..2].contains(&"b".to_owned()));
    assert!(root.children().all(|(_, child)| child.is_loaded()));
}

#[tokio::test]
async fn failing_child_prevents_parent_hook() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let page = recording_type("Page", log.clone());
    let broken = base_type().extend(
        Extension::named("Broken")
            .on_load(|_ctx, _options| HookOutput::fail(anyhow!("template missing")))
            .on_error(|_ctx, fault: Fault| HookOutput::fail(anyhow!("cannot render error: {fault}"))),
    );

    let mut root = Unit::new(&page, UnitOptions::new())
        .with_child("bad", Unit::new(&broken, UnitOptions::new()));
    let err = root.load(Value::Null).await.unwrap_err();

    match &err {
        UnitError::ChildLoad { child, .. } => assert_eq!(child, "bad"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        err.root_fault().unwrap().to_string(),
        "cannot render error: template missing"
    );
    assert!(log.lock().is_empty());
    assert!(!root.is_loaded());
    assert!(root.child("bad").unwrap().is_errored());
}

#[tokio::test]
async fn sibling_loads_finish_when_another_child_fails() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let slow = base_type().extend(Extension::named("Slow").on_load(move |_ctx, _options| {
        let flag = flag.clone();
        HookOutput::deferred(async move {
            tokio::task::yield_now().await;
            flag.store(true, Ordering::SeqCst);
            Ok::<Value, anyhow::Error>(Value::Null)
        })
    }));
    let broken = base_type().extend(
        Extension::named("Broken")
            .on_load(|_ctx, _options| HookOutput::fail(anyhow!("template missing")))
            .on_error(|_ctx, _fault: Fault| HookOutput::fail(anyhow!("no fallback"))),
    );
    let log = Arc::new(Mutex::new(Vec::new()));
    let page = recording_type("Page", log.clone());

    let mut root = Unit::new(&page, UnitOptions::new())
        .with_child("slow", Unit::new(&slow, UnitOptions::new()))
        .with_child("bad", Unit::new(&broken, UnitOptions::new()));
    let err = root.load(Value::Null).await.unwrap_err();

    assert!(matches!(&err, UnitError::ChildLoad { child, .. } if child == "bad"));
    assert!(finished.load(Ordering::SeqCst));
    assert!(root.child("slow").unwrap().is_loaded());
    assert!(log.lock().is_empty());
    assert!(!root.is_loaded());
}

#[tokio::test]
async fn handled_child_failure_does_not_fail_parent() {
    let broken = base_type().extend(
        Extension::named("Broken").on_load(|_ctx, _options| HookOutput::fail(anyhow!("offline"))),
    );
    let mut root = Unit::new(&base_type(), UnitOptions::new())
        .with_child("feed", Unit::new(&broken, UnitOptions::new()));

    let outcome = root.load(Value::Null).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded));
    let feed = root.child("feed").unwrap();
    assert!(feed.is_errored());
    assert!(!feed.is_loaded());
    assert_eq!(feed.last_error().unwrap().to_string(), "offline");
}

#[tokio::test]
async fn load_hook_failure_is_routed_into_error() {
    let received = Arc::new(Mutex::new(None::<Fault>));
    let r = received.clone();
    let ty = base_type().extend(
        Extension::named("Chart")
            .on_load(|_ctx, _options| {
                HookOutput::deferred(async { Err::<Value, _>(anyhow!("bad payload")) })
            })
            .on_error(move |_ctx, fault| {
                *r.lock() = Some(fault);
            }),
    );
    let (services, _loader, sink) = services();
    let resource = BoundResource::new();
    let mut unit = Unit::with_services(
        &ty,
        services,
        UnitOptions::new().with_resource(resource.clone()),
    );

    let outcome = unit.load(Value::Null).await.unwrap();
    let LoadOutcome::Errored(fault) = outcome else {
        panic!("load should report the routed fault");
    };
    assert_eq!(fault.to_string(), "bad payload");
    assert!(received.lock().as_ref().unwrap().same_as(&fault));
    assert!(unit.last_error().unwrap().same_as(&fault));
    assert!(!unit.is_loaded());
    assert!(unit.is_errored());
    assert!(resource.has(ResourceFlag::Erroring));
    assert!(!resource.has(ResourceFlag::Loaded));
    assert_eq!(sink.count(DiagnosticKind::UnitErrored), 1);
}

#[tokio::test]
async fn plain_and_deferred_hook_values_are_awaited() {
    let ty = base_type().extend(
        Extension::named("Mixed")
            .on_load(|_ctx, _options| Value::Null)
            .on_show(|_ctx| json!({"rendered": true}))
            .on_hide(|_ctx| {
                HookOutput::deferred(async {
                    tokio::task::yield_now().await;
                    Ok(Value::Null)
                })
            })
            .on_enable(|_ctx| -> anyhow::Result<()> { Ok(()) }),
    );
    let mut unit = Unit::new(&ty, UnitOptions::new());

    unit.load(Value::Null).await.unwrap();
    unit.show().await.unwrap();
    assert!(unit.is_shown());
    unit.hide().await.unwrap();
    unit.disable().await.unwrap();
    unit.enable().await.unwrap();
    unit.error(None).await.unwrap();
    assert!(!unit.is_shown());
    assert!(!unit.is_disabled());
}

#[tokio::test]
async fn show_hook_failure_propagates() {
    let ty = base_type().extend(
        Extension::named("Flaky").on_show(|_ctx| HookOutput::fail(anyhow!("no layout"))),
    );
    let mut unit = Unit::new(&ty, UnitOptions::new());
    unit.load(Value::Null).await.unwrap();

    let err = unit.show().await.unwrap_err();
    match err {
        UnitError::Hook { hook, source, .. } => {
            assert_eq!(hook, HookKind::Show);
            assert_eq!(source.to_string(), "no layout");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!unit.is_errored());
}

#[tokio::test]
async fn destroy_cascades_and_restores_resource_flags() {
    let mut root = Unit::new(&base_type(), UnitOptions::new());
    let mut resources = Vec::new();
    for idx in 0..5 {
        let resource = BoundResource::with_flags([ResourceFlag::Disabled]);
        resources.push(resource.clone());
        let child = Unit::new(&base_type(), UnitOptions::new().with_resource(resource));
        root.add_child(format!("child-{idx}"), child);
    }
    root.load(Value::Null).await.unwrap();
    for idx in 0..5 {
        root.child_mut(&format!("child-{idx}"))
            .unwrap()
            .enable()
            .await
            .unwrap();
    }
    assert!(resources.iter().all(|r| !r.has(ResourceFlag::Disabled)));

    root.destroy();
    assert_eq!(root.child_count(), 0);
    assert!(root.is_destroyed());
    assert!(resources.iter().all(|r| r.has(ResourceFlag::Disabled)));

    root.destroy();
    assert!(matches!(
        root.load(Value::Null).await,
        Err(UnitError::Destroyed { .. })
    ));
    assert!(matches!(root.show().await, Err(UnitError::Destroyed { .. })));
}

#[tokio::test]
async fn destroy_restores_original_markings() {
    let resource = BoundResource::with_flags([ResourceFlag::Disabled]);
    let mut unit = Unit::new(&base_type(), UnitOptions::new().with_resource(resource.clone()));
    assert!(unit.original_flags().disabled);
    assert!(!unit.original_flags().erroring);

    unit.enable().await.unwrap();
    unit.error(Some(Fault::msg("boom"))).await.unwrap();
    assert!(!resource.has(ResourceFlag::Disabled));
    assert!(resource.has(ResourceFlag::Erroring));

    unit.destroy();
    assert!(resource.has(ResourceFlag::Disabled));
    assert!(!resource.has(ResourceFlag::Erroring));
}

#[tokio::test]
async fn resource_state_is_adopted_at_construction() {
    let (services, _loader, sink) = services();
    let disabled = BoundResource::with_flags([ResourceFlag::Disabled]);
    let unit = Unit::with_services(
        &base_type(),
        services.clone(),
        UnitOptions::new().with_resource(disabled),
    );
    assert!(unit.is_disabled());
    assert!(!unit.is_errored());

    let erroring = BoundResource::with_flags([ResourceFlag::Erroring]);
    let unit = Unit::with_services(
        &base_type(),
        services,
        UnitOptions::new().with_resource(erroring),
    );
    assert!(unit.is_errored());
    assert_eq!(unit.last_error().unwrap().to_string(), "unspecified unit error");
    assert_eq!(sink.count(DiagnosticKind::UnitErrored), 1);
}

#[tokio::test]
async fn deferred_adoption_failure_is_reported_on_load() {
    let ty = base_type().extend(Extension::named("Locked").on_disable(|_ctx| {
        HookOutput::deferred(async { Err::<Value, _>(anyhow!("cannot grey out")) })
    }));
    let (services, _loader, sink) = services();
    let resource = BoundResource::with_flags([ResourceFlag::Disabled]);
    let mut unit = Unit::with_services(&ty, services, UnitOptions::new().with_resource(resource));
    assert!(unit.is_disabled());
    assert_eq!(sink.count(DiagnosticKind::AdoptionHookFailed), 0);

    let outcome = unit.load(Value::Null).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded));
    assert_eq!(sink.count(DiagnosticKind::AdoptionHookFailed), 1);
}

#[tokio::test]
async fn adoption_work_settles_before_an_early_enable() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let (on_disable, on_enable) = (order.clone(), order.clone());
    let ty = base_type().extend(
        Extension::named("Toggle")
            .on_disable(move |_ctx| {
                let order = on_disable.clone();
                HookOutput::deferred(async move {
                    tokio::task::yield_now().await;
                    order.lock().push("disable-work");
                    Ok::<Value, anyhow::Error>(Value::Null)
                })
            })
            .on_enable(move |_ctx| {
                on_enable.lock().push("enable-work");
            }),
    );
    let resource = BoundResource::with_flags([ResourceFlag::Disabled]);
    let mut unit = Unit::new(&ty, UnitOptions::new().with_resource(resource.clone()));
    assert!(order.lock().is_empty());

    unit.enable().await.unwrap();
    assert_eq!(*order.lock(), vec!["disable-work", "enable-work"]);
    assert!(!unit.is_disabled());
    assert!(!resource.has(ResourceFlag::Disabled));

    unit.load(Value::Null).await.unwrap();
    assert_eq!(order.lock().len(), 2);
}

#[tokio::test]
async fn show_before_load_warns_and_marks_active() {
    let (services, _loader, sink) = services();
    let resource = BoundResource::new();
    let mut unit = Unit::with_services(
        &base_type(),
        services,
        UnitOptions::new().with_resource(resource.clone()),
    );

    unit.show().await.unwrap();
    assert!(resource.has(ResourceFlag::Active));
    assert!(unit.is_shown());
    unit.hide().await.unwrap();
    assert!(!resource.has(ResourceFlag::Active));

    assert_eq!(sink.count(DiagnosticKind::ShowBeforeLoad), 1);
    assert_eq!(sink.count(DiagnosticKind::HideBeforeLoad), 1);

    unit.load(Value::Null).await.unwrap();
    unit.show().await.unwrap();
    assert_eq!(sink.count(DiagnosticKind::ShowBeforeLoad), 1);
}

#[tokio::test]
async fn premature_show_warning_can_be_disabled() {
    let (services, _loader, sink) = services();
    let services = services.with_lifecycle(LifecycleConfig {
        warn_before_load: false,
        ..LifecycleConfig::default()
    });
    let mut unit = Unit::with_services(&base_type(), services, UnitOptions::new());
    unit.show().await.unwrap();
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn error_uses_configured_default_message() {
    let (services, _loader, sink) = services();
    let services = services.with_lifecycle(LifecycleConfig {
        default_error_message: "widget failed".into(),
        ..LifecycleConfig::default()
    });
    let resource = BoundResource::new();
    let mut unit = Unit::with_services(
        &base_type(),
        services,
        UnitOptions::new().with_resource(resource.clone()),
    );
    unit.load(Value::Null).await.unwrap();

    unit.error(None).await.unwrap();
    assert!(unit.is_errored());
    assert!(!unit.is_loaded());
    assert!(resource.has(ResourceFlag::Erroring));
    assert_eq!(unit.last_error().unwrap().to_string(), "widget failed");
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "widget failed");
}

#[tokio::test]
async fn loader_pass_throughs_reach_the_loader() {
    let (services, loader, _sink) = services();
    let loader = loader
        .with_template("card.html", "<article/>")
        .with_payload("/api/cards", json!([1, 2]));
    let unit = Unit::with_services(&base_type(), services, UnitOptions::new());

    unit.get_styles(&["x.css".to_owned()]).await.unwrap();
    assert_eq!(loader.calls(), vec![LoaderCall::Css(vec!["x.css".to_owned()])]);

    assert_eq!(unit.get_template("card.html").await.unwrap(), "<article/>");
    let options = FetchOptions::default().with_header("accept", "application/json");
    let data = unit.fetch_remote_data("/api/cards", options.clone()).await.unwrap();
    assert_eq!(data, json!([1, 2]));
    assert_eq!(
        loader.calls().last(),
        Some(&LoaderCall::Data {
            url: "/api/cards".into(),
            options,
        })
    );
    assert!(unit.fetch_remote_data("/api/missing", FetchOptions::default()).await.is_err());
}

#[tokio::test]
async fn default_loader_reports_missing_configuration() {
    let unit = Unit::new(&base_type(), UnitOptions::new());
    let err = unit.get_template("card.html").await.unwrap_err();
    assert!(err.to_string().contains("no resource loader configured"));
}

#[tokio::test]
async fn parent_members_are_reachable_from_overrides() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let (o1, o2) = (order.clone(), order.clone());
    let panel = base_type().extend(Extension::named("Panel").on_load(move |_ctx, _options| {
        o1.lock().push("panel");
    }));
    let tabbed = panel.extend(Extension::named("Tabbed").on_load(
        move |ctx: HookContext, options| {
            o2.lock().push("tabbed");
            ctx.parent_load(options)
        },
    ));

    let mut unit = Unit::new(&tabbed, UnitOptions::new());
    unit.load(Value::Null).await.unwrap();
    assert_eq!(*order.lock(), vec!["tabbed", "panel"]);
}

#[test]
fn transform_data_defaults_to_identity() {
    let plain = Unit::new(&base_type(), UnitOptions::new());
    assert_eq!(plain.transform_data(json!({"a": 1})), json!({"a": 1}));

    let wrapper = base_type().extend(Extension::named("Wrapper").transform_with(|ctx, data| {
        json!({ "wrapped": ctx.parent_transform_data(data) })
    }));
    let unit = Unit::new(&wrapper, UnitOptions::new());
    assert_eq!(unit.transform_data(json!(3)), json!({"wrapped": 3}));
}

#[test]
fn statics_and_default_options_follow_the_chain() {
    let card = base_type().extend(
        Extension::named("Card")
            .with_static("tag", "article")
            .with_static("selectable", true)
            .with_default_option("theme", "light"),
    );
    let banner = card.extend(Extension::named("Banner").with_static("tag", "header"));

    assert_eq!(banner.static_member("tag"), Some(&json!("header")));
    assert_eq!(banner.static_member("selectable"), Some(&json!(true)));
    assert_eq!(card.static_member("tag"), Some(&json!("article")));

    let themed = Unit::new(&banner, UnitOptions::new());
    assert_eq!(themed.option("theme"), Some(&json!("light")));
    let dark = Unit::new(&banner, UnitOptions::new().with_option("theme", "dark"));
    assert_eq!(dark.option("theme"), Some(&json!("dark")));
}
