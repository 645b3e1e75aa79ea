use criterion::{criterion_group, criterion_main, Criterion};
use ctlrouter::cors::CorsPolicy;
use ctlrouter::handler::{HandlerGroup, ParamSpec, Route};
use ctlrouter::router::{CollisionPolicy, RouteRegistry, Router};
use ctlrouter::security::{AuthScheme, Authenticator, NoCredentialStore};
use ctlrouter::server::{parse_request, AppService, RawRequest};
use ctlrouter::Principal;
use http::Method;
use std::hint::black_box;
use std::sync::Arc;

fn zoo_groups() -> Vec<Arc<HandlerGroup>> {
    let animals = HandlerGroup::new("animals")
        .route(Route::get("/zoo/animals").handler(|ctx, _| {
            ctx.ok();
            Ok(())
        }))
        .route(Route::post("/zoo/animals").handler(|ctx, _| {
            ctx.created();
            Ok(())
        }))
        .route(
            Route::get("/zoo/animal")
                .params([ParamSpec::int("id"), ParamSpec::text("expand").optional()])
                .handler(|ctx, args| {
                    let id: i64 = args.get("id")?;
                    ctx.ok_text(id.to_string());
                    Ok(())
                }),
        )
        .route(
            Route::delete("/zoo/animal")
                .role("Keeper")
                .param(ParamSpec::int("id"))
                .handler(|ctx, _| {
                    ctx.ok();
                    Ok(())
                }),
        );
    let inventory = HandlerGroup::new("inventory")
        .route(
            Route::post("/inventory/batch")
                .param(ParamSpec::value("batch"))
                .handler(|ctx, args| {
                    let batch = args.raw("batch").cloned().unwrap_or_default();
                    ctx.ok_json(&batch)
                }),
        )
        .route(Route::head("/zoo/health").handler(|ctx, _| {
            ctx.ok();
            Ok(())
        }));
    vec![Arc::new(animals), Arc::new(inventory)]
}

fn bench_parse_and_resolve(c: &mut Criterion) {
    let router = Router::new(RouteRegistry::build(zoo_groups(), CollisionPolicy::FirstWins).unwrap());
    let anon = Principal::anonymous();
    let requests = [
        RawRequest::new("GET", "/zoo/animals"),
        RawRequest::new("GET", "/zoo/animal/123?expand=toys"),
        RawRequest::new("DELETE", "/zoo/animal/123"),
        RawRequest::new("HEAD", "/zoo/health"),
        RawRequest::new("GET", "/does/not/exist"),
    ];

    c.bench_function("parse_and_resolve", |b| {
        b.iter(|| {
            for raw in &requests {
                let parsed = parse_request(raw, router.registry());
                let method = Method::from_bytes(raw.method.as_bytes()).unwrap_or(Method::GET);
                let res = router.resolve(&parsed.method_name, &method, &anon);
                black_box(&res);
            }
        })
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let registry = RouteRegistry::build(zoo_groups(), CollisionPolicy::FirstWins).unwrap();
    let service = AppService::new(
        Router::new(registry),
        Authenticator::new(&AuthScheme::None, Arc::new(NoCredentialStore)),
        CorsPolicy::permissive(),
    );
    let get = RawRequest::new("GET", "/zoo/animal/42?expand=toys");
    let post = RawRequest::new("POST", "/inventory/batch")
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"items":[1,2,3],"warehouse":"north"}"#);

    c.bench_function("pipeline_get_path_param", |b| {
        b.iter(|| black_box(service.handle(&get)))
    });
    c.bench_function("pipeline_post_json", |b| {
        b.iter(|| black_box(service.handle(&post)))
    });
}

criterion_group!(benches, bench_parse_and_resolve, bench_full_pipeline);
criterion_main!(benches);
