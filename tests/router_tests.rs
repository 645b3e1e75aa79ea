//! Registry, request parsing and resolution against the sample group

mod common;

use common::sample::sample_group;
use ctlrouter::handler::{HandlerGroup, Route};
use ctlrouter::router::{CollisionPolicy, RegistryError, RouteRegistry, Router};
use ctlrouter::security::NoCredentialStore;
use ctlrouter::server::{parse_request, RawRequest};
use ctlrouter::{DispatchError, Principal, Server, ServerConfig, ServerError};
use http::Method;
use std::sync::Arc;

fn router() -> Router {
    Router::new(RouteRegistry::build([Arc::new(sample_group())], CollisionPolicy::FirstWins).unwrap())
}

fn tagged_group(name: &str, path: &str) -> HandlerGroup {
    let tag = name.to_string();
    HandlerGroup::new(name).route(Route::get(path).handler(move |ctx, _| {
        ctx.ok_text(tag.clone());
        Ok(())
    }))
}

#[test]
fn test_fallback_path_parameter() {
    let router = router();
    let parsed = parse_request(&RawRequest::new("DELETE", "/RemoveItem/5"), router.registry());
    assert_eq!(parsed.method_name, "/RemoveItem");
    assert_eq!(parsed.path_param.as_deref(), Some("5"));
}

#[test]
fn test_exact_match_has_no_path_parameter() {
    let router = router();
    let parsed = parse_request(&RawRequest::new("GET", "/index.htm"), router.registry());
    assert_eq!(parsed.method_name, "/index.htm");
    assert_eq!(parsed.path_param, None);

    let parsed = parse_request(&RawRequest::new("GET", "/objec/sub/subsub"), router.registry());
    assert_eq!(parsed.method_name, "/objec/sub/subsub");
    assert_eq!(parsed.path_param, None);
}

#[test]
fn test_fallback_removes_last_segment_by_position() {
    let router = router();
    let parsed = parse_request(&RawRequest::new("GET", "/5/items/5"), router.registry());
    assert_eq!(parsed.method_name, "/5/items");
    assert_eq!(parsed.path_param.as_deref(), Some("5"));

    let parsed = parse_request(&RawRequest::new("GET", "/RemoveItem/"), router.registry());
    assert_eq!(parsed.path_param, None);
}

#[test]
fn test_fallback_is_single_level() {
    let router = router();
    let parsed = parse_request(&RawRequest::new("DELETE", "/RemoveItem/5/6"), router.registry());
    assert_eq!(parsed.method_name, "/RemoveItem/5");
    let err = router
        .resolve(&parsed.method_name, &Method::DELETE, &Principal::anonymous())
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotFound { .. }));
}

#[test]
fn test_resolution_outcomes() {
    let router = router();
    let anon = Principal::anonymous();
    let admin = Principal::authenticated("alice", ["Admin"]);

    let resolved = router.resolve("/MyMethod", &Method::GET, &anon).unwrap();
    assert_eq!(resolved.group.name(), "sample");
    assert_eq!(resolved.route.handler_name(), "MyMethod");

    assert!(matches!(
        router.resolve("/MyMethod", &Method::PUT, &anon),
        Err(DispatchError::NotFound { .. })
    ));
    assert!(matches!(
        router.resolve("/AdminMethod", &Method::GET, &anon),
        Err(DispatchError::Unauthorized { .. })
    ));
    assert!(router.resolve("/AdminMethod", &Method::GET, &admin).is_ok());
}

#[test]
fn test_resolution_is_idempotent() {
    let router = router();
    let user = Principal::authenticated("bob", ["User"]);
    let first = router.resolve("/AdminMethod", &Method::GET, &user).unwrap_err();
    let second = router.resolve("/AdminMethod", &Method::GET, &user).unwrap_err();
    assert_eq!(first, second);

    let anon = Principal::anonymous();
    let a = router.resolve("/RemoveItem", &Method::DELETE, &anon).unwrap();
    let b = router.resolve("/RemoveItem", &Method::DELETE, &anon).unwrap();
    assert!(Arc::ptr_eq(&a.route, &b.route));
}

#[test]
fn test_first_group_owns_shared_path() {
    let registry = RouteRegistry::build(
        [
            Arc::new(tagged_group("first", "/shared")),
            Arc::new(tagged_group("second", "/shared")),
            Arc::new(tagged_group("second", "/own")),
        ],
        CollisionPolicy::FirstWins,
    )
    .unwrap();
    assert_eq!(registry.group_for("/shared").unwrap().name(), "first");
    assert_eq!(registry.group_for("/own").unwrap().name(), "second");
    assert_eq!(registry.shadowed().len(), 1);
    assert_eq!(registry.shadowed()[0].owner, "first");
    assert_eq!(registry.route_table().len(), 2);
}

#[test]
fn test_reject_policy_fails_start() {
    let config = ServerConfig {
        bind: vec!["127.0.0.1:0".to_string()],
        collision_policy: CollisionPolicy::Reject,
        ..ServerConfig::default()
    };
    let mut server = Server::new(config, Arc::new(NoCredentialStore));
    server.add_group(tagged_group("first", "/shared"));
    server.add_group(tagged_group("second", "/shared"));
    match server.start() {
        Err(ServerError::Registry(RegistryError::PathCollision { path, .. })) => {
            assert_eq!(path, "/shared");
        }
        other => panic!("expected collision, got {other:?}"),
    }
}

#[test]
fn test_route_verbs_are_validated() {
    assert!(Route::with_verb("get", "/x").is_ok());
    assert!(Route::with_verb("TRACE", "/x").is_ok());
    assert!(Route::with_verb("PATCH", "/x").is_err());
}
