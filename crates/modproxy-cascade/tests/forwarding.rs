//! Cascade back-end against a mock upstream proxy.

use std::sync::Arc;

use mockito::Server;
use tokio::io::AsyncReadExt;

use modproxy_cascade::CascadePlugin;
use modproxy_core::{BasicAuth, ModuleRequest, Plugin, RequestContext};

#[tokio::test]
async fn test_versions_forwarded() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/example.com/m/@v/list")
        .with_body("v0.1.0\nv0.2.0\n\n")
        .create_async()
        .await;

    let plugin = CascadePlugin::new(server.url());
    let module = plugin
        .module_for(&ModuleRequest::new("example.com/m"))
        .await
        .unwrap();
    let versions = module.versions(&RequestContext::new(), "").await.unwrap();
    assert_eq!(versions, vec!["v0.1.0", "v0.2.0"]);
}

#[tokio::test]
async fn test_encoded_path_hits_upstream() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/github.com/!burnt!sushi/toml/@v/list")
        .with_body("v1.0.0\n")
        .create_async()
        .await;

    let plugin = CascadePlugin::new(server.url());
    let module = plugin
        .module_for(&ModuleRequest::new("github.com/BurntSushi/toml"))
        .await
        .unwrap();
    let versions = module.versions(&RequestContext::new(), "").await.unwrap();
    assert_eq!(versions, vec!["v1.0.0"]);
}

#[tokio::test]
async fn test_stat_decodes_rev_info() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/example.com/m/@v/v1.2.3.info")
        .with_body(r#"{"Version":"v1.2.3","Time":"2023-01-02T03:04:05Z"}"#)
        .create_async()
        .await;

    let plugin = CascadePlugin::new(server.url());
    let module = plugin
        .module_for(&ModuleRequest::new("example.com/m"))
        .await
        .unwrap();
    let info = module.stat(&RequestContext::new(), "v1.2.3").await.unwrap();
    assert_eq!(info.version, "v1.2.3");
    assert_eq!(info.time, "2023-01-02T03:04:05Z");
}

#[tokio::test]
async fn test_zip_streams_bytes() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/example.com/m/@v/v1.0.0.zip")
        .with_body(b"PK\x03\x04fake-zip-bytes")
        .create_async()
        .await;

    let plugin = CascadePlugin::new(server.url());
    let module = plugin
        .module_for(&ModuleRequest::new("example.com/m"))
        .await
        .unwrap();
    let mut reader = module.zip(&RequestContext::new(), "v1.0.0").await.unwrap();
    let mut data = Vec::new();
    reader.read_to_end(&mut data).await.unwrap();
    assert_eq!(data, b"PK\x03\x04fake-zip-bytes");
}

#[tokio::test]
async fn test_upstream_error_carries_status_and_body() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/example.com/m/@v/v9.9.9.mod")
        .with_status(410)
        .with_body("gone")
        .create_async()
        .await;

    let plugin = CascadePlugin::new(server.url());
    let module = plugin
        .module_for(&ModuleRequest::new("example.com/m"))
        .await
        .unwrap();
    let err = module
        .go_mod(&RequestContext::new(), "v9.9.9")
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("410"));
    assert!(msg.contains("gone"));
}

#[tokio::test]
async fn test_basic_auth_propagates_through_filter() {
    let mut server = Server::new_async().await;
    // user:pass
    let _m = server
        .mock("GET", "/example.com/m/@v/list")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_body("v0.1.0\n")
        .create_async()
        .await;

    let plugin = CascadePlugin::with_creds_filter(server.url(), Arc::new(|_| true));
    let mut request = ModuleRequest::new("example.com/m");
    request.basic_auth = Some(BasicAuth {
        user: "user".into(),
        password: "pass".into(),
    });
    let module = plugin.module_for(&request).await.unwrap();
    let versions = module.versions(&RequestContext::new(), "").await.unwrap();
    assert_eq!(versions, vec!["v0.1.0"]);
}

#[tokio::test]
async fn test_cancelled_context_is_honored() {
    let server = Server::new_async().await;
    let plugin = CascadePlugin::new(server.url());
    let module = plugin
        .module_for(&ModuleRequest::new("example.com/m"))
        .await
        .unwrap();

    let ctx = RequestContext::new();
    ctx.cancel();
    assert!(module.versions(&ctx, "").await.unwrap_err().is_cancelled());
}
