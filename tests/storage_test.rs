use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use service_catalog::services::{CatalogError, Identifier, Storage};

async fn register(storage: &Storage, name: &str, host: &str, port: u16, tags: &[&str]) -> Identifier {
    storage
        .register(
            name.to_string(),
            host.to_string(),
            port,
            tags.iter().map(|t| t.to_string()).collect(),
            serde_json::Value::Null,
        )
        .await
}

#[tokio::test]
async fn test_register_round_trip() {
    let storage = Storage::default();
    let cases = [
        ("websrever", "localhost", 8080u16, vec!["web", "http"]),
        ("websrever2", "localhost", 8081, vec!["web", "http"]),
        ("auth", "10.0.0.3", 8001, vec!["auth", "http"]),
    ];

    for (name, host, port, tags) in cases {
        let id = register(&storage, name, host, port, &tags).await;
        let record = storage.service(Some(id), None).await.expect("service should exist");

        assert_eq!(record.id, id);
        assert_eq!(record.name, name);
        assert_eq!(record.host, host);
        assert_eq!(record.port, port);
        assert_eq!(record.address, format!("{host}:{port}"));
        assert_eq!(record.tags, tags.iter().map(|t| t.to_string()).collect::<Vec<_>>());
    }

    assert_eq!(storage.services().await.len(), 3);
}

#[tokio::test]
async fn test_additional_payload_passes_through() {
    let storage = Storage::default();
    let additional = serde_json::json!({"owner": "ops", "weights": [1, 2, 3]});
    let id = storage
        .register(
            "mailservice".to_string(),
            "localhost".to_string(),
            8001,
            Vec::new(),
            additional.clone(),
        )
        .await;

    let record = storage.service(Some(id), None).await.unwrap();
    assert_eq!(record.additional, additional);
}

#[tokio::test]
async fn test_concurrent_registers_yield_distinct_ids() {
    let storage = Arc::new(Storage::default());

    let handles = (0..64u16).map(|i| {
        let storage = storage.clone();
        tokio::spawn(async move { register(&storage, &format!("svc-{i}"), "localhost", 9000 + i, &[]).await })
    });

    let ids: HashSet<Identifier> = join_all(handles)
        .await
        .into_iter()
        .map(|result| result.unwrap())
        .collect();

    assert_eq!(ids.len(), 64);
    assert_eq!(storage.len().await, 64);
}

#[tokio::test]
async fn test_concurrent_register_and_list() {
    let storage = Storage::default();

    let writers = (0..32u16).map(|i| {
        let storage = storage.clone();
        tokio::spawn(async move {
            register(&storage, &format!("writer-{i}"), "127.0.0.1", 10000 + i, &["w"]).await;
        })
    });
    let readers = (0..32).map(|_| {
        let storage = storage.clone();
        tokio::spawn(async move {
            for record in storage.services().await.values() {
                // 快照中的记录必须完整
                assert_eq!(record.address, format!("{}:{}", record.host, record.port));
                assert!(record.name.starts_with("writer-"));
                assert_eq!(record.tags, vec!["w".to_string()]);
            }
        })
    });

    for result in join_all(writers.chain(readers)).await {
        result.unwrap();
    }

    assert_eq!(storage.services().await.len(), 32);
}

#[tokio::test]
async fn test_deregister_then_lookup() {
    let storage = Storage::default();
    let id = register(&storage, "webserver", "localhost", 8082, &["http"]).await;

    storage.deregister(Some(id), None).await.unwrap();
    assert!(matches!(
        storage.service(Some(id), None).await,
        Err(CatalogError::UndefinedService)
    ));

    // 再次注销同一个 ID 不报错
    storage.deregister(Some(id), None).await.unwrap();
}

#[tokio::test]
async fn test_id_takes_precedence_over_name() {
    let storage = Storage::default();
    let web = register(&storage, "webserver", "localhost", 8080, &[]).await;
    let auth = register(&storage, "auth", "localhost", 7000, &[]).await;

    let record = storage.service(Some(web), Some("auth")).await.unwrap();
    assert_eq!(record.id, web);
    assert_eq!(record.name, "webserver");

    // ID 不存在时不会退回到名称查找
    assert!(matches!(
        storage.service(Some(Identifier::from(1)), Some("auth")).await,
        Err(CatalogError::UndefinedService)
    ));

    storage.deregister(Some(web), Some("auth")).await.unwrap();
    assert!(storage.service(Some(auth), None).await.is_ok());
    assert!(storage.service(Some(web), None).await.is_err());
}

#[tokio::test]
async fn test_unknown_name_is_undefined() {
    let storage = Storage::default();
    register(&storage, "webserver", "localhost", 8080, &[]).await;

    assert!(matches!(
        storage.service(None, Some("nothing")).await,
        Err(CatalogError::UndefinedService)
    ));
}

#[tokio::test]
async fn test_error_messages() {
    assert_eq!(CatalogError::UndefinedService.to_string(), "undefined service");
    assert_eq!(
        CatalogError::ServiceRequestInvalid.to_string(),
        "service request must contain at least an ID"
    );
    assert_eq!(
        Identifier::parse("nope").unwrap_err().to_string(),
        "invalid identifier: nope"
    );
}
