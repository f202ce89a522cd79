use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::TcpListener;

use service_catalog::services::health::{
    HealthcheckSource, HealthcheckSpec, ProbeError, StaticHealthcheckSource, TcpHealthcheckSource,
};
use service_catalog::services::{Identifier, Storage, TcpProbe};

const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

// 启动一个持续 accept 的本地监听器，返回端口与任务句柄
async fn start_listener() -> (u16, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        loop {
            if listener.accept().await.is_err() {
                break;
            }
        }
    });
    (port, handle)
}

async fn register(storage: &Storage, name: &str, port: u16) -> Identifier {
    storage
        .register(
            name.to_string(),
            "127.0.0.1".to_string(),
            port,
            vec!["tcp".to_string()],
            serde_json::Value::Null,
        )
        .await
}

#[tokio::test]
async fn test_liveness_converges_with_listener() {
    let (port, listener) = start_listener().await;
    let storage = Storage::default();
    let id = register(&storage, "webserver", port).await;

    let spec = HealthcheckSpec::new(
        Duration::from_secs(2),
        TcpProbe::new(format!("127.0.0.1:{port}"), PROBE_TIMEOUT),
    );
    storage.setup_healthcheck(id, Some(spec)).await.unwrap();

    storage.healthcheck().await.unwrap();
    assert!(storage.service(Some(id), None).await.unwrap().is_alive);

    listener.abort();
    let _ = listener.await;
    tokio::time::sleep(PROBE_TIMEOUT).await;

    storage.healthcheck().await.unwrap();
    assert!(!storage.service(Some(id), None).await.unwrap().is_alive);
}

#[tokio::test]
async fn test_tcp_source_sets_liveness_at_registration() {
    let (port, _listener) = start_listener().await;
    let closed_port = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        probe.local_addr().unwrap().port()
    };

    let source: Arc<dyn HealthcheckSource> =
        Arc::new(TcpHealthcheckSource::new(Duration::from_secs(2), PROBE_TIMEOUT));
    let storage = Storage::new(Some(source), Duration::from_secs(2));

    let up = register(&storage, "searchservice", port).await;
    let down = register(&storage, "mailservice", closed_port).await;

    let up_record = storage.service(Some(up), None).await.unwrap();
    assert!(up_record.healthcheck_enabled);
    assert!(up_record.is_alive);

    // 连不上只是 alive=false，健康检查照样启用
    let down_record = storage.service(Some(down), None).await.unwrap();
    assert!(down_record.healthcheck_enabled);
    assert!(!down_record.is_alive);

    storage.healthcheck().await.unwrap();
    assert!(storage.service(Some(up), None).await.unwrap().is_alive);
    assert!(!storage.service(Some(down), None).await.unwrap().is_alive);
}

#[tokio::test]
async fn test_failing_probe_keeps_registration() {
    let source = StaticHealthcheckSource::new();
    source.insert(
        "flaky",
        HealthcheckSpec::new(Duration::from_secs(1), || async {
            Err::<bool, _>(ProbeError::new("connection error"))
        }),
    );

    let storage = Storage::new(Some(Arc::new(source)), Duration::from_secs(1));
    let flaky = register(&storage, "flaky", 1).await;
    let plain = register(&storage, "plain", 2).await;

    let flaky_record = storage.service(Some(flaky), None).await.unwrap();
    assert!(!flaky_record.healthcheck_enabled);
    assert!(!flaky_record.is_alive);

    let plain_record = storage.service(Some(plain), None).await.unwrap();
    assert!(!plain_record.healthcheck_enabled);

    // 没有启用的探针，整轮检查为空
    storage.healthcheck().await.unwrap();
}

#[tokio::test]
async fn test_pass_error_lets_other_checks_finish() {
    let storage = Storage::default();
    let slow_id = register(&storage, "webserver", 1).await;
    let bad_id = register(&storage, "broken", 2).await;

    // 启用时报告不存活；之后每次先等 100ms 再报告存活并留下标记
    let slow_calls = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));
    let (counter, done) = (slow_calls.clone(), finished.clone());
    storage
        .setup_healthcheck(
            slow_id,
            Some(HealthcheckSpec::new(Duration::from_secs(2), move || {
                let (counter, done) = (counter.clone(), done.clone());
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        return Ok(false);
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    done.store(true, Ordering::SeqCst);
                    Ok(true)
                }
            })),
        )
        .await
        .unwrap();
    assert!(!storage.service(Some(slow_id), None).await.unwrap().is_alive);

    let bad_calls = Arc::new(AtomicUsize::new(0));
    let counter = bad_calls.clone();
    storage
        .setup_healthcheck(
            bad_id,
            Some(HealthcheckSpec::new(Duration::from_secs(2), move || {
                let counter = counter.clone();
                async move {
                    // 第一次调用发生在启用时，必须成功；之后立即失败
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Ok(true)
                    } else {
                        Err(ProbeError::new("check exploded"))
                    }
                }
            })),
        )
        .await
        .unwrap();

    let err = storage.healthcheck().await.unwrap_err();
    assert_eq!(err, ProbeError::new("check exploded"));

    // 错误先返回，慢的探针此时还没跑完
    assert!(!finished.load(Ordering::SeqCst));
    assert!(!storage.service(Some(slow_id), None).await.unwrap().is_alive);

    // 出错的服务保持上一次的状态
    assert!(storage.service(Some(bad_id), None).await.unwrap().is_alive);

    // 慢的探针照常跑完并回写结果
    let mut alive = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        alive = storage.service(Some(slow_id), None).await.unwrap().is_alive;
        if alive {
            break;
        }
    }
    assert!(finished.load(Ordering::SeqCst));
    assert!(alive);
    assert_eq!(slow_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_deregister_during_pass_is_harmless() {
    let storage = Storage::default();
    let id = register(&storage, "slow", 1).await;

    storage
        .setup_healthcheck(
            id,
            Some(HealthcheckSpec::new(Duration::from_secs(1), || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, ProbeError>(true)
            })),
        )
        .await
        .unwrap();

    let pass = {
        let storage = storage.clone();
        tokio::spawn(async move { storage.healthcheck().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    storage.deregister(Some(id), None).await.unwrap();

    pass.await.unwrap().unwrap();
    assert!(storage.is_empty().await);
}
