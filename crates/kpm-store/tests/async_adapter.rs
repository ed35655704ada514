mod common;

use common::{names, registry};
use std::time::{Duration, Instant};

use kpm_store::{Deadline, ErrorKind, PageRequest};

#[tokio::test]
async fn test_publish_and_search_async() {
    let reg = registry();

    let id = reg
        .store
        .publish_async("async-pkg", "alice", "from a runtime")
        .await
        .unwrap();

    let page = reg
        .store
        .search_async("async", PageRequest::first())
        .await
        .unwrap();
    assert_eq!(names(&page), vec!["async-pkg"]);
    assert_eq!(page.items[0].id, id);

    let pkg = reg.store.get_async("async-pkg").await.unwrap().unwrap();
    assert_eq!(pkg.description, "from a runtime");
    assert_eq!(reg.store.count_async().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publish_async() {
    let reg = registry();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let store = reg.store.clone();
            tokio::spawn(async move {
                store
                    .publish_async("shared", format!("admin-{i}"), "")
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) if err.kind() == ErrorKind::Conflict => conflicts += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 5);
}

#[tokio::test]
async fn test_async_errors_pass_through() {
    let reg = registry();

    let err = reg.store.publish_async("", "alice", "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let page = reg
        .store
        .list_all_async(PageRequest::first())
        .await
        .unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_expired_deadline_async() {
    let reg = registry();
    let expired = Deadline::at(Instant::now());

    let err = reg
        .store
        .publish_within_async("late", "alice", "", expired)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let err = reg
        .store
        .search_within_async("late", PageRequest::first(), expired)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let err = reg.store.count_within_async(expired).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    assert_eq!(reg.store.get_async("late").await.unwrap(), None);
}

#[tokio::test]
async fn test_explicit_deadline_async() {
    let reg = registry();
    let deadline = Deadline::after(Duration::from_secs(30));

    reg.store
        .publish_within_async("timely", "alice", "", deadline)
        .await
        .unwrap();

    let page = reg
        .store
        .list_all_within_async(PageRequest::first(), deadline)
        .await
        .unwrap();
    assert_eq!(names(&page), vec!["timely"]);

    let pkg = reg
        .store
        .get_within_async("timely", deadline)
        .await
        .unwrap();
    assert!(pkg.is_some());
}
