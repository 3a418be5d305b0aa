//! Integration tests for the user service and its publisher pump, running
//! against the in-memory store and bus.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use userd_bus::{FailureMode, MemoryBus};
use userd_service::{
    BcryptHasher, NewUser, PublisherTiming, RandomIds, UserError, UserQuery, UserRef,
    UserService, UserUpdate,
};
use userd_store::MemoryStore;
use uuid::Uuid;

struct Harness {
    service: Arc<UserService>,
    store: MemoryStore,
    bus: MemoryBus,
}

fn harness() -> Harness {
    harness_with_retry(Duration::from_secs(10))
}

fn harness_with_retry(retry_interval: Duration) -> Harness {
    let store = MemoryStore::new();
    let bus = MemoryBus::new();
    let timing = PublisherTiming {
        min_poll: Duration::from_millis(5),
        max_poll: Duration::from_millis(10),
        retry_interval,
    };
    let service = Arc::new(UserService::new(
        Arc::new(store.clone()),
        Arc::new(bus.clone()),
        Arc::new(BcryptHasher::weak()),
        Arc::new(RandomIds),
        timing,
    ));
    Harness {
        service,
        store,
        bus,
    }
}

fn new_user(nickname: &str, email: &str) -> NewUser {
    NewUser {
        first_name: "Max".into(),
        last_name: "Mustermann".into(),
        nickname: nickname.into(),
        password: "password123".into(),
        confirm_password: "password123".into(),
        email: email.into(),
        country: "DE".into(),
    }
}

fn start_pump(service: &Arc<UserService>) -> CancellationToken {
    let cancel = CancellationToken::new();
    let pump_cancel = cancel.clone();
    let pump_service = Arc::clone(service);
    tokio::spawn(async move {
        pump_service.publish_changes(pump_cancel).await;
    });
    cancel
}

async fn wait_for<F: Fn() -> bool>(deadline: Duration, condition: F) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn create_and_publish_happy_path() {
    let h = harness();
    let user = h.service.create(&new_user("maxmust", "maxmust@example.com")).await.unwrap();

    assert_eq!(user.version, 1);
    assert!(Uuid::parse_str(&user.id).is_ok());
    assert!(!user.created_at.is_empty());
    assert!(!user.updated_at.is_empty());

    let id = Uuid::parse_str(&user.id).unwrap();
    let monitor = h.service.monitor();
    let cancel = start_pump(&h.service);
    let drained = wait_for(Duration::from_secs(2), || {
        h.store.outbox_len(id) == Some(0) && monitor.count() >= 1
    })
    .await;
    cancel.cancel();
    assert!(drained, "pump did not publish the Created event in time");

    let body: serde_json::Value = serde_json::from_slice(&h.bus.published()[0]).unwrap();
    assert_eq!(body["action"], "Created");
    assert_eq!(body["id"], user.id);
    assert_eq!(body["version"], 1);
    assert_eq!(body["data"]["nickname"], "maxmust");

    // the outbox drained and every publish succeeded
    assert_eq!(h.bus.published_count(), 1);
    assert_eq!(monitor.read_and_reset(), 1.0);
}

#[tokio::test]
async fn duplicate_nickname_is_rejected() {
    let h = harness();
    h.service
        .create(&new_user("superoriginal", "first@example.com"))
        .await
        .unwrap();

    let err = h
        .service
        .create(&new_user("superoriginal", "second@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::AlreadyExists));
}

#[tokio::test]
async fn invalid_user_never_reaches_the_store() {
    let h = harness();
    let mut invalid = new_user("nick", "nick@example.com");
    invalid.country = "Germany".into();
    let err = h.service.create(&invalid).await.unwrap_err();
    assert!(matches!(err, UserError::Invalid));
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn optimistic_update_race_has_one_winner() {
    let h = harness();
    let user = h.service.create(&new_user("racer", "racer@example.com")).await.unwrap();

    let update_for = |first_name: &str| UserUpdate {
        id: user.id.clone(),
        first_name: first_name.into(),
        last_name: "Mustermann".into(),
        password: String::new(),
        confirm_password: String::new(),
        country: "DE".into(),
        version: 1,
    };

    let left_update = update_for("Left");
    let right_update = update_for("Right");
    let (left, right) = tokio::join!(
        h.service.update(&left_update),
        h.service.update(&right_update),
    );
    let results = [left, right];
    assert_eq!(results.iter().filter(|res| res.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|res| matches!(res, Err(UserError::InvalidVersion)))
            .count(),
        1
    );

    let winner = results.iter().flatten().next().unwrap();
    assert_eq!(winner.version, 2);

    // the loser enqueued nothing: Created + one Updated only
    let id = Uuid::parse_str(&user.id).unwrap();
    assert_eq!(h.store.outbox_len(id), Some(2));
}

#[tokio::test]
async fn update_preserves_hash_when_password_is_empty() {
    use userd_store::UserStore;

    let h = harness();
    let created = h.service.create(&new_user("keep", "keep@example.com")).await.unwrap();
    let id = Uuid::parse_str(&created.id).unwrap();
    let hash_before = h.store.read_one(id).await.unwrap().password_hash;

    h.service
        .update(&UserUpdate {
            id: created.id.clone(),
            first_name: "Moritz".into(),
            last_name: "Mustermann".into(),
            password: String::new(),
            confirm_password: String::new(),
            country: "NL".into(),
            version: 1,
        })
        .await
        .unwrap();

    let stored = h.store.read_one(id).await.unwrap();
    assert_eq!(stored.password_hash, hash_before);
    assert_eq!(stored.first_name, "Moritz");
    assert_eq!(stored.country, "NL");
    assert_eq!(stored.version, 2);
    // unique keys are immutable through update
    assert_eq!(stored.nickname, "keep");
    assert_eq!(stored.email, "keep@example.com");
}

#[tokio::test]
async fn update_rehashes_when_password_is_set() {
    use userd_service::PasswordHasher;
    use userd_store::UserStore;

    let h = harness();
    let created = h.service.create(&new_user("rehash", "rehash@example.com")).await.unwrap();
    let id = Uuid::parse_str(&created.id).unwrap();

    let hash_before = h.store.read_one(id).await.unwrap().password_hash;

    h.service
        .update(&UserUpdate {
            id: created.id.clone(),
            first_name: "Max".into(),
            last_name: "Mustermann".into(),
            password: "differentpass".into(),
            confirm_password: "differentpass".into(),
            country: "DE".into(),
            version: 1,
        })
        .await
        .unwrap();

    let stored = h.store.read_one(id).await.unwrap();
    assert_ne!(stored.password_hash, hash_before);
    assert!(BcryptHasher::weak().compare(&stored.password_hash, "differentpass"));
}

#[tokio::test]
async fn update_of_unknown_user_is_not_found() {
    let h = harness();
    let err = h
        .service
        .update(&UserUpdate {
            id: Uuid::new_v4().to_string(),
            first_name: "No".into(),
            last_name: "One".into(),
            password: String::new(),
            confirm_password: String::new(),
            country: "DE".into(),
            version: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::NotFound));
}

#[tokio::test]
async fn delete_twice_reports_not_found() {
    let h = harness();
    let created = h.service.create(&new_user("bye", "bye@example.com")).await.unwrap();
    let user_ref = UserRef {
        id: created.id.clone(),
    };

    h.service.delete(&user_ref).await.unwrap();
    let err = h.service.delete(&user_ref).await.unwrap_err();
    assert!(matches!(err, UserError::NotFound));
}

#[tokio::test]
async fn delete_emits_created_then_deleted() {
    let h = harness();
    let created = h.service.create(&new_user("lifecycle", "lifecycle@example.com")).await.unwrap();
    h.service
        .delete(&UserRef {
            id: created.id.clone(),
        })
        .await
        .unwrap();

    let id = Uuid::parse_str(&created.id).unwrap();
    let cancel = start_pump(&h.service);
    let drained = wait_for(Duration::from_secs(2), || {
        h.store.outbox_len(id) == Some(0)
    })
    .await;
    cancel.cancel();
    assert!(drained, "pump did not drain both events in time");

    let bodies: Vec<serde_json::Value> = h
        .bus
        .published()
        .iter()
        .map(|body| serde_json::from_slice(body).unwrap())
        .collect();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["action"], "Created");
    assert_eq!(bodies[1]["action"], "Deleted");
    assert!(bodies[1]["data"].is_null());
}

#[tokio::test]
async fn failing_bus_triggers_lease_retries_and_keeps_the_entry() {
    let h = harness_with_retry(Duration::from_millis(100));
    h.bus.set_failure(FailureMode::Confirm);

    let created = h.service.create(&new_user("stuck", "stuck@example.com")).await.unwrap();
    let monitor = h.service.monitor();

    let cancel = start_pump(&h.service);
    let retried = wait_for(Duration::from_secs(1), || monitor.count() >= 2).await;
    cancel.cancel();
    assert!(retried, "expected at least two recorded failures within 1s");

    assert!(monitor.read_and_reset() < 1.0);
    // the entry was never dropped
    let id = Uuid::parse_str(&created.id).unwrap();
    assert_eq!(h.store.outbox_len(id), Some(1));
    assert_eq!(h.bus.published_count(), 0);
}

#[tokio::test]
async fn find_filters_by_country_and_created_after() {
    let h = harness();
    use userd_store::{StoredUser, UserStore};

    // seed through the store so creation times can sit in the past
    let now = chrono::Utc::now();
    for i in 0..20 {
        let (country, created_at) = if i < 10 {
            ("DE", now - chrono::Duration::hours(24))
        } else {
            ("NL", now)
        };
        let user = StoredUser {
            id: Uuid::new_v4(),
            first_name: "Seed".into(),
            last_name: "User".into(),
            nickname: format!("seed{i}"),
            password_hash: "$2b$04$seed".into(),
            email: format!("seed{i}@example.com"),
            country: country.into(),
            created_at,
            updated_at: created_at,
            version: 1,
        };
        h.store.create(&user).await.unwrap();
    }

    let page = h
        .service
        .find(&UserQuery {
            created_after: userd_service::format_time(now - chrono::Duration::hours(1)),
            country: "NL".into(),
            length: 10,
            page: 1,
        })
        .await
        .unwrap();

    assert_eq!(page.total, 10);
    assert_eq!(page.items.len(), 10);
    assert!(page.items.iter().all(|user| user.country == "NL"));
}

#[tokio::test]
async fn find_defaults_apply_on_empty_query() {
    let h = harness();
    let page = h.service.find(&UserQuery::default()).await.unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn find_defaults_to_a_page_length_of_25() {
    use userd_store::{StoredUser, UserStore};

    let h = harness();
    let now = chrono::Utc::now();
    for i in 0..30 {
        let user = StoredUser {
            id: Uuid::new_v4(),
            first_name: "Page".into(),
            last_name: "Filler".into(),
            nickname: format!("filler{i}"),
            password_hash: "$2b$04$seed".into(),
            email: format!("filler{i}@example.com"),
            country: "DE".into(),
            created_at: now,
            updated_at: now,
            version: 1,
        };
        h.store.create(&user).await.unwrap();
    }

    let page = h.service.find(&UserQuery::default()).await.unwrap();
    assert_eq!(page.total, 30);
    assert_eq!(page.items.len(), 25);
}

#[tokio::test]
async fn find_results_are_sanitized() {
    let h = harness();
    h.service.create(&new_user("visible", "visible@example.com")).await.unwrap();

    let page = h.service.find(&UserQuery::default()).await.unwrap();
    assert_eq!(page.items.len(), 1);
    let json = serde_json::to_string(&page.items[0]).unwrap();
    assert!(!json.contains("password"));
    assert!(!json.contains("$2b$"));
}
