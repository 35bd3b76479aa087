//! Entitlement checks against limit and feature snapshots.

mod common;

use common::engine;
use subscription_engine::{
    CreateSubscriptionInput, EventType, LimitCheckResult, LimitName, SubscriptionStatus,
    TenantRef, UsageUpdate,
};

#[tokio::test]
async fn test_reached_limit_reports_exceeded_with_warning() {
    let engine = engine();
    let sub = engine
        .create_subscription(
            CreateSubscriptionInput::new(TenantRef::organization("org_1"), "starter"),
            "admin",
        )
        .await
        .unwrap();
    engine
        .usage()
        .update_usage(&sub.id, UsageUpdate::new().users(10).hotels(1))
        .await
        .unwrap();

    let report = engine.check_limits(&sub.id).await.unwrap();

    assert!(report.exceeded);
    assert_eq!(report.exceeded_limits(), vec![LimitName::Users]);
    assert_eq!(report.warnings, vec!["users limit reached: 10 of 10 used".to_string()]);
    assert!(!report.get(LimitName::Hotels).unwrap().exceeded);

    let events = engine.events_for(&sub.id, 1).await.unwrap();
    assert_eq!(events[0].event_type, EventType::UsageLimitExceeded);
    assert_eq!(events[0].data["exceeded"], serde_json::json!(["users"]));
}

#[tokio::test]
async fn test_threshold_warning_without_exceeding() {
    let engine = engine();
    let sub = engine
        .create_subscription(
            CreateSubscriptionInput::new(TenantRef::organization("org_1"), "starter"),
            "admin",
        )
        .await
        .unwrap();
    engine
        .usage()
        .update_usage(&sub.id, UsageUpdate::new().users(8))
        .await
        .unwrap();

    let report = engine.check_limits(&sub.id).await.unwrap();

    assert!(!report.exceeded);
    assert_eq!(
        report.warnings,
        vec!["users usage at 80% of limit: 8 of 10 used".to_string()]
    );
    let events = engine.events_for(&sub.id, 10).await.unwrap();
    assert!(events.iter().all(|e| e.event_type != EventType::UsageLimitExceeded));
}

#[tokio::test]
async fn test_unlimited_never_exceeded() {
    let engine = engine();
    let sub = engine
        .create_subscription(
            CreateSubscriptionInput::new(TenantRef::organization("org_big"), "enterprise"),
            "admin",
        )
        .await
        .unwrap();
    engine
        .usage()
        .update_usage(&sub.id, UsageUpdate::new().users(1_000_000).storage(u64::MAX))
        .await
        .unwrap();

    let report = engine.check_limits(&sub.id).await.unwrap();
    assert!(!report.exceeded);
    assert!(report.warnings.is_empty());

    let checker = engine.entitlements();
    assert_eq!(
        checker.check_limit(&sub.id, LimitName::Users).await.unwrap(),
        LimitCheckResult::Unlimited
    );
    assert!(checker
        .can_consume(&sub.id, LimitName::Storage, u64::MAX)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_can_consume() {
    let engine = engine();
    let sub = engine
        .create_subscription(
            CreateSubscriptionInput::new(TenantRef::hotel("hotel_1"), "free"),
            "admin",
        )
        .await
        .unwrap();
    engine
        .usage()
        .update_usage(&sub.id, UsageUpdate::new().users(2))
        .await
        .unwrap();

    let checker = engine.entitlements();
    assert!(checker.can_consume(&sub.id, LimitName::Users, 1).await.unwrap());
    assert!(!checker.can_consume(&sub.id, LimitName::Users, 2).await.unwrap());
    assert_eq!(
        checker.check_limit(&sub.id, LimitName::Users).await.unwrap(),
        LimitCheckResult::WithinLimit { current: 2, max: 3 }
    );
}

#[tokio::test]
async fn test_features_follow_plan_snapshot() {
    let engine = engine();
    let sub = engine
        .create_subscription(
            CreateSubscriptionInput::new(TenantRef::hotel("hotel_1"), "starter"),
            "admin",
        )
        .await
        .unwrap();

    let checker = engine.entitlements();
    assert!(checker.has_feature(&sub.id, "api_access").await.unwrap());
    assert!(!checker.has_feature(&sub.id, "sso").await.unwrap());
    assert!(!checker.has_feature(&sub.id, "no_such_feature").await.unwrap());

    // Catalog edits do not reach existing subscriptions.
    let mut plan = engine.catalog().get_plan("starter").unwrap();
    plan.features.insert("sso".to_string(), true);
    engine.catalog().update_plan(plan).unwrap();
    assert!(!checker.has_feature(&sub.id, "sso").await.unwrap());
}

#[tokio::test]
async fn test_is_entitled_by_status() {
    let engine = engine();
    let sub = engine
        .create_subscription(
            CreateSubscriptionInput::new(TenantRef::hotel("hotel_1"), "free"),
            "admin",
        )
        .await
        .unwrap();

    let checker = engine.entitlements();
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert!(checker.is_entitled(&sub.id).await.unwrap());

    engine.cancel_subscription(&sub.id, None).await.unwrap();
    assert!(!checker.is_entitled(&sub.id).await.unwrap());

    assert!(checker.is_entitled("missing").await.unwrap_err().is_not_found());
}
