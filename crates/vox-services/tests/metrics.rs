mod common;

use common::{body, call_ended, principal, Harness};
use rust_decimal_macros::dec;
use serde_json::json;
use vox_core::models::{BillingUpdate, Role};
use vox_core::AppError;
use vox_services::{CallsQuery, OverviewQuery};

async fn seed(h: &Harness, count: u32) {
    h.register_agent(h.acme.id, "agent_acme").await;
    h.register_agent(h.globex.id, "agent_globex").await;

    for i in 0..count {
        let payload = call_ended(&format!("acme_{:02}", i), "agent_acme", i);
        h.pipeline.ingest(None, &body(&payload)).await.unwrap();
    }
    h.pipeline
        .ingest(None, &body(&call_ended("globex_00", "agent_globex", 0)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cursor_pages_cover_everything_once() {
    let h = Harness::new(None);
    seed(&h, 7).await;
    let user = principal(Role::User, Some(h.acme.id));

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let query = CallsQuery {
            limit: Some(3),
            cursor: cursor.clone(),
            ..CallsQuery::default()
        };
        let page = h.metrics.get_calls(&user, &query).await.unwrap();
        assert!(page.calls.len() <= 3);
        seen.extend(page.calls.iter().map(|c| c.external_call_id.clone()));

        if !page.pagination.has_more {
            assert_eq!(page.pagination.next_cursor, None);
            break;
        }
        cursor = page.pagination.next_cursor.clone();
    }

    let expected: Vec<String> = (0..7).rev().map(|i| format!("acme_{:02}", i)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_same_cursor_same_page() {
    let h = Harness::new(None);
    seed(&h, 5).await;
    let user = principal(Role::User, Some(h.acme.id));

    let first = h
        .metrics
        .get_calls(&user, &CallsQuery { limit: Some(2), ..CallsQuery::default() })
        .await
        .unwrap();
    let query = CallsQuery {
        limit: Some(2),
        cursor: first.pagination.next_cursor.clone(),
        ..CallsQuery::default()
    };

    let a = h.metrics.get_calls(&user, &query).await.unwrap();
    let b = h.metrics.get_calls(&user, &query).await.unwrap();
    assert_eq!(a.calls, b.calls);
    assert_eq!(a.pagination.next_cursor, b.pagination.next_cursor);
    assert!(a.pagination.has_more);
}

#[tokio::test]
async fn test_exact_fit_has_no_more() {
    let h = Harness::new(None);
    seed(&h, 4).await;
    let user = principal(Role::User, Some(h.acme.id));

    let page = h
        .metrics
        .get_calls(&user, &CallsQuery { limit: Some(4), ..CallsQuery::default() })
        .await
        .unwrap();
    assert_eq!(page.calls.len(), 4);
    assert!(!page.pagination.has_more);
}

#[tokio::test]
async fn test_page_size_is_clamped() {
    let h = Harness::new(None);
    seed(&h, 3).await;
    let user = principal(Role::User, Some(h.acme.id));

    let page = h
        .metrics
        .get_calls(&user, &CallsQuery { limit: Some(0), ..CallsQuery::default() })
        .await
        .unwrap();
    assert_eq!(page.pagination.limit, 1);
    assert_eq!(page.calls.len(), 1);

    let page = h
        .metrics
        .get_calls(&user, &CallsQuery { limit: Some(1_000_000), ..CallsQuery::default() })
        .await
        .unwrap();
    assert_eq!(page.pagination.limit, 1000);
}

#[tokio::test]
async fn test_invalid_cursor() {
    let h = Harness::new(None);
    let user = principal(Role::User, Some(h.acme.id));
    let query = CallsQuery {
        cursor: Some("zz-not-a-cursor".to_string()),
        ..CallsQuery::default()
    };

    assert!(matches!(
        h.metrics.get_calls(&user, &query).await,
        Err(AppError::InvalidCursor(_))
    ));
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let h = Harness::new(None);
    seed(&h, 2).await;
    let acme_user = principal(Role::OrgAdmin, Some(h.acme.id));

    let page = h
        .metrics
        .get_calls(&acme_user, &CallsQuery::default())
        .await
        .unwrap();
    assert_eq!(page.organization.id, h.acme.id);
    assert!(page.calls.iter().all(|c| c.organization_id == h.acme.id));
    assert_eq!(page.calls.len(), 2);

    let cross = CallsQuery {
        organization_id: Some(h.globex.id),
        ..CallsQuery::default()
    };
    for _ in 0..2 {
        assert!(matches!(
            h.metrics.get_calls(&acme_user, &cross).await,
            Err(AppError::AuthorizationDenied(_))
        ));
    }

    let orphan = principal(Role::User, None);
    assert!(matches!(
        h.metrics.get_calls(&orphan, &CallsQuery::default()).await,
        Err(AppError::AuthorizationDenied(_))
    ));
}

#[tokio::test]
async fn test_super_admin_reads_any_tenant() {
    let h = Harness::new(None);
    seed(&h, 2).await;
    let admin = principal(Role::SuperAdmin, None);

    let query = CallsQuery {
        organization_id: Some(h.globex.id),
        ..CallsQuery::default()
    };
    let page = h.metrics.get_calls(&admin, &query).await.unwrap();
    assert_eq!(page.organization.slug, "globex");
    assert_eq!(page.calls.len(), 1);
    assert_eq!(page.calls[0].external_call_id, "globex_00");
}

#[tokio::test]
async fn test_billable_filter_agrees_with_ingestion() {
    let h = Harness::new(None);
    h.register_agent(h.acme.id, "agent_acme").await;
    h.pipeline
        .ingest(None, &body(&call_ended("billable", "agent_acme", 0)))
        .await
        .unwrap();

    let test_call = json!({
        "event": "call_ended",
        "call": {
            "call_id": "web_test",
            "agent_id": "agent_acme",
            "from_number": null,
            "started_at": "2024-01-01T00:10:00Z",
            "ended_at": "2024-01-01T00:11:00Z"
        }
    });
    h.pipeline.ingest(None, &body(&test_call)).await.unwrap();

    let user = principal(Role::User, Some(h.acme.id));
    for (flag, expected) in [(Some(true), "billable"), (Some(false), "web_test")] {
        let page = h
            .metrics
            .get_calls(&user, &CallsQuery { is_billable: flag, ..CallsQuery::default() })
            .await
            .unwrap();
        assert_eq!(page.calls.len(), 1);
        assert_eq!(page.calls[0].external_call_id, expected);
        assert_eq!(page.calls[0].is_billable(), flag == Some(true));
    }

    let overview = h
        .metrics
        .get_overview(
            &user,
            &OverviewQuery {
                from: Some("2024-01-01T00:00:00Z".parse().unwrap()),
                to: Some("2024-01-02T00:00:00Z".parse().unwrap()),
                ..OverviewQuery::default()
            },
        )
        .await
        .unwrap()
        .overview;
    assert_eq!(overview.total_calls, 2);
    assert_eq!(overview.billable_calls, 1);
    assert_eq!(overview.test_calls, 1);
    // 150 s billable call -> 3 minutes at 0.50
    assert_eq!(overview.expected_revenue, dec!(1.50));
    assert_eq!(overview.expected_cost, dec!(0.30));
}

#[tokio::test]
async fn test_overview_is_served_from_cache() {
    let h = Harness::new(None);
    seed(&h, 3).await;
    let user = principal(Role::User, Some(h.acme.id));
    let query = OverviewQuery {
        from: Some("2024-01-01T00:00:00Z".parse().unwrap()),
        to: Some("2024-01-02T00:00:00Z".parse().unwrap()),
        ..OverviewQuery::default()
    };

    let first = h.metrics.get_overview(&user, &query).await.unwrap();
    let misses = h.cache.stats().metrics.misses;
    let hits = h.cache.stats().metrics.hits;

    h.store.set_unavailable(true);
    let second = h.metrics.get_overview(&user, &query).await.unwrap();

    assert_eq!(first.overview, second.overview);
    assert_eq!(h.cache.stats().metrics.misses, misses);
    assert_eq!(h.cache.stats().metrics.hits, hits + 1);
    assert_eq!(second.overview.total_calls, 3);
    assert_eq!(second.overview.answered_calls, 3);
    assert_eq!(second.overview.answer_rate, 100.0);
}

#[tokio::test]
async fn test_default_overview_window() {
    let h = Harness::new(None);
    let user = principal(Role::User, Some(h.acme.id));

    let result = h
        .metrics
        .get_overview(&user, &OverviewQuery::default())
        .await
        .unwrap();
    let window = result.overview.window;
    assert_eq!((window.to - window.from).num_days(), 30);
}

#[tokio::test]
async fn test_unknown_organization() {
    let h = Harness::new(None);
    let admin = principal(Role::SuperAdmin, None);
    let query = CallsQuery {
        organization_id: Some(uuid::Uuid::new_v4()),
        ..CallsQuery::default()
    };

    assert!(matches!(
        h.metrics.get_calls(&admin, &query).await,
        Err(AppError::OrganizationNotFound(_))
    ));
}

#[tokio::test]
async fn test_organization_list_requires_super_admin() {
    let h = Harness::new(None);
    let user = principal(Role::OrgAdmin, Some(h.acme.id));
    let admin = principal(Role::SuperAdmin, None);

    assert!(matches!(
        h.organizations.list_organizations(&user).await,
        Err(AppError::AuthorizationDenied(_))
    ));

    let orgs = h.organizations.list_organizations(&admin).await.unwrap();
    assert_eq!(orgs.len(), 2);

    h.store.set_unavailable(true);
    let cached = h.organizations.list_organizations(&admin).await.unwrap();
    assert_eq!(cached.len(), 2);
}

#[tokio::test]
async fn test_billing_update_invalidates_caches() {
    let h = Harness::new(None);
    seed(&h, 2).await;
    let admin = principal(Role::SuperAdmin, None);
    let query = OverviewQuery {
        organization_id: Some(h.acme.id),
        from: Some("2024-01-01T00:00:00Z".parse().unwrap()),
        to: Some("2024-01-02T00:00:00Z".parse().unwrap()),
        ..OverviewQuery::default()
    };

    let before = h.metrics.get_overview(&admin, &query).await.unwrap();
    assert_eq!(before.overview.expected_revenue, dec!(3.00));

    let update = BillingUpdate {
        billing_rate_per_minute: dec!(1.00),
        cogs_per_minute: dec!(0.20),
    };
    let user = principal(Role::User, Some(h.acme.id));
    assert!(matches!(
        h.organizations.update_billing(&user, h.acme.id, &update).await,
        Err(AppError::AuthorizationDenied(_))
    ));
    h.organizations
        .update_billing(&admin, h.acme.id, &update)
        .await
        .unwrap();

    assert!(h.cache.get_organization(h.acme.id).is_none());
    assert!(h.cache.get_all_organizations().is_none());

    let after = h.metrics.get_overview(&admin, &query).await.unwrap();
    assert_eq!(after.overview.expected_revenue, dec!(6.00));
    assert_eq!(after.overview.expected_margin, dec!(4.80));
}

#[tokio::test]
async fn test_negative_rates_are_rejected() {
    let h = Harness::new(None);
    let admin = principal(Role::SuperAdmin, None);
    let update = BillingUpdate {
        billing_rate_per_minute: dec!(-1),
        cogs_per_minute: dec!(0),
    };

    assert!(matches!(
        h.organizations.update_billing(&admin, h.acme.id, &update).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_profile_is_cached() {
    let h = Harness::new(None);
    let user = principal(Role::User, Some(h.acme.id));

    let first = h.metrics.profile(&user);
    let second = h.metrics.profile(&user);
    assert_eq!(*first, user);
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_organization_miss_uses_cached_list() {
    let h = Harness::new(None);
    let admin = principal(Role::SuperAdmin, None);
    h.organizations.list_organizations(&admin).await.unwrap();

    h.cache
        .organizations()
        .delete(&vox_cache::keys::org_key(h.acme.id));
    h.store.set_unavailable(true);

    let org = h.organizations.get_organization(h.acme.id).await.unwrap();
    assert_eq!(org.slug, "acme");
    assert!(h.cache.get_organization(h.acme.id).is_some());
}
