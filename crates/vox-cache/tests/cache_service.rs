use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;
use vox_cache::{keys, CacheService};
use vox_core::config::{CacheConfig, CacheTierConfig};
use vox_core::models::Organization;

fn org(slug: &str) -> Organization {
    Organization {
        id: Uuid::new_v4(),
        name: slug.to_uppercase(),
        slug: slug.to_string(),
        billing_rate_per_minute: Decimal::new(25, 2),
        cogs_per_minute: Decimal::new(7, 2),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn fast_config() -> CacheConfig {
    let tier = CacheTierConfig {
        ttl_secs: 60,
        max_keys: 100,
        check_period_secs: 1,
    };
    CacheConfig {
        organizations: tier,
        users: tier,
        metrics: tier,
    }
}

#[test]
fn organization_is_cached_by_id_and_slug() {
    let cache = CacheService::new(&CacheConfig::default());
    let acme = org("acme");
    let id = acme.id;
    cache.set_organization(acme);

    assert_eq!(cache.get_organization(id).unwrap().slug, "acme");
    assert_eq!(cache.get_organization_by_slug("acme").unwrap().id, id);
}

#[test]
fn invalidate_organization_drops_id_slug_and_list() {
    let cache = CacheService::new(&CacheConfig::default());
    let acme = org("acme");
    let globex = org("globex");
    let id = acme.id;
    cache.set_all_organizations(vec![acme, globex.clone()]);

    let before = cache.stats().organizations;
    assert!(cache.get_organization(id).is_some());

    let counted = cache.stats().organizations;
    cache.invalidate_organization(id);
    let invalidated = cache.stats().organizations;
    assert_eq!(
        (invalidated.hits, invalidated.misses),
        (counted.hits, counted.misses)
    );

    assert!(cache.get_organization(id).is_none());
    assert!(cache.get_organization_by_slug("acme").is_none());
    assert!(cache.get_all_organizations().is_none());
    assert!(cache.get_organization(globex.id).is_some());

    let after = cache.stats().organizations;
    assert_eq!(after.hits, before.hits + 2);
    assert_eq!(after.misses, before.misses + 3);
}

#[test]
fn org_metrics_invalidation_is_scoped() {
    let cache = CacheService::new(&CacheConfig::default());
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let range = keys::range_segment(None, None, None);

    cache.set_metrics(a, "overview", &range, 10_i64);
    cache.set_metrics(b, "overview", &range, 20_i64);

    assert_eq!(cache.invalidate_org_metrics(a), 1);
    assert!(cache.get_metrics::<i64>(a, "overview", &range).is_none());
    assert_eq!(*cache.get_metrics::<i64>(b, "overview", &range).unwrap(), 20);
}

#[test]
fn permissions_are_cached_per_user_and_org() {
    let cache = CacheService::new(&CacheConfig::default());
    let user = Uuid::new_v4();
    let org = Uuid::new_v4();

    assert_eq!(cache.get_permission(user, org), None);
    cache.set_permission(user, org, false);
    assert_eq!(cache.get_permission(user, org), Some(false));

    cache.invalidate_user(user);
    assert_eq!(cache.get_permission(user, org), None);
}

#[test]
fn flush_all_empties_every_cache() {
    let cache = CacheService::new(&CacheConfig::default());
    cache.set_organization(org("acme"));
    cache.set_permission(Uuid::new_v4(), Uuid::new_v4(), true);
    cache.set_metrics(Uuid::new_v4(), "overview", "*-*:all", 1_u8);

    cache.flush_all();

    let report = cache.stats();
    assert_eq!(report.organizations.keys, 0);
    assert_eq!(report.users.keys, 0);
    assert_eq!(report.metrics.keys, 0);
}

#[tokio::test]
async fn sweeper_reclaims_expired_entries() {
    let mut config = fast_config();
    config.metrics.ttl_secs = 0;
    let cache = CacheService::new(&config);
    cache.start();

    cache.set_metrics(Uuid::new_v4(), "overview", "*-*:all", 1_u8);
    assert_eq!(cache.metrics().len(), 1);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.metrics().len(), 0);

    cache.close();
}

#[tokio::test]
async fn close_is_idempotent() {
    let cache = CacheService::new(&fast_config());
    cache.start();
    cache.start();
    cache.close();
    cache.close();
    assert!(cache.organizations().is_empty());
}
