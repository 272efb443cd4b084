//! Tenant resolution.
//!
//! Every tenant owns a separate database and a local timezone. Engines receive a
//! [`TenantContext`] and never reach for a global connection, so the same code
//! serves every center.

use crate::config::Config;
use crate::database::{DbPool, create_pool, run_migrations};
use crate::error::{AppError, AppResult};
use crate::utils::time::parse_timezone;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Source of "now" for a tenant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock used by tests and replays.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Clone)]
pub struct TenantContext {
    slug: String,
    db: DbPool,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl TenantContext {
    pub fn new(slug: impl Into<String>, db: DbPool, timezone: Tz) -> Self {
        Self {
            slug: slug.into(),
            db,
            timezone,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current calendar date in the tenant's timezone.
    pub fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.timezone).date_naive()
    }
}

impl std::fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantContext")
            .field("slug", &self.slug)
            .field("timezone", &self.timezone)
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct TenantRegistry {
    tenants: HashMap<String, TenantContext>,
}

impl TenantRegistry {
    /// 连接所有租户数据库并执行迁移；相同 URL 的租户共用连接池。
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let fallback_tz = parse_timezone(&config.default_timezone, chrono_tz::Asia::Tashkent);
        let mut pools: HashMap<String, DbPool> = HashMap::new();
        let mut contexts = Vec::new();

        for tenant in config.effective_tenants() {
            let url = tenant
                .database_url
                .clone()
                .unwrap_or_else(|| config.database.url.clone());

            let pool = match pools.get(&url) {
                Some(pool) => pool.clone(),
                None => {
                    let pool = create_pool(&url, config.database.max_connections).await?;
                    run_migrations(&pool).await?;
                    pools.insert(url.clone(), pool.clone());
                    pool
                }
            };

            let timezone = tenant
                .timezone
                .as_deref()
                .map(|name| parse_timezone(name, fallback_tz))
                .unwrap_or(fallback_tz);

            log::info!("Tenant {} ready (timezone {})", tenant.slug, timezone);
            contexts.push(TenantContext::new(tenant.slug, pool, timezone));
        }

        Ok(Self::from_contexts(contexts))
    }

    pub fn from_contexts(contexts: Vec<TenantContext>) -> Self {
        let tenants = contexts
            .into_iter()
            .map(|ctx| (ctx.slug.clone(), ctx))
            .collect();
        Self { tenants }
    }

    pub fn get(&self, slug: &str) -> AppResult<TenantContext> {
        self.tenants
            .get(slug)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Tenant {slug} not found")))
    }

    /// Resolves an explicit slug, or the only tenant when none is given.
    pub fn resolve(&self, slug: Option<&str>) -> AppResult<TenantContext> {
        match slug {
            Some(slug) => self.get(slug),
            None if self.tenants.len() == 1 => self
                .tenants
                .values()
                .next()
                .cloned()
                .ok_or_else(|| AppError::NotFound("No tenant configured".into())),
            None => Err(AppError::ValidationError(
                "X-Tenant-ID header is required".into(),
            )),
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &TenantContext> {
        self.tenants.values()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
