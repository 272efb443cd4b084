//! Background scheduled tasks.
//!
//! Keeps every tenant's lesson occurrences expanded ahead of time and prunes
//! finished ones. Call `spawn_all` once during startup to launch them.

use crate::config::SchedulerConfig;
use crate::database::TenantRegistry;
use crate::services::ScheduleService;

const CLEANUP_INTERVAL_SECS: u64 = 24 * 3600;

/// Spawn all background tasks.
///
/// Notes
/// - Both jobs are idempotent: rules that already have future occurrences are skipped.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(registry: TenantRegistry, schedule_service: ScheduleService, config: SchedulerConfig) {
    if !config.enabled {
        log::info!("Scheduler disabled, background schedule tasks not started");
        return;
    }

    // 定期为所有租户补齐未来课次
    {
        let registry = registry.clone();
        let svc = schedule_service.clone();
        let days_ahead = config.days_ahead;
        let interval = std::time::Duration::from_secs(config.interval_secs.max(60));
        tokio::spawn(async move {
            loop {
                for tenant in registry.all() {
                    match svc.generate_for_all_active_rules(tenant, Some(days_ahead)).await {
                        Ok(s) if s.occurrences_created > 0 => log::info!(
                            "Tenant {}: {} occurrences generated for {} rules",
                            tenant.slug(),
                            s.occurrences_created,
                            s.rules_expanded
                        ),
                        Ok(_) => {}
                        Err(e) => log::error!(
                            "Failed to generate occurrences for tenant {}: {e:?}",
                            tenant.slug()
                        ),
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    // 每天清理一次已结束的历史课次
    {
        let svc = schedule_service;
        let older_than_days = config.cleanup_older_than_days;
        tokio::spawn(async move {
            loop {
                for tenant in registry.all() {
                    match svc.cleanup_past(tenant, older_than_days).await {
                        Ok(n) if n > 0 => {
                            log::info!("Tenant {}: removed {n} past occurrences", tenant.slug())
                        }
                        Ok(_) => {}
                        Err(e) => log::error!(
                            "Failed to clean up occurrences for tenant {}: {e:?}",
                            tenant.slug()
                        ),
                    }
                }
                tokio::time::sleep(std::time::Duration::from_secs(CLEANUP_INTERVAL_SECS)).await;
            }
        });
    }
}
