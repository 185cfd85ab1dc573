//! Liveness report for the API server and its database.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use db::{ConnectionManager, Privilege};
use serde::Serialize;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Ok,
    Degraded,
    Down,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Degraded => "DEGRADED",
            Self::Down => "DOWN",
        })
    }
}

/// One line of the report. `latency` is `"<n>ms"`, or the state itself when
/// no measurement was possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub service: &'static str,
    pub status: HealthState,
    pub latency: String,
}

impl ServiceHealth {
    fn measured(service: &'static str, latency: Duration) -> Self {
        Self {
            service,
            status: HealthState::Ok,
            latency: format!("{}ms", latency.as_millis()),
        }
    }

    fn unmeasured(service: &'static str, status: HealthState) -> Self {
        Self {
            service,
            status,
            latency: status.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub services: Vec<ServiceHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.services.iter().all(|s| s.status == HealthState::Ok)
    }

    fn build(api: Duration, database: Result<Duration, HealthState>) -> Self {
        let services = match database {
            Ok(db_latency) => vec![
                ServiceHealth::measured("Overall", api + db_latency),
                ServiceHealth::measured("API Server", api),
                ServiceHealth::measured("Database", db_latency),
            ],
            Err(state) => vec![
                ServiceHealth::unmeasured("Overall", HealthState::Degraded),
                ServiceHealth::measured("API Server", api),
                ServiceHealth::unmeasured("Database", state),
            ],
        };
        Self { services }
    }
}

pub struct HealthService {
    manager: Arc<ConnectionManager>,
}

impl HealthService {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// Check the read tier. A database that cannot be reached is `DOWN`;
    /// one that connects but fails the ping is `DEGRADED`.
    pub async fn check(&self) -> HealthReport {
        debug!("checking status of core services");
        let start = Instant::now();

        let database = match self.manager.acquire(Privilege::Read).await {
            Err(e) => {
                error!("failed to open database connection: {e}");
                Err(HealthState::Down)
            }
            Ok(_) => match self.manager.ping(Privilege::Read).await {
                Ok(latency) => {
                    info!("database reachable in {}ms", latency.as_millis());
                    Ok(latency)
                }
                Err(e) => {
                    error!("failed to ping database: {e}");
                    Err(HealthState::Degraded)
                }
            },
        };

        HealthReport::build(start.elapsed(), database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::DatabaseConfig;

    #[test]
    fn healthy_report_sums_latencies() {
        let report = HealthReport::build(Duration::from_millis(3), Ok(Duration::from_millis(7)));
        assert!(report.is_healthy());
        assert_eq!(report.services[0].latency, "10ms");
        assert_eq!(report.services[1].latency, "3ms");
        assert_eq!(report.services[2].latency, "7ms");
    }

    #[test]
    fn unreachable_database_degrades_overall() {
        let report = HealthReport::build(Duration::from_millis(1), Err(HealthState::Down));
        assert!(!report.is_healthy());
        assert_eq!(
            report.services[0],
            ServiceHealth {
                service: "Overall",
                status: HealthState::Degraded,
                latency: "DEGRADED".into(),
            }
        );
        assert_eq!(report.services[1].status, HealthState::Ok);
        assert_eq!(report.services[2].latency, "DOWN");
    }

    #[test]
    fn report_serializes_like_the_wire_format() {
        let report = HealthReport::build(Duration::from_millis(2), Err(HealthState::Degraded));
        let json = serde_json::to_value(&report.services).unwrap();
        assert_eq!(json[2]["service"], "Database");
        assert_eq!(json[2]["status"], "DEGRADED");
        assert_eq!(json[1]["latency"], "2ms");
    }

    #[tokio::test]
    async fn closed_manager_reports_database_down() {
        let tier = "{ host: 127.0.0.1, port: 1, user: nobody, password: x, database: none }";
        let config = DatabaseConfig::from_yaml(&format!(
            "admin: {tier}\nread: {tier}\nwrite: {tier}\ndelete: {tier}\n"
        ))
        .unwrap();
        let manager = Arc::new(ConnectionManager::new(config));
        manager.close().await;

        let report = HealthService::new(manager).check().await;
        assert_eq!(report.services.len(), 3);
        assert_eq!(report.services[2].status, HealthState::Down);
    }
}
