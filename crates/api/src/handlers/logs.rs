//! Delivery log queries over the caller's own logs.

use axum::extract::{Path, Query, State};
use axum::Json;
use herald_core::error::CoreError;
use herald_core::notification::{ChannelKind, DeliveryStatus};
use herald_core::types::DbId;
use herald_db::models::notification_log::{GroupCount, LogFilter, NotificationLog};
use herald_db::NotificationLogStore;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{parse_timestamp, DateRangeParams, PageParams};
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

/// Query parameters for `GET /logs`.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub channel: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Substring of the recipient email or phone.
    pub recipient: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl LogQuery {
    fn filter(&self, member_id: DbId) -> Result<LogFilter, AppError> {
        let status = non_empty(&self.status)
            .map(str::parse::<DeliveryStatus>)
            .transpose()
            .map_err(AppError::BadRequest)?;
        let channel = non_empty(&self.channel)
            .map(str::parse::<ChannelKind>)
            .transpose()
            .map_err(AppError::BadRequest)?;

        Ok(LogFilter {
            member_id,
            status,
            channel,
            start: parse_timestamp("start_date", self.start_date.as_deref())?,
            end: parse_timestamp("end_date", self.end_date.as_deref())?,
            recipient: non_empty(&self.recipient).map(str::to_string),
        })
    }

    fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Aggregate delivery statistics. Rates are percentages of `total`.
#[derive(Debug, Serialize)]
pub struct LogStats {
    pub total: i64,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub status_stats: Vec<GroupCount>,
    pub channel_stats: Vec<GroupCount>,
}

fn percent(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// GET /api/v1/logs
pub async fn list_logs(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LogQuery>,
) -> AppResult<Json<PageResponse<NotificationLog>>> {
    let filter = params.filter(auth.member_id)?;
    let paging = params.paging();

    let total = state.store.count_logs(&filter).await?;
    let logs = state
        .store
        .list_logs(&filter, paging.page_size(), paging.offset())
        .await?;

    Ok(Json(PageResponse {
        data: logs,
        total,
        page: paging.page(),
        page_size: paging.page_size(),
    }))
}

/// GET /api/v1/logs/{id}
pub async fn get_log(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<NotificationLog>>> {
    let log = state
        .store
        .find_log(id)
        .await?
        .filter(|log| log.member_id == auth.member_id)
        .ok_or(CoreError::NotFound {
            entity: "NotificationLog",
            id,
        })?;
    Ok(Json(DataResponse { data: log }))
}

/// GET /api/v1/logs/stats
pub async fn log_stats(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(range): Query<DateRangeParams>,
) -> AppResult<Json<DataResponse<LogStats>>> {
    let (start, end) = range.parse()?;
    let counts = state.store.log_counts(auth.member_id, start, end).await?;

    let total = counts.total();
    let stats = LogStats {
        total,
        success_rate: percent(counts.status_count(DeliveryStatus::Sent), total),
        failure_rate: percent(counts.status_count(DeliveryStatus::Failed), total),
        status_stats: counts.by_status,
        channel_stats: counts.by_channel,
    };
    Ok(Json(DataResponse { data: stats }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_are_percentages() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(3, 4), 75.0);
    }

    #[test]
    fn filter_rejects_unknown_status() {
        let query = LogQuery {
            status: Some("delivered".into()),
            ..Default::default()
        };
        assert!(query.filter(uuid::Uuid::nil()).is_err());
    }

    #[test]
    fn filter_parses_known_values() {
        let query = LogQuery {
            status: Some("sent".into()),
            channel: Some("sms".into()),
            recipient: Some("  ".into()),
            start_date: Some("2024-01-01T00:00:00Z".into()),
            ..Default::default()
        };
        let filter = query.filter(uuid::Uuid::nil()).unwrap();
        assert_eq!(filter.status, Some(DeliveryStatus::Sent));
        assert_eq!(filter.channel, Some(ChannelKind::Sms));
        assert!(filter.recipient.is_none());
        assert!(filter.start.is_some());
    }
}
