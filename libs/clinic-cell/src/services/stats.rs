// libs/clinic-cell/src/services/stats.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use booking_cell::models::{Reservation, ReservationStatus};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClinicError, ClinicStats, DailyRevenue, StatsRange};

pub struct StatsService {
    supabase: SupabaseClient,
}

impl StatsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_clinic_stats(
        &self,
        clinic_id: Uuid,
        range: StatsRange,
        auth_token: &str,
    ) -> Result<ClinicStats, ClinicError> {
        debug!("Computing stats for clinic {} over {:?}", clinic_id, range);

        let path = format!("/rest/v1/reservations?clinic_id=eq.{}", clinic_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        let reservations = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Reservation>, _>>()
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(compute_stats(&reservations, range, Utc::now()))
    }
}

/// First day a range keeps; `None` keeps everything.
pub fn range_start(range: StatsRange, now: DateTime<Utc>) -> Option<NaiveDate> {
    let days = match range {
        StatsRange::Week => 7,
        StatsRange::Month => 30,
        StatsRange::Quarter => 90,
        StatsRange::All => return None,
    };
    Some((now - Duration::days(days)).date_naive())
}

fn counts_towards_revenue(status: ReservationStatus) -> bool {
    matches!(
        status,
        ReservationStatus::Accepted | ReservationStatus::Completed
    )
}

/// Status counts, total revenue and the per-day revenue series over one
/// clinic's reservations. Pure so the aggregation is testable with a fixed
/// clock.
pub fn compute_stats(
    reservations: &[Reservation],
    range: StatsRange,
    now: DateTime<Utc>,
) -> ClinicStats {
    let cutoff = range_start(range, now);

    let in_range: Vec<&Reservation> = reservations
        .iter()
        .filter(|r| cutoff.map(|start| r.date >= start).unwrap_or(true))
        .collect();

    let count_of = |status: ReservationStatus| {
        in_range.iter().filter(|r| r.status == status).count()
    };

    let mut revenue_cents = 0;
    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for reservation in &in_range {
        if counts_towards_revenue(reservation.status) {
            if let Some(price) = reservation.price_cents {
                revenue_cents += price;
                *per_day.entry(reservation.date).or_insert(0) += price;
            }
        }
    }

    let daily_revenue = per_day
        .into_iter()
        .map(|(date, total_cents)| DailyRevenue { date, total_cents })
        .collect();

    ClinicStats {
        total: in_range.len(),
        pending: count_of(ReservationStatus::Pending),
        accepted: count_of(ReservationStatus::Accepted),
        cancelled: count_of(ReservationStatus::Cancelled),
        completed: count_of(ReservationStatus::Completed),
        revenue_cents,
        daily_revenue,
    }
}
