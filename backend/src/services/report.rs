//! Daily report intake from the driver LIFF app
//!
//! Typed payloads per report type. Deserializing into these structs is the
//! field whitelist: anything the client sends outside them is dropped, and
//! `organization_id` / `driver_id` / `submitted_via` are stamped from the
//! resolved driver, never taken from the request.

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::{
    AccidentStatus, AlcoholCheckResult, Driver, FatigueLevel, HealthCondition, RestPeriod,
    SubmittedVia, Vehicle,
};

/// Pre-work report (roll call before duty)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreWorkReportInput {
    pub report_date: NaiveDate,
    pub vehicle_id: Option<Uuid>,
    pub clock_in_at: Option<DateTime<Utc>>,
    pub departure_point: Option<String>,
    pub alcohol_check_result: AlcoholCheckResult,
    pub alcohol_check_value: Option<Decimal>,
    pub alcohol_checker_name: Option<String>,
    pub health_condition: HealthCondition,
    pub fatigue_level: FatigueLevel,
    #[validate(range(min = 0.0, max = 24.0))]
    pub sleep_hours: Option<f64>,
    pub sleep_sufficient: Option<bool>,
    pub illness_note: Option<String>,
    pub route_info: Option<String>,
    pub notes: Option<String>,
}

/// Post-work report (roll call after duty)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostWorkReportInput {
    pub report_date: NaiveDate,
    pub vehicle_id: Option<Uuid>,
    pub clock_out_at: Option<DateTime<Utc>>,
    pub arrival_point: Option<String>,
    pub distance_km: Option<Decimal>,
    #[validate(range(min = 0))]
    pub cargo_delivered_count: Option<i32>,
    pub rest_periods: Option<Vec<RestPeriod>>,
    pub alcohol_check_result: AlcoholCheckResult,
    pub alcohol_check_value: Option<Decimal>,
    pub alcohol_checker_name: Option<String>,
    pub road_condition_note: Option<String>,
    pub vehicle_condition_note: Option<String>,
    pub notes: Option<String>,
}

/// Daily vehicle inspection checklist
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InspectionInput {
    pub inspection_date: NaiveDate,
    pub vehicle_id: Option<Uuid>,
    pub engine_oil: bool,
    pub coolant_level: bool,
    pub battery: bool,
    pub fan_belt: bool,
    pub headlights: bool,
    pub turn_signals: bool,
    pub brake_lights: bool,
    pub hazard_lights: bool,
    pub tire_pressure: bool,
    pub tire_tread: bool,
    pub tire_damage: bool,
    pub mirrors: bool,
    pub seatbelt: bool,
    pub brakes: bool,
    pub steering: bool,
    pub all_passed: bool,
    pub abnormality_note: Option<String>,
    pub notes: Option<String>,
}

/// Accident report
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccidentInput {
    pub occurred_at: DateTime<Utc>,
    pub vehicle_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub location: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    #[validate(length(min = 1))]
    pub summary: String,
    pub cause: Option<String>,
    pub prevention_measures: Option<String>,
    pub has_injuries: bool,
    pub injury_details: Option<String>,
    pub is_serious: bool,
    pub counterparty_info: Option<String>,
    pub police_reported: bool,
    pub insurance_contacted: bool,
    pub notes: Option<String>,
    pub status: Option<AccidentStatus>,
}

/// A typed report payload
#[derive(Debug)]
pub enum ReportInput {
    PreWork(PreWorkReportInput),
    PostWork(PostWorkReportInput),
    Inspection(InspectionInput),
    Accident(AccidentInput),
}

/// Parse a `type` / `data` pair into a typed payload.
///
/// An unrecognized type and a payload that fails typed deserialization both
/// reject with a 400-mapped error, never a raw decoding failure.
pub fn parse_report_input(report_type: &str, data: serde_json::Value) -> AppResult<ReportInput> {
    fn decode<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> AppResult<T> {
        serde_json::from_value(data).map_err(|e| AppError::ValidationError(e.to_string()))
    }

    match report_type {
        "pre_work" => Ok(ReportInput::PreWork(decode(data)?)),
        "post_work" => Ok(ReportInput::PostWork(decode(data)?)),
        "inspection" => Ok(ReportInput::Inspection(decode(data)?)),
        "accident" => Ok(ReportInput::Accident(decode(data)?)),
        _ => Err(AppError::Validation {
            field: "type".to_string(),
            message: "Invalid report type".to_string(),
            message_ja: "無効なレポート種別です".to_string(),
        }),
    }
}

/// Report rows expire after the legal retention period: one year for daily
/// reports, three years for accident reports.
const DAILY_RETENTION_MONTHS: u32 = 12;
const ACCIDENT_RETENTION_MONTHS: u32 = 36;

/// Report intake service
#[derive(Clone)]
pub struct ReportService {
    db: PgPool,
}

impl ReportService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The driver's default vehicle, if any (LIFF form prefill).
    pub async fn default_vehicle(&self, driver: &Driver) -> AppResult<Option<Vehicle>> {
        let Some(vehicle_id) = driver.default_vehicle_id else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, (Uuid, String, Option<String>, Option<String>)>(
            "SELECT id, plate_number, maker, model FROM vehicles WHERE id = $1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(id, plate_number, maker, model)| Vehicle {
            id,
            plate_number,
            maker,
            model,
        }))
    }

    /// Insert a report row for the driver; returns the new row id.
    pub async fn submit(&self, driver: &Driver, input: ReportInput) -> AppResult<Uuid> {
        match input {
            ReportInput::PreWork(input) => self.insert_pre_work(driver, input).await,
            ReportInput::PostWork(input) => self.insert_post_work(driver, input).await,
            ReportInput::Inspection(input) => self.insert_inspection(driver, input).await,
            ReportInput::Accident(input) => self.insert_accident(driver, input).await,
        }
    }

    async fn insert_pre_work(&self, driver: &Driver, input: PreWorkReportInput) -> AppResult<Uuid> {
        validate_input(&input)?;
        let expires_at = retention_expiry(input.report_date, DAILY_RETENTION_MONTHS)?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO pre_work_reports (
                organization_id, driver_id, vehicle_id, report_date, clock_in_at,
                departure_point, alcohol_check_result, alcohol_check_value,
                alcohol_checker_name, health_condition, fatigue_level, sleep_hours,
                sleep_sufficient, illness_note, route_info, notes,
                submitted_via, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING id
            "#,
        )
        .bind(driver.organization_id)
        .bind(driver.id)
        .bind(input.vehicle_id.or(driver.default_vehicle_id))
        .bind(input.report_date)
        .bind(input.clock_in_at)
        .bind(&input.departure_point)
        .bind(input.alcohol_check_result.as_str())
        .bind(input.alcohol_check_value)
        .bind(&input.alcohol_checker_name)
        .bind(input.health_condition.as_str())
        .bind(input.fatigue_level.as_str())
        .bind(input.sleep_hours)
        .bind(input.sleep_sufficient)
        .bind(&input.illness_note)
        .bind(&input.route_info)
        .bind(&input.notes)
        .bind(SubmittedVia::Liff.as_str())
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_post_work(
        &self,
        driver: &Driver,
        input: PostWorkReportInput,
    ) -> AppResult<Uuid> {
        validate_input(&input)?;
        let expires_at = retention_expiry(input.report_date, DAILY_RETENTION_MONTHS)?;
        let rest_periods = match &input.rest_periods {
            Some(periods) => Some(
                serde_json::to_value(periods)
                    .map_err(|e| AppError::Internal(format!("rest period encoding: {}", e)))?,
            ),
            None => None,
        };

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO post_work_reports (
                organization_id, driver_id, vehicle_id, report_date, clock_out_at,
                arrival_point, distance_km, cargo_delivered_count, rest_periods,
                alcohol_check_result, alcohol_check_value, alcohol_checker_name,
                road_condition_note, vehicle_condition_note, notes,
                submitted_via, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING id
            "#,
        )
        .bind(driver.organization_id)
        .bind(driver.id)
        .bind(input.vehicle_id.or(driver.default_vehicle_id))
        .bind(input.report_date)
        .bind(input.clock_out_at)
        .bind(&input.arrival_point)
        .bind(input.distance_km)
        .bind(input.cargo_delivered_count)
        .bind(rest_periods)
        .bind(input.alcohol_check_result.as_str())
        .bind(input.alcohol_check_value)
        .bind(&input.alcohol_checker_name)
        .bind(&input.road_condition_note)
        .bind(&input.vehicle_condition_note)
        .bind(&input.notes)
        .bind(SubmittedVia::Liff.as_str())
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_inspection(&self, driver: &Driver, input: InspectionInput) -> AppResult<Uuid> {
        validate_input(&input)?;
        let expires_at = retention_expiry(input.inspection_date, DAILY_RETENTION_MONTHS)?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO daily_inspections (
                organization_id, driver_id, vehicle_id, inspection_date,
                engine_oil, coolant_level, battery, fan_belt,
                headlights, turn_signals, brake_lights, hazard_lights,
                tire_pressure, tire_tread, tire_damage,
                mirrors, seatbelt, brakes, steering,
                all_passed, abnormality_note, notes,
                submitted_via, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            RETURNING id
            "#,
        )
        .bind(driver.organization_id)
        .bind(driver.id)
        .bind(input.vehicle_id.or(driver.default_vehicle_id))
        .bind(input.inspection_date)
        .bind(input.engine_oil)
        .bind(input.coolant_level)
        .bind(input.battery)
        .bind(input.fan_belt)
        .bind(input.headlights)
        .bind(input.turn_signals)
        .bind(input.brake_lights)
        .bind(input.hazard_lights)
        .bind(input.tire_pressure)
        .bind(input.tire_tread)
        .bind(input.tire_damage)
        .bind(input.mirrors)
        .bind(input.seatbelt)
        .bind(input.brakes)
        .bind(input.steering)
        .bind(input.all_passed)
        .bind(&input.abnormality_note)
        .bind(&input.notes)
        .bind(SubmittedVia::Liff.as_str())
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_accident(&self, driver: &Driver, input: AccidentInput) -> AppResult<Uuid> {
        validate_input(&input)?;
        let expires_at = retention_expiry(input.occurred_at.date_naive(), ACCIDENT_RETENTION_MONTHS)?;
        let status = input.status.unwrap_or(AccidentStatus::Submitted);

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO accident_reports (
                organization_id, driver_id, vehicle_id, occurred_at, location,
                latitude, longitude, summary, cause, prevention_measures,
                has_injuries, injury_details, is_serious, counterparty_info,
                police_reported, insurance_contacted, notes, status,
                submitted_via, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING id
            "#,
        )
        .bind(driver.organization_id)
        .bind(driver.id)
        .bind(input.vehicle_id.or(driver.default_vehicle_id))
        .bind(input.occurred_at)
        .bind(&input.location)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.summary)
        .bind(&input.cause)
        .bind(&input.prevention_measures)
        .bind(input.has_injuries)
        .bind(&input.injury_details)
        .bind(input.is_serious)
        .bind(&input.counterparty_info)
        .bind(input.police_reported)
        .bind(input.insurance_contacted)
        .bind(&input.notes)
        .bind(status.as_str())
        .bind(SubmittedVia::Liff.as_str())
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }
}

fn validate_input<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))
}

/// The date a report row becomes eligible for deletion.
fn retention_expiry(report_date: NaiveDate, months: u32) -> AppResult<NaiveDate> {
    report_date
        .checked_add_months(Months::new(months))
        .ok_or_else(|| AppError::Internal("retention date overflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_periods() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 12).unwrap();
        assert_eq!(
            retention_expiry(date, DAILY_RETENTION_MONTHS).unwrap(),
            NaiveDate::from_ymd_opt(2027, 2, 12).unwrap()
        );
        assert_eq!(
            retention_expiry(date, ACCIDENT_RETENTION_MONTHS).unwrap(),
            NaiveDate::from_ymd_opt(2029, 2, 12).unwrap()
        );
    }

    #[test]
    fn test_retention_clamps_month_end() {
        // Feb 29 + 12 months lands on Feb 28 of the following year
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            retention_expiry(date, 12).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_parse_pre_work_payload() {
        let data = serde_json::json!({
            "reportDate": "2026-02-12",
            "alcoholCheckResult": "negative",
            "healthCondition": "good",
            "fatigueLevel": "none",
            "sleepHours": 7.5
        });
        match parse_report_input("pre_work", data).unwrap() {
            ReportInput::PreWork(report) => {
                assert_eq!(
                    report.report_date,
                    NaiveDate::from_ymd_opt(2026, 2, 12).unwrap()
                );
                assert_eq!(report.alcohol_check_result, AlcoholCheckResult::Negative);
                assert_eq!(report.sleep_hours, Some(7.5));
                assert!(report.vehicle_id.is_none());
            }
            _ => panic!("expected pre_work input"),
        }
    }

    #[test]
    fn test_unknown_report_type_rejected() {
        let result = parse_report_input("weekly", serde_json::json!({}));
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let result = parse_report_input("pre_work", serde_json::json!({"reportDate": 42}));
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        // The typed payload is the whitelist: ids injected by the client
        // never make it into the insert.
        let data = serde_json::json!({
            "inspectionDate": "2026-02-12",
            "engineOil": true, "coolantLevel": true, "battery": true,
            "fanBelt": true, "headlights": true, "turnSignals": true,
            "brakeLights": true, "hazardLights": true, "tirePressure": true,
            "tireTread": true, "tireDamage": true, "mirrors": true,
            "seatbelt": true, "brakes": true, "steering": true,
            "allPassed": true,
            "driverId": "00000000-0000-0000-0000-000000000001",
            "organizationId": "00000000-0000-0000-0000-000000000002"
        });
        let input = parse_report_input("inspection", data).unwrap();
        assert!(matches!(input, ReportInput::Inspection(_)));
    }

    #[test]
    fn test_sleep_hours_range_validated() {
        let input = PreWorkReportInput {
            report_date: NaiveDate::from_ymd_opt(2026, 2, 12).unwrap(),
            vehicle_id: None,
            clock_in_at: None,
            departure_point: None,
            alcohol_check_result: AlcoholCheckResult::Negative,
            alcohol_check_value: None,
            alcohol_checker_name: None,
            health_condition: HealthCondition::Good,
            fatigue_level: FatigueLevel::None,
            sleep_hours: Some(30.0),
            sleep_sufficient: None,
            illness_note: None,
            route_info: None,
            notes: None,
        };
        assert!(input.validate().is_err());
    }
}
