//! Staff shift schedule.
//!
//! Weeks run Monday to Sunday. [`ShiftTable`] lays a week of shifts out as
//! one row per employee and one column per day.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Weekday};
use shared::types::{Employee, NewShift, Shift, UserId};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::gateway::ApiClient;
use crate::guard;

// ---------------------------------------------------------------------------
// Week arithmetic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Week {
    start: NaiveDate,
}

impl Week {
    /// The week `date` falls in.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        Self {
            start: date - Duration::days(offset),
        }
    }

    /// Monday.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Sunday.
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(6)
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::days(7),
        }
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Duration::days(7),
        }
    }

    pub fn days(&self) -> [NaiveDate; 7] {
        std::array::from_fn(|i| self.start + Duration::days(i as i64))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }

    /// `3.11 - 9.11.2025`
    pub fn label(&self) -> String {
        let end = self.end();
        format!(
            "{}.{} - {}.{}.{}",
            self.start.day(),
            self.start.month(),
            end.day(),
            end.month(),
            end.year()
        )
    }
}

/// Column header, `Mon 3.11`.
pub fn day_label(date: NaiveDate) -> String {
    let name = match date.weekday() {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    };
    format!("{} {}.{}", name, date.day(), date.month())
}

/// Hours between two `HH:MM` (or `HH:MM:SS`) times on the same day.
/// Negative when `end` is before `start`; `None` if either doesn't parse.
pub fn calculate_hours(start: &str, end: &str) -> Option<f64> {
    let start = parse_time(start)?;
    let end = parse_time(end)?;
    let minutes = |t: NaiveTime| i64::from(t.hour()) * 60 + i64::from(t.minute());
    Some((minutes(end) - minutes(start)) as f64 / 60.0)
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

// ---------------------------------------------------------------------------
// Table layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShiftTable {
    employees: Vec<Employee>,
    shifts: Vec<Shift>,
}

impl ShiftTable {
    pub fn new(shifts: Vec<Shift>) -> Self {
        let mut employees: Vec<Employee> = Vec::new();
        for shift in &shifts {
            if !employees.iter().any(|e| e.id == shift.user_id) {
                employees.push(shift.employee());
            }
        }
        Self { employees, shifts }
    }

    /// Everyone with at least one shift, in the order they first appear.
    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// One cell: `employee`'s shifts on `date`.
    pub fn shifts_for(&self, employee: &UserId, date: NaiveDate) -> Vec<&Shift> {
        self.shifts
            .iter()
            .filter(|s| &s.user_id == employee && s.shift_date == date)
            .collect()
    }

    /// One column: every shift on `date`.
    pub fn shifts_on(&self, date: NaiveDate) -> Vec<&Shift> {
        self.shifts.iter().filter(|s| s.shift_date == date).collect()
    }

    pub fn total_hours(&self, employee: &UserId) -> f64 {
        self.shifts
            .iter()
            .filter(|s| &s.user_id == employee)
            .map(|s| s.hours)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

/// The add-shift form. Every field but `notes` is required.
#[derive(Debug, Clone, Default)]
pub struct ShiftForm {
    pub user_id: Option<UserId>,
    pub date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
    pub notes: String,
}

impl ShiftForm {
    fn into_new_shift(self) -> ApiResult<NewShift> {
        let (Some(user_id), Some(shift_date)) = (self.user_id, self.date) else {
            return Err(missing_fields());
        };
        if self.start_time.trim().is_empty() || self.end_time.trim().is_empty() {
            return Err(missing_fields());
        }

        let hours = calculate_hours(&self.start_time, &self.end_time)
            .ok_or_else(|| ApiError::Validation("Times must look like HH:MM".to_string()))?;
        if hours <= 0.0 {
            return Err(ApiError::Validation(
                "The shift must end after it starts".to_string(),
            ));
        }

        let notes = self.notes.trim();
        Ok(NewShift {
            user_id,
            shift_date,
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
            hours,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        })
    }
}

fn missing_fields() -> ApiError {
    ApiError::Validation("Fill in all required fields".to_string())
}

#[derive(Debug, Clone)]
pub struct Schedule {
    api: ApiClient,
}

impl Schedule {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn fetch_week(&self, week: Week) -> ApiResult<ShiftTable> {
        guard::can_view_schedule(&self.api.session().snapshot())?;

        let start = week.start().to_string();
        let end = week.end().to_string();
        let payload = self
            .api
            .get_query("/api/schedule", &[("startDate", start.as_str()), ("endDate", end.as_str())])
            .await?;
        let shifts: Vec<Shift> = payload.first_of(&["shifts", "data"])?;

        info!("Loaded {} shifts for {}", shifts.len(), week.label());
        Ok(ShiftTable::new(shifts))
    }

    pub async fn employees(&self) -> ApiResult<Vec<Employee>> {
        guard::can_edit_schedule(&self.api.session().snapshot())?;
        let payload = self.api.get("/api/schedule/employees").await?;
        Ok(payload.first_of(&["employees", "data"])?)
    }

    pub async fn add_shift(&self, form: ShiftForm) -> ApiResult<()> {
        guard::can_edit_schedule(&self.api.session().snapshot())?;
        let shift = form.into_new_shift()?;

        self.api.post_json("/api/schedule", &shift).await?;
        info!(
            "Added {}h shift for {} on {}",
            shift.hours, shift.user_id, shift.shift_date
        );
        Ok(())
    }
}
