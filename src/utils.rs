use crate::error::{BudgetError, Result};
use crate::schema::Cents;
use chrono::{Datelike, NaiveDate};

/// Converts a major-unit amount (dollars) entered at the UI boundary into cents.
pub fn dollars_to_cents(dollars: f64) -> Result<Cents> {
    if !dollars.is_finite() {
        return Err(BudgetError::InvalidAmount(format!(
            "{} is not a finite amount",
            dollars
        )));
    }

    let cents = (dollars * 100.0).round();
    if cents.abs() >= i64::MAX as f64 {
        return Err(BudgetError::InvalidAmount(format!(
            "{} is too large to represent",
            dollars
        )));
    }

    Ok(cents as Cents)
}

pub fn cents_to_dollars(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Formats cents as whole US dollars, e.g. `-123456` -> `-$1,235`.
pub fn format_currency(cents: Cents) -> String {
    let rounded = (cents.unsigned_abs() + 50) / 100;
    let digits = rounded.to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if cents < 0 && rounded > 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

pub fn next_month_end(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    last_day_of_month(year, month)
}

/// `count` consecutive month-end dates, starting with the month containing `start`.
pub fn month_ends_from(start: NaiveDate, count: usize) -> Option<Vec<NaiveDate>> {
    let mut dates = Vec::with_capacity(count);
    let mut current = last_day_of_month(start.year(), start.month())?;

    for _ in 0..count {
        dates.push(current);
        current = next_month_end(current)?;
    }

    Some(dates)
}
