//! Validation utilities for the Halal Marketplace

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::types::GeoPoint;

// ============================================================================
// Dates
// ============================================================================

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, &'static str> {
    let input = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or("Date must be an RFC 3339 timestamp or YYYY-MM-DD")
}

/// Validate that a date lies strictly after `now`
pub fn validate_future_date(date: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), &'static str> {
    if date <= now {
        return Err("Date must be in the future");
    }
    Ok(())
}

// ============================================================================
// Products
// ============================================================================

/// Validate a product name
pub fn validate_product_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > 200 {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

/// Decimal places a stored price keeps
pub const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound of a price (`NUMERIC(12, 2)`)
pub fn max_price() -> Decimal {
    Decimal::new(10_000_000_000, 0)
}

/// Validate that a price is non-negative and fits its column without rounding
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err("Price can have at most 2 decimal places");
    }
    if price >= max_price() {
        return Err("Price must be less than 10000000000");
    }
    Ok(())
}

// ============================================================================
// Supply chain
// ============================================================================

/// Decimal places kept for coordinates (`NUMERIC(9, 6)`, roughly 0.1 m)
pub const COORDINATE_SCALE: u32 = 6;

/// Validate latitude/longitude ranges and precision
pub fn validate_coordinates(point: &GeoPoint) -> Result<(), &'static str> {
    if point.latitude < Decimal::from(-90) || point.latitude > Decimal::from(90) {
        return Err("Latitude must be between -90 and 90");
    }
    if point.longitude < Decimal::from(-180) || point.longitude > Decimal::from(180) {
        return Err("Longitude must be between -180 and 180");
    }
    if point.latitude.normalize().scale() > COORDINATE_SCALE
        || point.longitude.normalize().scale() > COORDINATE_SCALE
    {
        return Err("Coordinates can have at most 6 decimal places");
    }
    Ok(())
}

/// Validate relative humidity percentage
pub fn validate_humidity(humidity: Decimal) -> Result<(), &'static str> {
    if humidity < Decimal::ZERO || humidity > Decimal::from(100) {
        return Err("Humidity must be between 0 and 100%");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}
