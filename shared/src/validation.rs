//! Validation utilities for the Garage Workshop Management Platform
//!
//! Pure field-level checks shared by the backend services; the services
//! translate failures into bilingual API errors.

use rust_decimal::Decimal;

/// Validate a spare part code (SKU): 2-32 characters, uppercase letters,
/// digits and dashes, must not start or end with a dash.
pub fn validate_part_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 || code.len() > 32 {
        return Err("Part code must be 2-32 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Part code may only contain uppercase letters, digits and dashes");
    }
    if code.starts_with('-') || code.ends_with('-') {
        return Err("Part code cannot start or end with a dash");
    }
    Ok(())
}

/// Validate a vehicle plate number: 3-12 characters, letters, digits and
/// spaces (e.g. "B 1234 XYZ").
pub fn validate_plate_number(plate: &str) -> Result<(), &'static str> {
    let trimmed = plate.trim();
    if trimmed.len() < 3 || trimmed.len() > 12 {
        return Err("Plate number must be 3-12 characters");
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ')
    {
        return Err("Plate number may only contain letters, digits and spaces");
    }
    Ok(())
}

/// Validate a login username: 3-32 lowercase alphanumeric characters,
/// dots and underscores allowed in the middle.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 || username.len() > 32 {
        return Err("Username must be 3-32 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_')
    {
        return Err("Username may only contain lowercase letters, digits, dots and underscores");
    }
    if username.starts_with(['.', '_']) || username.ends_with(['.', '_']) {
        return Err("Username cannot start or end with a dot or underscore");
    }
    Ok(())
}

/// Validate a stock-affecting quantity (purchases, usage): strictly positive.
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a price or cost amount: must not be negative.
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// Validate the net unit cost of a purchase line: the per-unit discount
/// must not exceed the unit price.
pub fn validate_net_cost(unit_price: Decimal, discount: Decimal) -> Result<(), &'static str> {
    validate_price(unit_price)?;
    validate_price(discount)?;
    if discount > unit_price {
        return Err("Discount cannot exceed unit price");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_valid_part_codes() {
        for code in ["BRG-1", "OLI-10W40", "AKI", "KMP-RD-250"] {
            assert!(validate_part_code(code).is_ok(), "{code} should be valid");
        }
    }

    #[test]
    fn test_invalid_part_codes() {
        for code in ["b", "brg-1", "BRG 1", "-BRG", "BRG-", ""] {
            assert!(validate_part_code(code).is_err(), "{code} should be invalid");
        }
    }

    #[test]
    fn test_plate_numbers() {
        assert!(validate_plate_number("B 1234 XYZ").is_ok());
        assert!(validate_plate_number("AB123CD").is_ok());
        assert!(validate_plate_number("1!").is_err());
        assert!(validate_plate_number("").is_err());
    }

    #[test]
    fn test_usernames() {
        assert!(validate_username("budi.santoso").is_ok());
        assert!(validate_username("mechanic_01").is_ok());
        assert!(validate_username("Budi").is_err());
        assert!(validate_username(".budi").is_err());
        assert!(validate_username("ab").is_err());
    }

    #[test]
    fn test_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_net_cost() {
        let price = Decimal::from(1000);
        assert!(validate_net_cost(price, Decimal::from(100)).is_ok());
        assert!(validate_net_cost(price, Decimal::from(1000)).is_ok());
        assert!(validate_net_cost(price, Decimal::from(1001)).is_err());
        assert!(validate_net_cost(Decimal::from(-1), Decimal::ZERO).is_err());
    }
}
