//! Validation utilities for the Storefront platform
//!
//! Includes the mobile-money phone rules used at checkout.

use rust_decimal::Decimal;

// ============================================================================
// Inventory Validations
// ============================================================================

/// Validate a sale or receipt quantity
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a unit cost recorded against received stock
pub fn validate_unit_cost(cost: Decimal) -> Result<(), &'static str> {
    if cost < Decimal::ZERO {
        return Err("Unit cost cannot be negative");
    }
    if cost.normalize().scale() > 2 {
        return Err("Unit cost cannot have more than 2 decimal places");
    }
    Ok(())
}

/// Validate a unit sale price and the discount applied to it
pub fn validate_sale_price(price: Decimal, discount: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Sale price cannot be negative");
    }
    if discount < Decimal::ZERO {
        return Err("Discount cannot be negative");
    }
    if discount > price {
        return Err("Discount cannot exceed the sale price");
    }
    Ok(())
}

/// Validate bundle component quantities
pub fn validate_bundle_quantities(quantities: &[i64]) -> Result<(), &'static str> {
    if quantities.is_empty() {
        return Err("A bundle needs at least one component");
    }
    if quantities.iter().any(|q| *q <= 0) {
        return Err("Bundle component quantities must be positive");
    }
    Ok(())
}

// ============================================================================
// Mobile Money Validations
// ============================================================================

/// Validate a Kenyan mobile number accepted by the mobile-money gateway
/// Accepts: 0712345678, 0112345678, 254712345678, +254 712 345 678
pub fn validate_mobile_money_phone(phone: &str) -> Result<(), &'static str> {
    normalize_mobile_money_phone(phone).map(|_| ())
}

/// Normalize a mobile number to the 2547XXXXXXXX / 2541XXXXXXXX form
pub fn normalize_mobile_money_phone(phone: &str) -> Result<String, &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    let subscriber = if digits.len() == 10 && digits.starts_with('0') {
        &digits[1..]
    } else if digits.len() == 12 && digits.starts_with("254") {
        &digits[3..]
    } else if digits.len() == 9 {
        &digits[..]
    } else {
        return Err("Invalid mobile money phone number format");
    };

    if !(subscriber.starts_with('7') || subscriber.starts_with('1')) {
        return Err("Mobile money number must be a Safaricom-style 7xx or 1xx line");
    }

    Ok(format!("254{}", subscriber))
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a display name for a line item
pub fn validate_display_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty");
    }
    if name.len() > 255 {
        return Err("Name must be at most 255 characters");
    }
    Ok(())
}
