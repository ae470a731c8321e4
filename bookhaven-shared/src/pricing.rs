//! Order pricing rules
//!
//! Bulk discounts reward larger orders: 5% off once an order holds five
//! items and a further 10% (15% in total) from ten items. Sale prices apply a
//! percentage discount to a single book's list price.

use rand::{distributions::Uniform, Rng};
use rust_decimal::{Decimal, RoundingStrategy};

/// Item count that unlocks the first bulk discount tier
pub const BULK_TIER_ONE_ITEMS: i64 = 5;

/// Item count that unlocks the second tier
pub const BULK_TIER_TWO_ITEMS: i64 = 10;

/// Length of a pickup claim code
pub const CLAIM_CODE_LENGTH: usize = 8;

const CLAIM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Totals computed for an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub total_amount: Decimal,
    pub discount_rate: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

impl OrderTotals {
    pub fn discount_applied(&self) -> bool {
        !self.discount_rate.is_zero()
    }
}

/// Rounds to cents, half to even.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Discount rate for an order holding `item_count` books.
pub fn bulk_discount_rate(item_count: i64) -> Decimal {
    let mut rate = Decimal::ZERO;
    if item_count >= BULK_TIER_ONE_ITEMS {
        rate += Decimal::new(5, 2);
    }
    if item_count >= BULK_TIER_TWO_ITEMS {
        rate += Decimal::new(10, 2);
    }
    rate
}

/// Prices an order from `(unit_price, quantity)` lines.
pub fn price_order<I>(lines: I) -> OrderTotals
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let (total_amount, item_count) = lines.into_iter().fold(
        (Decimal::ZERO, 0i64),
        |(total, count), (price, quantity)| {
            (total + line_subtotal(price, quantity), count + i64::from(quantity))
        },
    );

    let discount_rate = bulk_discount_rate(item_count);
    let discount_amount = round_money(total_amount * discount_rate);

    OrderTotals {
        total_amount,
        discount_rate,
        discount_amount,
        final_amount: total_amount - discount_amount,
    }
}

pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Sale price after a percentage discount, rounded to cents.
pub fn discounted_price(price: Decimal, percentage: Decimal) -> Decimal {
    round_money(price - price * percentage / Decimal::ONE_HUNDRED)
}

/// Random claim code of uppercase letters and digits.
pub fn generate_claim_code() -> String {
    let picker = Uniform::from(0..CLAIM_CODE_ALPHABET.len());
    rand::thread_rng()
        .sample_iter(picker)
        .take(CLAIM_CODE_LENGTH)
        .map(|i| CLAIM_CODE_ALPHABET[i] as char)
        .collect()
}

/// Claim codes are compared case-insensitively.
pub fn normalize_claim_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_bulk_discount_tiers() {
        assert_eq!(bulk_discount_rate(0), Decimal::ZERO);
        assert_eq!(bulk_discount_rate(4), Decimal::ZERO);
        assert_eq!(bulk_discount_rate(5), dec("0.05"));
        assert_eq!(bulk_discount_rate(9), dec("0.05"));
        assert_eq!(bulk_discount_rate(10), dec("0.15"));
        assert_eq!(bulk_discount_rate(40), dec("0.15"));
    }

    #[test]
    fn test_small_order_has_no_discount() {
        let totals = price_order([(dec("12.50"), 2), (dec("8.00"), 1)]);
        assert_eq!(totals.total_amount, dec("33.00"));
        assert_eq!(totals.discount_amount, Decimal::ZERO);
        assert_eq!(totals.final_amount, dec("33.00"));
        assert!(!totals.discount_applied());
    }

    #[test]
    fn test_five_items_take_five_percent() {
        let totals = price_order([(dec("10.00"), 3), (dec("20.00"), 2)]);
        assert_eq!(totals.total_amount, dec("70.00"));
        assert_eq!(totals.discount_amount, dec("3.50"));
        assert_eq!(totals.final_amount, dec("66.50"));
        assert!(totals.discount_applied());
    }

    #[test]
    fn test_ten_items_take_fifteen_percent() {
        let totals = price_order([(dec("9.99"), 10)]);
        assert_eq!(totals.total_amount, dec("99.90"));
        // 14.985 rounds half to even
        assert_eq!(totals.discount_amount, dec("14.98"));
        assert_eq!(totals.final_amount, dec("84.92"));
    }

    #[test]
    fn test_discounted_price() {
        assert_eq!(discounted_price(dec("20.00"), dec("25")), dec("15.00"));
        assert_eq!(discounted_price(dec("19.99"), dec("10")), dec("17.99"));
        assert_eq!(discounted_price(dec("10.00"), dec("100")), dec("0.00"));
    }

    #[test]
    fn test_claim_code_shape() {
        let code = generate_claim_code();
        assert_eq!(code.len(), CLAIM_CODE_LENGTH);
        assert!(code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        assert_ne!(generate_claim_code(), generate_claim_code());
    }

    #[test]
    fn test_normalize_claim_code() {
        assert_eq!(normalize_claim_code(" ab12cd34 "), "AB12CD34");
    }
}
