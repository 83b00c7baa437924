use chrono::{DateTime, FixedOffset, Local};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use std::str::FromStr;
use serde::{Deserialize, Serialize};

pub type ExpenseId = i64;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub id: ExpenseId,
    pub date: DateTime<FixedOffset>,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Empty means uncategorized.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}

impl Expense {
    /// Creates an expense stamped with the current local time. The id is the
    /// creation time in whole seconds since the Unix epoch.
    pub fn new(description: &str, amount: Decimal, category: &str) -> Self {
        let date: DateTime<FixedOffset> = Local::now().into();

        Self {
            id: date.timestamp(),
            date,
            description: description.to_string(),
            amount,
            category: category.to_string(),
        }
    }
}

/// Whether `amount` reads back unchanged after being written to the
/// expense file, which stores amounts as JSON floats.
pub fn is_storable(amount: Decimal) -> bool {
    amount
        .to_f64()
        .and_then(|float| Decimal::from_str(&float.to_string()).ok())
        .map_or(false, |stored| stored == amount)
}

/// Renders a monetary amount with exactly two decimal places.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn new_assigns_timestamp_id() {
        let before = Utc::now().timestamp();
        let expense = Expense::new("Lunch", Decimal::new(1250, 2), "Food");
        let after = Utc::now().timestamp();

        assert!(expense.id >= before && expense.id <= after);
        assert_eq!(expense.id, expense.date.timestamp());
        assert_eq!(expense.description, "Lunch");
        assert_eq!(expense.amount, Decimal::new(1250, 2));
        assert_eq!(expense.category, "Food");
    }

    #[test]
    fn amounts_have_two_decimals() {
        assert_eq!(format_amount(Decimal::new(125, 1)), "12.50");
        assert_eq!(format_amount(Decimal::new(3, 0)), "3.00");
        assert_eq!(format_amount(Decimal::new(19999, 3)), "20.00");
    }

    #[test]
    fn storable_amounts() {
        assert!(is_storable(Decimal::new(1250, 2)));
        assert!(is_storable(Decimal::new(1, 1)));
        assert!(is_storable(Decimal::ZERO));
        assert!(!is_storable(Decimal::MAX));
        assert!(!is_storable("0.1234567890123456789".parse().unwrap()));
    }

    #[test]
    fn storable_amounts_survive_json() {
        for amount in ["12.50", "0.1", "99999.99", "50000000000000000000000000000"] {
            let mut expense = Expense::new("Rent", Decimal::ONE, "");
            expense.amount = amount.parse().unwrap();
            assert!(is_storable(expense.amount), "{amount}");

            let json = serde_json::to_string(&expense).unwrap();
            let reloaded: Expense = serde_json::from_str(&json).unwrap();
            assert_eq!(reloaded, expense);
        }
    }

    #[test]
    fn empty_category_is_omitted_from_json() {
        let expense = Expense::new("Bus", Decimal::ONE, "");
        let json = serde_json::to_string(&expense).unwrap();

        assert!(!json.contains("category"));
        assert!(json.contains("\"amount\":1"));
    }

    #[test]
    fn missing_category_reads_as_empty() {
        let json = r#"{"id":1,"date":"2024-01-05T12:30:00+01:00","description":"Bus","amount":2.5}"#;
        let expense: Expense = serde_json::from_str(json).unwrap();

        assert_eq!(expense.category, "");
        assert_eq!(expense.amount, Decimal::new(25, 1));
    }
}
