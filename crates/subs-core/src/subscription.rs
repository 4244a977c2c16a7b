//! The subscription row and its payment value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::Status;

/// Basis points in 100%.
pub const FULL_PERCENTAGE_BP: i64 = 10_000;

/// A subscription of a client to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique subscription identifier.
    pub id: Uuid,
    /// The owning client. Resolved by lookup, never embedded.
    pub client_id: Uuid,
    /// The subscribed product.
    pub product_id: Uuid,
    /// Current lifecycle status.
    pub status: Status,
    /// Payment terms.
    pub payment: Payment,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

persisted_enum! {
    /// How a subscription is paid.
    pub enum PaymentMethod {
        /// Credit card.
        Credit,
        /// Debit card.
        Debit,
        /// Instant bank transfer.
        Pix,
        /// Bank slip.
        BankSlip,
    }
}

persisted_enum! {
    /// How often a subscription is charged.
    pub enum PaymentFrequency {
        /// Single lump-sum payment.
        Bullet,
        /// Every month.
        Monthly,
        /// Every two months.
        Bimonthly,
        /// Every three months.
        Quarterly,
        /// Every six months.
        Semiannual,
        /// Once a year.
        Annual,
    }
}

impl PaymentFrequency {
    /// Months between charges; `0` for a bullet payment.
    #[must_use]
    pub fn months(self) -> u32 {
        match self {
            Self::Bullet => 0,
            Self::Monthly => 1,
            Self::Bimonthly => 2,
            Self::Quarterly => 3,
            Self::Semiannual => 6,
            Self::Annual => 12,
        }
    }
}

persisted_enum! {
    /// How a discount value is interpreted.
    pub enum DiscountKind {
        /// A fixed amount in minor currency units.
        Absolute,
        /// A percentage expressed in basis points.
        Percentage,
    }
}

/// A discount applied to the payment amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Interpretation of `value`.
    pub kind: DiscountKind,
    /// Minor units for `Absolute`, basis points for `Percentage`.
    pub value: i64,
}

impl Discount {
    /// The "no discount" value attached when a caller supplies none.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            kind: DiscountKind::Percentage,
            value: 0,
        }
    }

    /// Discount in minor units for a base amount.
    #[must_use]
    pub fn amount_for(&self, base_cents: i64) -> i64 {
        match self.kind {
            DiscountKind::Absolute => self.value,
            DiscountKind::Percentage => saturate(
                i128::from(base_cents) * i128::from(self.value) / i128::from(FULL_PERCENTAGE_BP),
            ),
        }
    }
}

/// Narrows to `i64`, saturating at either bound.
fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Currency of a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// Currency code, e.g. `"BRL"`.
    pub code: String,
    /// Exchange rate relative to the local currency.
    pub rate: f64,
    /// When the rate was taken.
    pub reference: DateTime<Utc>,
}

impl Currency {
    /// The local currency at rate 1.0, referenced at `at`.
    #[must_use]
    pub fn local(at: DateTime<Utc>) -> Self {
        Self {
            code: "BRL".to_owned(),
            rate: 1.0,
            reference: at,
        }
    }
}

/// Payment terms of a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment method.
    pub method: PaymentMethod,
    /// Charge frequency.
    pub frequency: PaymentFrequency,
    /// Amount before discount, in minor units.
    pub amount_cents: i64,
    /// Applied discount.
    pub discount: Discount,
    /// Currency details.
    pub currency: Currency,
}

impl Payment {
    /// Amount after discount, never below zero.
    #[must_use]
    pub fn total_cents(&self) -> i64 {
        let discount = self.discount.amount_for(self.amount_cents);
        saturate(i128::from(self.amount_cents) - i128::from(discount)).max(0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn payment(amount_cents: i64, discount: Discount) -> Payment {
        Payment {
            method: PaymentMethod::Credit,
            frequency: PaymentFrequency::Monthly,
            amount_cents,
            discount,
            currency: Currency::local(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_percentage_discount_uses_basis_points() {
        let p = payment(
            10_000,
            Discount {
                kind: DiscountKind::Percentage,
                value: 1_250,
            },
        );

        assert_eq!(p.total_cents(), 8_750);
    }

    #[test]
    fn test_absolute_discount_never_drives_total_negative() {
        let p = payment(
            500,
            Discount {
                kind: DiscountKind::Absolute,
                value: 900,
            },
        );

        assert_eq!(p.total_cents(), 0);
    }

    #[test]
    fn test_full_percentage_discount_on_huge_amount_does_not_overflow() {
        let p = payment(
            1_000_000_000_000_000,
            Discount {
                kind: DiscountKind::Percentage,
                value: FULL_PERCENTAGE_BP,
            },
        );

        assert_eq!(p.discount.amount_for(p.amount_cents), 1_000_000_000_000_000);
        assert_eq!(p.total_cents(), 0);
    }

    #[test]
    fn test_partial_discount_on_max_amount_stays_exact() {
        let p = payment(
            i64::MAX,
            Discount {
                kind: DiscountKind::Percentage,
                value: 5_000,
            },
        );

        assert_eq!(p.total_cents(), i64::MAX - i64::MAX / 2);
    }

    #[test]
    fn test_zero_discount_keeps_amount() {
        assert_eq!(payment(4_990, Discount::zero()).total_cents(), 4_990);
    }

    #[test]
    fn test_frequency_months() {
        assert_eq!(PaymentFrequency::Bullet.months(), 0);
        assert_eq!(PaymentFrequency::Semiannual.months(), 6);
        assert_eq!(PaymentFrequency::Annual.months(), 12);
    }
}
