//! Pricing Rule Resolver: turns an event type, guest count and duration
//! into a monetary quote, using an admin-configured `PricingRule` when one
//! exists and a hardcoded per-type default table otherwise.
//!
//! `resolve_quote` is pure; identical inputs and rule state always produce
//! the identical quote, which is what makes "quote now, book later" hold.

use serde::Serialize;
use sqlx::PgExecutor;

use crate::models::{EventType, PricingRule};
use crate::utils::error::AppError;

pub const CURRENCY: &str = "ETB";

#[derive(Debug, Clone, Copy)]
pub struct TypeDefaults {
    pub base_price: i64,
    pub per_guest: i64,
    pub per_hour: i64,
    pub default_hours: i32,
}

/// Fallback table applied when no `PricingRule` row exists for the type.
pub fn defaults_for(event_type: EventType) -> TypeDefaults {
    let base_price = match event_type {
        EventType::Wedding => 20_000,
        EventType::Birthday => 10_000,
        EventType::Corporate => 15_000,
        EventType::Other => 12_000,
    };
    TypeDefaults {
        base_price,
        per_guest: 0,
        per_hour: 0,
        default_hours: 5,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub event_type: String,
    pub guest_count: i32,
    pub duration_hours: i32,
    pub base_price: i64,
    pub per_guest: i64,
    pub per_hour: i64,
    pub total_price: i64,
    pub currency: &'static str,
}

/// Computes a quote. `duration_hours` falls back to the rule's default
/// hours, then the type default, when absent or non-positive.
pub fn resolve_quote(
    rule: Option<&PricingRule>,
    event_type: EventType,
    guest_count: i32,
    duration_hours: Option<i32>,
) -> Quote {
    let defaults = defaults_for(event_type);

    let base_price = rule.map_or(defaults.base_price, |r| r.base_price);
    let per_guest = rule.map_or(defaults.per_guest, |r| r.per_guest);
    let per_hour = rule.map_or(defaults.per_hour, |r| r.per_hour);

    let used_hours = match duration_hours {
        Some(h) if h > 0 => h,
        _ => rule.map_or(defaults.default_hours, |r| r.default_hours),
    };

    // All terms are integers, so the rounding required by the contract is
    // already exact here.
    let total_price = base_price + i64::from(guest_count) * per_guest + i64::from(used_hours) * per_hour;

    Quote {
        event_type: event_type.as_str().to_string(),
        guest_count,
        duration_hours: used_hours,
        base_price,
        per_guest,
        per_hour,
        total_price,
        currency: CURRENCY,
    }
}

/// Integer division rounded half-up; used to derive a per-ticket price from
/// a booking total when an event is auto-created.
pub fn per_guest_price(total: i64, guests: i32) -> i64 {
    if guests <= 0 {
        return total;
    }
    let guests = i64::from(guests);
    (total + guests / 2) / guests
}

pub async fn load_rule<'e, E>(
    executor: E,
    event_type: EventType,
) -> Result<Option<PricingRule>, AppError>
where
    E: PgExecutor<'e>,
{
    let rule = sqlx::query_as::<_, PricingRule>(
        "SELECT * FROM pricing_rules WHERE event_type = $1",
    )
    .bind(event_type.as_str())
    .fetch_optional(executor)
    .await?;
    Ok(rule)
}

/// Rule lookup + resolution in one call, for the quote and booking paths.
pub async fn quote_for<'e, E>(
    executor: E,
    event_type: EventType,
    guest_count: i32,
    duration_hours: Option<i32>,
) -> Result<Quote, AppError>
where
    E: PgExecutor<'e>,
{
    let rule = load_rule(executor, event_type).await?;
    Ok(resolve_quote(
        rule.as_ref(),
        event_type,
        guest_count,
        duration_hours,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn rule(base_price: i64, per_guest: i64, per_hour: i64, default_hours: i32) -> PricingRule {
        PricingRule {
            id: Uuid::new_v4(),
            event_type: "wedding".to_string(),
            base_price,
            per_guest,
            per_hour,
            default_hours,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn defaults_apply_when_no_rule_exists() {
        for ty in EventType::ALL {
            let quote = resolve_quote(None, ty, 100, Some(8));
            // Default per-guest and per-hour rates are zero, so the total
            // collapses to the base price.
            assert_eq!(quote.base_price, defaults_for(ty).base_price);
            assert_eq!(quote.total_price, quote.base_price);
            assert_eq!(quote.currency, "ETB");
        }
    }

    #[test]
    fn rule_overrides_produce_linear_total() {
        let r = rule(20_000, 100, 500, 5);
        let quote = resolve_quote(Some(&r), EventType::Wedding, 50, Some(3));
        assert_eq!(quote.total_price, 20_000 + 50 * 100 + 3 * 500);
        assert_eq!(quote.total_price, 26_500);
    }

    #[test]
    fn duration_falls_back_to_rule_then_type_default() {
        let r = rule(10_000, 0, 200, 6);
        let quote = resolve_quote(Some(&r), EventType::Birthday, 10, None);
        assert_eq!(quote.duration_hours, 6);
        assert_eq!(quote.total_price, 10_000 + 6 * 200);

        let quote = resolve_quote(None, EventType::Birthday, 10, Some(0));
        assert_eq!(quote.duration_hours, 5);
    }

    #[test]
    fn identical_inputs_yield_identical_quotes() {
        let r = rule(15_000, 50, 0, 5);
        let a = resolve_quote(Some(&r), EventType::Corporate, 80, Some(4));
        let b = resolve_quote(Some(&r), EventType::Corporate, 80, Some(4));
        assert_eq!(a, b);
    }

    #[test]
    fn per_guest_price_rounds_half_up() {
        assert_eq!(per_guest_price(100, 3), 33);
        assert_eq!(per_guest_price(101, 2), 51);
        assert_eq!(per_guest_price(20_000, 40), 500);
    }
}
