//! Value normalization applied on every write path.

use chrono::{DateTime, Local, NaiveDateTime, SubsecRound, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Scale of every money column.
pub const MONEY_SCALE: u32 = 4;

/// Largest magnitude a numeric(19, 4) column holds.
pub const MAX_MONEY: Decimal = dec!(999999999999999.9999);

/// Converts to UTC and truncates to the microsecond resolution of `timestamptz`.
pub fn utc<Tz: TimeZone>(t: DateTime<Tz>) -> DateTime<Utc> {
    t.with_timezone(&Utc).trunc_subsecs(6)
}

/// Interprets a naive wall-clock value in the host zone.
///
/// Ambiguous local times (DST fall-back) resolve to the earliest instant. Local
/// times that do not exist (DST spring-forward gap) are taken as UTC wall time.
pub fn from_naive_local(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => utc(local),
        None => utc(Utc.from_utc_datetime(&naive)),
    }
}

pub fn now() -> DateTime<Utc> {
    utc(Utc::now())
}

pub fn money(amount: Decimal) -> Decimal {
    amount.round_dp(MONEY_SCALE)
}

/// `amount` rounded to storage scale, or `None` when it does not fit a money column.
pub fn checked_money(amount: Decimal) -> Option<Decimal> {
    let amount = money(amount);
    (amount.abs() <= MAX_MONEY).then_some(amount)
}
