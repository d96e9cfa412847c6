use crate::error::{GatewayError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A monetary value paired with its ISO-4217 currency code.
///
/// The value is kept as a `rust_decimal::Decimal` and is only rendered to a string at the
/// wire boundary, using the number of minor units the currency defines. It never passes
/// through floating point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    value: Decimal,
    currency: String,
}

impl Amount {
    /// Creates an amount. The value is kept exactly; rounding happens only when rendering.
    /// The currency code is upper-cased.
    pub fn new(value: Decimal, currency: impl Into<String>) -> Self {
        Self {
            value,
            currency: currency.into().to_ascii_uppercase(),
        }
    }

    /// A zero amount in `currency`.
    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Parses a decimal string such as `"12.50"` without rounding.
    pub fn parse(value: &str, currency: impl Into<String>) -> Result<Self> {
        let value = Decimal::from_str_exact(value.trim()).map_err(|e| {
            GatewayError::ValidationError(format!("Invalid amount value '{}': {}", value, e))
        })?;
        Ok(Self::new(value, currency))
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Number of decimal places the currency is rendered with.
    pub fn decimals(&self) -> u32 {
        currency_decimals(&self.currency)
    }

    /// The value rounded to the currency's minor units, as it goes over the wire.
    pub fn rounded(&self) -> Decimal {
        round_decimal(self.value, self.decimals())
    }

    /// The value as the gateway expects it, e.g. `"10.00"` for EUR or `"1000"` for JPY.
    pub fn to_decimal_string(&self) -> String {
        format_decimal(self.value, self.decimals())
    }
}

/// Minor units per ISO-4217. Currencies not listed use two decimals.
pub fn currency_decimals(currency: &str) -> u32 {
    match currency.to_ascii_uppercase().as_str() {
        "BIF" | "CLP" | "DJF" | "GNF" | "ISK" | "JPY" | "KMF" | "KRW" | "PYG" | "RWF" | "UGX"
        | "VND" | "VUV" | "XAF" | "XOF" | "XPF" => 0,
        "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 3,
        _ => 2,
    }
}

fn round_decimal(value: Decimal, decimals: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimals);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

pub(crate) fn format_decimal(value: Decimal, decimals: u32) -> String {
    round_decimal(value, decimals).to_string()
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Amount", 2)?;
        state.serialize_field("value", &self.to_decimal_string())?;
        state.serialize_field("currency", &self.currency)?;
        state.end()
    }
}

#[derive(Deserialize)]
struct RawAmount {
    value: String,
    currency: String,
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawAmount::deserialize(deserializer)?;
        Amount::parse(&raw.value, raw.currency).map_err(D::Error::custom)
    }
}

/// VAT percentage, sent to the gateway as a string with two decimals (`"21.00"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VatRate(pub Decimal);

impl VatRate {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(rate: Decimal) -> Self {
        Self(rate)
    }

    pub fn to_decimal_string(&self) -> String {
        format_decimal(self.0, 2)
    }
}

impl Serialize for VatRate {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for VatRate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Decimal::from_str_exact(raw.trim())
            .map(VatRate)
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_renders_currency_precision() {
        assert_eq!(Amount::new(dec!(10), "EUR").to_decimal_string(), "10.00");
        assert_eq!(Amount::new(dec!(1000), "jpy").to_decimal_string(), "1000");
        assert_eq!(Amount::new(dec!(1.5), "KWD").to_decimal_string(), "1.500");
    }

    #[test]
    fn test_rounded_matches_rendered_value() {
        let amount = Amount::new(dec!(3.335), "EUR");
        assert_eq!(amount.rounded(), dec!(3.34));
        assert_eq!(amount.rounded().to_string(), amount.to_decimal_string());
        assert_eq!(Amount::new(dec!(-0.001), "EUR").rounded().to_string(), "0.00");
        assert_eq!(Amount::new(dec!(1.2345), "KWD").rounded(), dec!(1.235));
    }

    #[test]
    fn test_amount_rounds_midpoint_away_from_zero() {
        assert_eq!(Amount::new(dec!(0.125), "EUR").to_decimal_string(), "0.13");
        assert_eq!(Amount::new(dec!(-0.125), "EUR").to_decimal_string(), "-0.13");
        assert_eq!(Amount::new(dec!(-0.001), "EUR").to_decimal_string(), "0.00");
    }

    #[test]
    fn test_amount_parse_is_exact() {
        let amount = Amount::parse("99.995", "EUR").unwrap();
        assert_eq!(amount.value(), dec!(99.995));
        assert_eq!(amount.currency(), "EUR");
        assert!(matches!(
            Amount::parse("ten", "EUR"),
            Err(GatewayError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_wire_shape() {
        let json = serde_json::to_value(Amount::new(dec!(5.5), "usd")).unwrap();
        assert_eq!(json, serde_json::json!({"value": "5.50", "currency": "USD"}));

        let back: Amount =
            serde_json::from_value(serde_json::json!({"value": "5.50", "currency": "USD"}))
                .unwrap();
        assert_eq!(back.value(), dec!(5.50));
    }

    #[test]
    fn test_vat_rate_renders_two_decimals() {
        assert_eq!(VatRate::new(dec!(21)).to_decimal_string(), "21.00");
        assert_eq!(
            serde_json::to_value(VatRate::ZERO).unwrap(),
            serde_json::json!("0.00")
        );
    }
}
