// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Raw integer amounts and their decimal scaling

use rust_decimal::Decimal;
use thiserror::Error;

/// Largest scale `rust_decimal` can represent
pub const MAX_DECIMALS: u32 = 28;

/// Largest mantissa `rust_decimal` can represent: 2^96 - 1
const MAX_MANTISSA: u128 = (1 << 96) - 1;

/// Errors converting raw provider amounts into canonical values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The provider value is not a non-negative integer
    #[error("invalid raw amount `{0}`")]
    Invalid(String),

    /// The integer part of the amount does not fit a 96-bit decimal
    #[error("amount {raw} with {decimals} decimals cannot be represented")]
    Unrepresentable {
        /// Raw amount
        raw: u128,
        /// Decimal places
        decimals: u32,
    },
}

/// Scales a raw amount to its decimal value: `raw × 10^-decimals`
///
/// Exact whenever the result fits 96 bits. Otherwise the least significant
/// fractional digits are rounded half up until it does; the raw amount stays
/// exact on the item. Only amounts whose integer part alone overflows are
/// rejected.
pub fn scale(raw: u128, decimals: u32) -> Result<Decimal, AmountError> {
    let unrepresentable = || AmountError::Unrepresentable { raw, decimals };
    let mut mantissa = raw;
    let mut scale = decimals;
    while scale > 0 && (scale > MAX_DECIMALS || mantissa > MAX_MANTISSA) {
        mantissa = mantissa / 10 + u128::from(mantissa % 10 >= 5);
        scale -= 1;
    }
    if mantissa > MAX_MANTISSA {
        return Err(unrepresentable());
    }
    let mantissa = i128::try_from(mantissa).map_err(|_| unrepresentable())?;
    Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| unrepresentable())
}

/// Parses a raw amount given as decimal digits or `0x`-prefixed hex
pub fn parse_raw(value: &str) -> Result<u128, AmountError> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u128::from_str_radix(hex, 16),
        None => trimmed.parse::<u128>(),
    };
    parsed.map_err(|_| AmountError::Invalid(value.to_string()))
}
