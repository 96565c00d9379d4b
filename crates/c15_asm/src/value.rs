//! Literal values in assembly text: `0x1F`, `7u`, `1.5f`, `2.5`, `-3`, `42`.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("Expected a hexadecimal number or a decimal number.")]
    Malformed,
    #[error("Values are limited to 32 bits.")]
    OutOfRange,
}

/// Parse a literal into the 32-bit word the CPU stores. Floats become their
/// IEEE-754 bit pattern; negative decimals two's complement.
pub fn parse_value(text: &str) -> Result<u32, ValueError> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let hex = hex.strip_suffix('u').unwrap_or(hex);
        if hex.is_empty() {
            return Err(ValueError::Malformed);
        }
        let value = u64::from_str_radix(hex, 16).map_err(|_| classify(hex, 16))?;
        return u32::try_from(value).map_err(|_| ValueError::OutOfRange);
    }
    if let Some(digits) = text.strip_suffix('u') {
        let value: u64 = digits.parse().map_err(|_| classify(digits, 10))?;
        return u32::try_from(value).map_err(|_| ValueError::OutOfRange);
    }
    if text.ends_with('f') || text.contains('.') {
        let number = text.strip_suffix('f').unwrap_or(text);
        let value: f32 = number.parse().map_err(|_| ValueError::Malformed)?;
        if !value.is_finite() {
            return Err(ValueError::OutOfRange);
        }
        return Ok(value.to_bits());
    }
    let value: i64 = text.parse().map_err(|_| classify(text, 10))?;
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return Err(ValueError::OutOfRange);
    }
    Ok(value as u32)
}

/// Digits too long for u64 are still out of range, not malformed.
fn classify(digits: &str, radix: u32) -> ValueError {
    let digits = digits.strip_prefix('-').unwrap_or(digits);
    if !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix)) {
        ValueError::OutOfRange
    } else {
        ValueError::Malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_literal_form() {
        assert_eq!(parse_value("42"), Ok(42));
        assert_eq!(parse_value("0x1F"), Ok(0x1F));
        assert_eq!(parse_value("0xFFFFFFFF"), Ok(u32::MAX));
        assert_eq!(parse_value("0x10u"), Ok(16));
        assert_eq!(parse_value("7u"), Ok(7));
        assert_eq!(parse_value("1.5f"), Ok(0x3FC0_0000));
        assert_eq!(parse_value("2.0"), Ok(2.0f32.to_bits()));
        assert_eq!(parse_value("2f"), Ok(2.0f32.to_bits()));
        assert_eq!(parse_value("-0.5f"), Ok((-0.5f32).to_bits()));
    }

    #[test]
    fn negative_decimals_are_twos_complement() {
        assert_eq!(parse_value("-1"), Ok(u32::MAX));
        assert_eq!(parse_value("-2147483648"), Ok(0x8000_0000));
        assert_eq!(parse_value("-2147483649"), Err(ValueError::OutOfRange));
    }

    #[test]
    fn range_and_syntax_errors() {
        assert_eq!(parse_value("4294967296"), Err(ValueError::OutOfRange));
        assert_eq!(parse_value("0x100000000"), Err(ValueError::OutOfRange));
        assert_eq!(parse_value("99999999999999999999999"), Err(ValueError::OutOfRange));
        assert_eq!(parse_value("12abc"), Err(ValueError::Malformed));
        assert_eq!(parse_value("0x"), Err(ValueError::Malformed));
        assert_eq!(parse_value("abc"), Err(ValueError::Malformed));
        assert_eq!(
            ValueError::OutOfRange.to_string(),
            "Values are limited to 32 bits."
        );
    }
}
