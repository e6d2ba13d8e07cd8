//! NUMERIC values carried as exact decimal text.
//!
//! Both backends read and write NUMERIC in the binary wire format through
//! [`PgNumeric`], so the server's display scale survives: `0.10::numeric(12,2)`
//! reads back as `0.10`, never `0.1` or `0.1000`.

use bigdecimal::BigDecimal;
use bytes::BufMut;
use std::error::Error;
use std::fmt::Write as _;
use std::str::FromStr;

pub(crate) type BoxError = Box<dyn Error + Sync + Send>;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// A NUMERIC value carried as its decimal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PgNumeric(pub String);

impl PgNumeric {
    /// Decodes the binary NUMERIC format: ndigits, weight, sign, dscale, then
    /// `ndigits` base-10000 digits, all big-endian 16-bit.
    pub(crate) fn from_binary(raw: &[u8]) -> Result<Self, BoxError> {
        let mut buf = raw;
        let ndigits = read_i16(&mut buf)?;
        let weight = read_i16(&mut buf)? as i32;
        let sign = read_u16(&mut buf)?;
        let dscale = read_u16(&mut buf)? as usize;

        match sign {
            NUMERIC_NAN => return Ok(Self("NaN".to_string())),
            NUMERIC_PINF => return Ok(Self("Infinity".to_string())),
            NUMERIC_NINF => return Ok(Self("-Infinity".to_string())),
            NUMERIC_POS | NUMERIC_NEG => {}
            other => return Err(format!("invalid numeric sign: {other:#06x}").into()),
        }

        let digits = (0..ndigits.max(0))
            .map(|_| read_i16(&mut buf))
            .collect::<Result<Vec<_>, _>>()?;
        let digit = |i: i32| -> i16 {
            usize::try_from(i)
                .ok()
                .and_then(|i| digits.get(i).copied())
                .unwrap_or(0)
        };

        let mut text = String::new();
        if sign == NUMERIC_NEG {
            text.push('-');
        }

        if weight < 0 {
            text.push('0');
        } else {
            for i in 0..=weight {
                if i == 0 {
                    write!(text, "{}", digit(i))?;
                } else {
                    write!(text, "{:04}", digit(i))?;
                }
            }
        }

        if dscale > 0 {
            let mut fraction = String::with_capacity(dscale + 4);
            let mut i = weight + 1;
            while fraction.len() < dscale {
                write!(fraction, "{:04}", digit(i))?;
                i += 1;
            }
            fraction.truncate(dscale);
            text.push('.');
            text.push_str(&fraction);
        }

        Ok(Self(text))
    }

    /// Encodes the decimal text in the binary NUMERIC format.
    pub(crate) fn write_binary<B: BufMut>(&self, out: &mut B) -> Result<(), BoxError> {
        let decimal = BigDecimal::from_str(self.0.trim())?;
        let (unscaled, exponent) = decimal.as_bigint_and_exponent();

        let unscaled = unscaled.to_string();
        let negative = unscaled.starts_with('-');
        let mut digits = unscaled.trim_start_matches('-').to_string();

        let scale = if exponent < 0 {
            digits.push_str(&"0".repeat(exponent.unsigned_abs() as usize));
            0
        } else {
            exponent as usize
        };
        if digits.len() <= scale {
            digits = format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits);
        }

        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        let int_padded = format!("{}{}", "0".repeat((4 - int_part.len() % 4) % 4), int_part);
        let frac_padded = format!("{}{}", frac_part, "0".repeat((4 - frac_part.len() % 4) % 4));

        let mut groups: Vec<i16> = int_padded
            .as_bytes()
            .chunks(4)
            .chain(frac_padded.as_bytes().chunks(4))
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(0i16, |acc, b| acc * 10 + i16::from(b - b'0'))
            })
            .collect();
        let mut weight = (int_padded.len() / 4) as i16 - 1;

        let leading_zeros = groups.iter().take_while(|g| **g == 0).count();
        groups.drain(..leading_zeros);
        weight -= leading_zeros as i16;
        while groups.last() == Some(&0) {
            groups.pop();
        }
        if groups.is_empty() {
            weight = 0;
        }

        let sign = if negative && !groups.is_empty() {
            NUMERIC_NEG
        } else {
            NUMERIC_POS
        };

        out.put_i16(groups.len() as i16);
        out.put_i16(weight);
        out.put_u16(sign);
        out.put_u16(scale as u16);
        for group in groups {
            out.put_i16(group);
        }
        Ok(())
    }
}

fn read_u16(buf: &mut &[u8]) -> Result<u16, BoxError> {
    if buf.len() < 2 {
        return Err("invalid numeric: unexpected end of buffer".into());
    }
    let (head, rest) = buf.split_at(2);
    *buf = rest;
    Ok(u16::from_be_bytes([head[0], head[1]]))
}

fn read_i16(buf: &mut &[u8]) -> Result<i16, BoxError> {
    read_u16(buf).map(|v| v as i16)
}
