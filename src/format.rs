//! Text rendering of tag values, with an optional format specifier.
//!
//! Specifiers follow the familiar numeric (`000`, `#,##0.00`, `N2`, `X8`) and
//! date/time (`yyyy-MM-dd`, `HH:mm`, `G`, `o`) conventions, rendered with
//! invariant culture settings: `.` as decimal point, `,` as group separator,
//! English month and day names.

use crate::error::{Result, TagError};
use crate::value::TagValue;
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Maximum scale a `Decimal` can carry
const MAX_DECIMAL_SCALE: usize = 28;

/// Largest precision accepted by a standard numeric specifier such as `F99`
pub const MAX_PRECISION: usize = 99;

/// Largest power of ten a single `Decimal` multiplication can take
const MAX_POWER_STEP: u32 = 18;

/// Renders a value as text. An empty specifier yields the value's default text.
///
/// # Errors
///
/// Returns `TagError::UnsupportedFormat` if the value kind has no rule for the
/// specifier, e.g. a string or boolean with a non-empty format.
pub fn format_object(value: &TagValue, spec: &str) -> Result<String> {
    if spec.is_empty() {
        return Ok(default_text(value));
    }

    let unsupported = || TagError::UnsupportedFormat {
        kind: value.kind(),
        format: spec.to_string(),
    };

    match value {
        TagValue::Integer(i) => format_number(Number::Integer(*i), spec).ok_or_else(unsupported),
        TagValue::Double(f) => format_number(Number::Double(*f), spec).ok_or_else(unsupported),
        TagValue::Decimal(d) => format_number(Number::Decimal(*d), spec).ok_or_else(unsupported),
        TagValue::DateTime(dt) => {
            format_temporal(Some(dt.date()), Some(dt.time()), spec).ok_or_else(unsupported)
        }
        TagValue::Date(d) => format_temporal(Some(*d), None, spec).ok_or_else(unsupported),
        TagValue::Time(t) => format_temporal(None, Some(*t), spec).ok_or_else(unsupported),
        TagValue::Opaque(v) => v.format(spec).ok_or_else(unsupported),
        TagValue::Boolean(_) | TagValue::String(_) => Err(unsupported()),
    }
}

/// Default text of a value, used when no format specifier is given
pub fn default_text(value: &TagValue) -> String {
    match value {
        TagValue::Integer(i) => i.to_string(),
        TagValue::Double(f) => double_text(*f),
        TagValue::Decimal(d) => d.to_string(),
        TagValue::DateTime(dt) => dt.format("%m/%d/%Y %H:%M:%S").to_string(),
        TagValue::Date(d) => d.format("%m/%d/%Y").to_string(),
        TagValue::Time(t) => time_text(*t),
        TagValue::Boolean(true) => "True".to_string(),
        TagValue::Boolean(false) => "False".to_string(),
        TagValue::String(s) => s.clone(),
        TagValue::Opaque(v) => v.to_text(),
    }
}

fn time_text(time: NaiveTime) -> String {
    let base = time.format("%H:%M:%S").to_string();
    match time.nanosecond() % 1_000_000_000 {
        0 => base,
        nanos => format!("{base}.{:07}", nanos / 100),
    }
}

/// Shortest round-trip text; exponent notation outside `1e-4..1e15`
fn double_text(f: f64) -> String {
    if let Some(special) = non_finite(f) {
        return special.to_string();
    }

    let exponent_form = format!("{f:e}");
    let Some((mantissa, exp)) = exponent_form.split_once('e') else {
        return f.to_string();
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if (-4..15).contains(&exp) {
        f.to_string()
    } else {
        format!("{mantissa}E{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs())
    }
}

fn non_finite(f: f64) -> Option<&'static str> {
    if f.is_nan() {
        Some("NaN")
    } else if f.is_infinite() {
        Some(if f > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Integer(i64),
    Double(f64),
    Decimal(Decimal),
}

/// A number in the most exact representation available for digit generation
#[derive(Debug, Clone, Copy)]
enum Exact {
    Dec(Decimal),
    Float(f64),
}

impl Exact {
    fn from_number(number: Number) -> Self {
        match number {
            Number::Integer(i) => Self::Dec(Decimal::from(i)),
            Number::Decimal(d) => Self::Dec(d),
            Number::Double(f) => Decimal::from_str(&f.to_string())
                .map(Self::Dec)
                .unwrap_or(Self::Float(f)),
        }
    }

    fn is_negative(self) -> bool {
        match self {
            Self::Dec(d) => d.is_sign_negative() && !d.is_zero(),
            Self::Float(f) => f < 0.0,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Dec(d) => d.is_zero(),
            Self::Float(f) => f == 0.0,
        }
    }

    fn abs(self) -> Self {
        match self {
            Self::Dec(d) => Self::Dec(d.abs()),
            Self::Float(f) => Self::Float(f.abs()),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Dec(d) => d.to_f64().unwrap_or(f64::NAN),
            Self::Float(f) => f,
        }
    }

    /// Multiplies by `10^power`; a negative power divides
    fn scale(self, power: i32) -> Self {
        if power == 0 {
            return self;
        }
        match self {
            Self::Dec(d) => {
                let mut scaled = Some(d);
                let mut remaining = power.unsigned_abs();
                while remaining > 0 {
                    let step = remaining.min(MAX_POWER_STEP);
                    let factor = Decimal::from(10i64.pow(step));
                    scaled = scaled.and_then(|v| {
                        if power > 0 {
                            v.checked_mul(factor)
                        } else {
                            v.checked_div(factor)
                        }
                    });
                    remaining -= step;
                }
                scaled
                    .map(Self::Dec)
                    .unwrap_or_else(|| Self::Float(d.to_f64().unwrap_or(0.0) * 10f64.powi(power)))
            }
            Self::Float(f) => Self::Float(f * 10f64.powi(power)),
        }
    }

    /// Integer and fraction digits of the absolute value, rounded half away from zero
    fn fixed_parts(self, decimals: usize) -> (String, String) {
        let text = match self.abs() {
            Self::Dec(d) => {
                let dp = decimals.min(MAX_DECIMAL_SCALE);
                let rounded =
                    d.round_dp_with_strategy(dp as u32, RoundingStrategy::MidpointAwayFromZero);
                format!("{rounded:.dp$}")
            }
            Self::Float(f) => format!("{f:.decimals$}"),
        };

        let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
        let mut frac = frac_part.to_string();
        while frac.len() < decimals {
            frac.push('0');
        }
        (int_part.to_string(), frac)
    }
}

fn format_number(number: Number, spec: &str) -> Option<String> {
    let exact = Exact::from_number(number);
    if let Number::Double(f) = number
        && let Some(special) = non_finite(f)
    {
        return Some(special.to_string());
    }

    match standard_spec(spec) {
        Some((letter, precision)) => format_standard_number(number, exact, letter, precision),
        None => Some(format_custom_number(exact, spec)),
    }
}

/// Splits a standard specifier (`N2`, `x8`, `F`) into its letter and precision
fn standard_spec(spec: &str) -> Option<(char, Option<usize>)> {
    let mut chars = spec.chars();
    let letter = chars.next().filter(char::is_ascii_alphabetic)?;
    let digits = chars.as_str();

    if digits.is_empty() {
        return Some((letter, None));
    }
    if digits.len() <= 9 && digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.parse().ok().map(|p| (letter, Some(p)));
    }
    None
}

fn format_standard_number(
    number: Number,
    exact: Exact,
    letter: char,
    precision: Option<usize>,
) -> Option<String> {
    if precision.is_some_and(|p| p > MAX_PRECISION) {
        return None;
    }
    let negative = exact.is_negative();

    match letter.to_ascii_uppercase() {
        'D' => {
            let Number::Integer(i) = number else {
                return None;
            };
            let digits = format!("{:0>width$}", i.unsigned_abs(), width = precision.unwrap_or(0));
            Some(signed(i < 0, digits))
        }
        'X' => {
            let Number::Integer(i) = number else {
                return None;
            };
            let width = precision.unwrap_or(0);
            Some(if letter.is_ascii_uppercase() {
                format!("{i:0width$X}")
            } else {
                format!("{i:0width$x}")
            })
        }
        'F' => {
            let (int_digits, frac) = exact.fixed_parts(precision.unwrap_or(2));
            Some(signed_if_nonzero(negative, join_parts(int_digits, &frac)))
        }
        'N' => {
            let (int_digits, frac) = exact.fixed_parts(precision.unwrap_or(2));
            Some(signed_if_nonzero(
                negative,
                join_parts(group_thousands(&int_digits), &frac),
            ))
        }
        'P' => {
            let (int_digits, frac) = exact.scale(2).fixed_parts(precision.unwrap_or(2));
            let body = format!("{} %", join_parts(group_thousands(&int_digits), &frac));
            Some(signed_if_nonzero(negative, body))
        }
        'C' => {
            let (int_digits, frac) = exact.fixed_parts(precision.unwrap_or(2));
            let body = format!("¤{}", join_parts(group_thousands(&int_digits), &frac));
            Some(if negative && has_nonzero_digit(&body) {
                format!("({body})")
            } else {
                body
            })
        }
        'E' => {
            let body = exponential(exact.as_f64().abs(), precision.unwrap_or(6), letter, 3);
            Some(signed_if_nonzero(negative, body))
        }
        'G' => match precision {
            None | Some(0) => Some(default_text(&number.into())),
            Some(p) => Some(signed_if_nonzero(
                negative,
                general(exact.as_f64().abs(), p, letter),
            )),
        },
        'R' => Some(default_text(&number.into())),
        _ => None,
    }
}

impl From<Number> for TagValue {
    fn from(number: Number) -> Self {
        match number {
            Number::Integer(i) => TagValue::Integer(i),
            Number::Double(f) => TagValue::Double(f),
            Number::Decimal(d) => TagValue::Decimal(d),
        }
    }
}

fn join_parts(int_digits: String, frac: &str) -> String {
    if frac.is_empty() {
        int_digits
    } else {
        format!("{int_digits}.{frac}")
    }
}

fn signed(negative: bool, body: String) -> String {
    if negative { format!("-{body}") } else { body }
}

fn signed_if_nonzero(negative: bool, body: String) -> String {
    signed(negative && has_nonzero_digit(&body), body)
}

fn has_nonzero_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit() && c != '0')
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// `d.ddddE+ddd` with the given mantissa precision and minimum exponent digits
fn exponential(value: f64, precision: usize, letter: char, exp_digits: usize) -> String {
    let text = format!("{value:.precision$e}");
    let (mantissa, exp) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let e = if letter.is_ascii_uppercase() { 'E' } else { 'e' };
    format!(
        "{mantissa}{e}{}{:0width$}",
        if exp < 0 { '-' } else { '+' },
        exp.abs(),
        width = exp_digits
    )
}

/// `G<n>`: `n` significant digits, positional unless the exponent is out of range
fn general(value: f64, significant: usize, letter: char) -> String {
    let text = format!("{value:.prec$e}", prec = significant - 1);
    let (mantissa, exp) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= significant as i32 {
        let mantissa = trim_fraction(mantissa);
        let e = if letter.is_ascii_uppercase() { 'E' } else { 'e' };
        format!("{mantissa}{e}{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs())
    } else {
        let rounded: f64 = text.parse().unwrap_or(value);
        rounded.to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NumToken {
    Zero,
    Hash,
    Point,
    Comma,
    Percent,
    PerMille,
    Literal(String),
}

/// Splits a custom numeric specifier into `;`-separated sections
fn split_sections(spec: &str) -> Vec<Vec<NumToken>> {
    let mut sections = Vec::new();
    let mut tokens = Vec::new();
    let mut chars = spec.chars();

    while let Some(c) = chars.next() {
        match c {
            '0' => tokens.push(NumToken::Zero),
            '#' => tokens.push(NumToken::Hash),
            '.' => tokens.push(NumToken::Point),
            ',' => tokens.push(NumToken::Comma),
            '%' => tokens.push(NumToken::Percent),
            '‰' => tokens.push(NumToken::PerMille),
            ';' => sections.push(std::mem::take(&mut tokens)),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    tokens.push(NumToken::Literal(escaped.to_string()));
                }
            }
            '\'' | '"' => {
                let literal: String = chars.by_ref().take_while(|&q| q != c).collect();
                tokens.push(NumToken::Literal(literal));
            }
            other => tokens.push(NumToken::Literal(other.to_string())),
        }
    }

    sections.push(tokens);
    sections
}

fn format_custom_number(exact: Exact, spec: &str) -> String {
    let sections = split_sections(spec);
    let negative = exact.is_negative();

    let (tokens, auto_sign) = match sections.as_slice() {
        [_, _, zero, ..] if exact.is_zero() && !zero.is_empty() => (zero, false),
        [_, minus, ..] if negative && !minus.is_empty() => (minus, false),
        [first, ..] => (first, true),
        [] => return String::new(),
    };

    let body = render_custom(exact.abs(), tokens);
    if auto_sign {
        signed_if_nonzero(negative, body)
    } else {
        body
    }
}

fn render_custom(value: Exact, tokens: &[NumToken]) -> String {
    let point = tokens.iter().position(|t| *t == NumToken::Point);
    let (int_tokens, frac_tokens) = match point {
        Some(index) => (&tokens[..index], &tokens[index + 1..]),
        None => (tokens, &[][..]),
    };

    let is_digit = |t: &NumToken| matches!(t, NumToken::Zero | NumToken::Hash);
    let int_placeholders: Vec<usize> = int_tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| is_digit(t))
        .map(|(index, _)| index)
        .collect();

    // Commas between integer placeholders group; commas after the last one scale by 1000
    let last_int_digit = int_placeholders.last().copied();
    let first_int_digit = int_placeholders.first().copied();
    let grouping = int_tokens.iter().enumerate().any(|(index, t)| {
        *t == NumToken::Comma
            && first_int_digit.is_some_and(|first| index > first)
            && last_int_digit.is_some_and(|last| index < last)
    });
    let scaling_commas = last_int_digit.map_or(0, |last| {
        int_tokens[last + 1..]
            .iter()
            .filter(|t| **t == NumToken::Comma)
            .count()
    });

    let mut power = -3 * scaling_commas as i32;
    for token in tokens {
        match token {
            NumToken::Percent => power += 2,
            NumToken::PerMille => power += 3,
            _ => {}
        }
    }
    let value = value.scale(power);

    let frac_digits: Vec<&NumToken> = frac_tokens.iter().filter(|t| is_digit(t)).collect();
    let min_frac = frac_digits
        .iter()
        .rposition(|t| **t == NumToken::Zero)
        .map_or(0, |index| index + 1);

    let (mut int_digits, mut frac) = value.fixed_parts(frac_digits.len());
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }

    if int_digits == "0" {
        int_digits.clear();
    }
    let min_int = int_placeholders
        .iter()
        .position(|&index| int_tokens[index] == NumToken::Zero)
        .map_or(0, |first_zero| int_placeholders.len() - first_zero);
    while int_digits.len() < min_int {
        int_digits.insert(0, '0');
    }
    if grouping {
        int_digits = group_thousands(&int_digits);
    }

    let mut out = String::new();
    if int_placeholders.is_empty() {
        render_literals(&mut out, int_tokens);
        out.push_str(&int_digits);
    } else {
        render_integer(&mut out, int_tokens, &int_placeholders, &int_digits, grouping);
    }

    if point.is_some() && !frac.is_empty() {
        out.push('.');
    }
    let mut frac_chars = frac.chars();
    for token in frac_tokens {
        match token {
            NumToken::Zero | NumToken::Hash => {
                if let Some(digit) = frac_chars.next() {
                    out.push(digit);
                }
            }
            other => render_literal(&mut out, other),
        }
    }

    out
}

/// Places integer digits right-aligned on the placeholders; surplus digits go to the first one
fn render_integer(
    out: &mut String,
    tokens: &[NumToken],
    placeholders: &[usize],
    digits: &str,
    grouping: bool,
) {
    let digits: Vec<char> = digits.chars().collect();
    let offset = digits.len() as isize - placeholders.len() as isize;
    let mut slot = 0isize;

    for token in tokens {
        match token {
            NumToken::Zero | NumToken::Hash => {
                if grouping {
                    if slot == 0 {
                        out.extend(digits.iter());
                    }
                } else if slot == 0 && offset > 0 {
                    out.extend(digits[..=offset as usize].iter());
                } else {
                    let position = slot + offset;
                    if position >= 0 {
                        out.push(digits[position as usize]);
                    }
                }
                slot += 1;
            }
            other => render_literal(out, other),
        }
    }
}

fn render_literals(out: &mut String, tokens: &[NumToken]) {
    for token in tokens {
        render_literal(out, token);
    }
}

fn render_literal(out: &mut String, token: &NumToken) {
    match token {
        NumToken::Percent => out.push('%'),
        NumToken::PerMille => out.push('‰'),
        NumToken::Literal(text) => out.push_str(text),
        NumToken::Zero | NumToken::Hash | NumToken::Point | NumToken::Comma => {}
    }
}

/// Expands a standard single-letter date/time specifier
fn standard_temporal(letter: char, date: bool, time: bool) -> Option<&'static str> {
    let pattern = match letter {
        'd' => "MM/dd/yyyy",
        'D' => "dddd, dd MMMM yyyy",
        'f' => "dddd, dd MMMM yyyy HH:mm",
        'F' | 'U' => "dddd, dd MMMM yyyy HH:mm:ss",
        'g' => "MM/dd/yyyy HH:mm",
        'G' => "MM/dd/yyyy HH:mm:ss",
        'M' | 'm' => "MMMM dd",
        'Y' | 'y' => "yyyy MMMM",
        't' => "HH:mm",
        'T' => "HH:mm:ss",
        's' => "yyyy'-'MM'-'dd'T'HH':'mm':'ss",
        'u' => "yyyy'-'MM'-'dd HH':'mm':'ss'Z'",
        'O' | 'o' => match (date, time) {
            (true, false) => "yyyy'-'MM'-'dd",
            (false, true) => "HH':'mm':'ss'.'fffffff",
            _ => "yyyy'-'MM'-'dd'T'HH':'mm':'ss'.'fffffff",
        },
        'R' | 'r' => match (date, time) {
            (true, false) => "ddd, dd MMM yyyy",
            (false, true) => "HH':'mm':'ss",
            _ => "ddd, dd MMM yyyy HH':'mm':'ss 'GMT'",
        },
        _ => return None,
    };
    Some(pattern)
}

/// Renders a date and/or time. `None` when the specifier needs a missing component.
fn format_temporal(date: Option<NaiveDate>, time: Option<NaiveTime>, spec: &str) -> Option<String> {
    let mut chars = spec.chars();
    let pattern = match (chars.next(), chars.next()) {
        (Some(letter), None) => standard_temporal(letter, date.is_some(), time.is_some())?,
        _ => spec,
    };

    let mut out = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut index = 0;

    while index < chars.len() {
        let c = chars[index];
        let run = chars[index..].iter().take_while(|&&other| other == c).count();

        match c {
            'y' => {
                let year = date?.year();
                match run {
                    1 => out.push_str(&(year % 100).to_string()),
                    2 => out.push_str(&format!("{:02}", year % 100)),
                    n => out.push_str(&format!("{year:0n$}")),
                }
            }
            'M' => {
                let month = date?.month();
                match run {
                    1 => out.push_str(&month.to_string()),
                    2 => out.push_str(&format!("{month:02}")),
                    3 => out.push_str(&MONTH_NAMES[month as usize - 1][..3]),
                    _ => out.push_str(MONTH_NAMES[month as usize - 1]),
                }
            }
            'd' => {
                let date = date?;
                let weekday = DAY_NAMES[date.weekday().num_days_from_monday() as usize];
                match run {
                    1 => out.push_str(&date.day().to_string()),
                    2 => out.push_str(&format!("{:02}", date.day())),
                    3 => out.push_str(&weekday[..3]),
                    _ => out.push_str(weekday),
                }
            }
            'g' => {
                date?;
                out.push_str("A.D.");
            }
            'H' => push_two(&mut out, time?.hour(), run),
            'h' => {
                let hour = match time?.hour() % 12 {
                    0 => 12,
                    h => h,
                };
                push_two(&mut out, hour, run);
            }
            'm' => push_two(&mut out, time?.minute(), run),
            's' => push_two(&mut out, time?.second(), run),
            'f' | 'F' => {
                let width = run.min(7);
                let fraction = format!("{:09}", time?.nanosecond() % 1_000_000_000);
                let digits = &fraction[..width];
                if c == 'f' {
                    out.push_str(digits);
                } else {
                    let trimmed = digits.trim_end_matches('0');
                    if trimmed.is_empty() && out.ends_with('.') {
                        out.pop();
                    }
                    out.push_str(trimmed);
                }
            }
            't' => {
                let pm = time?.hour() >= 12;
                out.push_str(match (run, pm) {
                    (1, false) => "A",
                    (1, true) => "P",
                    (_, false) => "AM",
                    (_, true) => "PM",
                });
            }
            'z' => out.push_str(match run {
                1 => "+0",
                2 => "+00",
                _ => "+00:00",
            }),
            'K' => {}
            '\'' | '"' => {
                let end = chars[index + 1..]
                    .iter()
                    .position(|&q| q == c)
                    .map_or(chars.len(), |p| index + 1 + p);
                out.extend(chars[index + 1..end].iter());
                index = (end + 1).min(chars.len());
                continue;
            }
            '\\' => {
                if let Some(&escaped) = chars.get(index + 1) {
                    out.push(escaped);
                }
                index += 2;
                continue;
            }
            '%' => {
                index += 1;
                continue;
            }
            other => {
                out.push(other);
                index += 1;
                continue;
            }
        }

        index += run;
    }

    Some(out)
}

fn push_two(out: &mut String, value: u32, run: usize) {
    if run == 1 {
        out.push_str(&value.to_string());
    } else {
        out.push_str(&format!("{value:02}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FormatValue;

    fn fmt(value: impl Into<TagValue>, spec: &str) -> String {
        format_object(&value.into(), spec).unwrap()
    }

    fn datetime() -> TagValue {
        TagValue::DateTime(
            NaiveDate::from_ymd_opt(2024, 11, 1)
                .unwrap()
                .and_hms_opt(12, 5, 9)
                .unwrap(),
        )
    }

    #[test]
    fn test_default_text() {
        assert_eq!(fmt(21, ""), "21");
        assert_eq!(fmt(10.5, ""), "10.5");
        assert_eq!(fmt(3.0, ""), "3");
        assert_eq!(fmt(1e20, ""), "1E+20");
        assert_eq!(fmt(1.5e-7, ""), "1.5E-07");
        assert_eq!(fmt(0.0001, ""), "0.0001");
        assert_eq!(fmt(0.00001, ""), "1E-05");
        assert_eq!(fmt(0.000015, ""), "1.5E-05");
        assert_eq!(fmt(f64::NAN, ""), "NaN");
        assert_eq!(fmt(Decimal::from_str("10.50").unwrap(), ""), "10.50");
        assert_eq!(fmt(true, ""), "True");
        assert_eq!(fmt("text", ""), "text");
        assert_eq!(format_object(&datetime(), "").unwrap(), "11/01/2024 12:05:09");
        assert_eq!(fmt(NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(), ""), "11/01/2024");
        assert_eq!(fmt(NaiveTime::from_hms_opt(12, 0, 0).unwrap(), ""), "12:00:00");
        assert_eq!(
            fmt(NaiveTime::from_hms_milli_opt(12, 0, 0, 500).unwrap(), ""),
            "12:00:00.5000000"
        );
    }

    #[test]
    fn test_custom_numeric_formats() {
        assert_eq!(fmt(21, "000"), "021");
        assert_eq!(fmt(10, "000"), "010");
        assert_eq!(fmt(1234, "00"), "1234");
        assert_eq!(fmt(-5, "000"), "-005");
        assert_eq!(fmt(1234567, "#,##0"), "1,234,567");
        assert_eq!(fmt(1234.5678, "#,##0.00"), "1,234.57");
        assert_eq!(fmt(0.5, "#.##"), ".5");
        assert_eq!(fmt(0.5, "0.##"), "0.5");
        assert_eq!(fmt(1, "0.##"), "1");
        assert_eq!(fmt(2.5, "0"), "3");
        assert_eq!(fmt(0.256, "0.0%"), "25.6%");
        assert_eq!(fmt(1_500_000, "0,,"), "2");
        assert_eq!(
            fmt(Decimal::from_str("2500000000000000000000").unwrap(), "0,,,,,,,"),
            "3"
        );
        assert_eq!(fmt(5551234, "###-####"), "555-1234");
        assert_eq!(fmt(42, "'#'0"), "#42");
        assert_eq!(fmt(42, r"\#0"), "#42");
    }

    #[test]
    fn test_custom_numeric_sections() {
        assert_eq!(fmt(5, "0;(0);zero"), "5");
        assert_eq!(fmt(-5, "0;(0);zero"), "(5)");
        assert_eq!(fmt(0, "0;(0);zero"), "zero");
        assert_eq!(fmt(-5, "0;"), "-5");
    }

    #[test]
    fn test_standard_numeric_formats() {
        assert_eq!(fmt(42, "D5"), "00042");
        assert_eq!(fmt(-42, "D5"), "-00042");
        assert_eq!(fmt(255, "X"), "FF");
        assert_eq!(fmt(255, "x4"), "00ff");
        assert_eq!(fmt(1234.567, "F2"), "1234.57");
        assert_eq!(fmt(1234.567, "F"), "1234.57");
        assert_eq!(fmt(1234567, "N0"), "1,234,567");
        assert_eq!(fmt(-1234.5, "N2"), "-1,234.50");
        assert_eq!(fmt(0.125, "P1"), "12.5 %");
        assert_eq!(fmt(1052.0329112756, "E2"), "1.05E+003");
        assert_eq!(fmt(1234, "C"), "¤1,234.00");
        assert_eq!(fmt(-1234, "C0"), "(¤1,234)");
        assert_eq!(fmt(12345.6789, "G"), "12345.6789");
        assert_eq!(fmt(123456, "G3"), "1.23E+05");
        assert_eq!(fmt(0.000123, "G3"), "0.000123");
        assert_eq!(fmt(0.0000123, "G3"), "1.23E-05");
        assert_eq!(fmt(Decimal::from_str("2.345").unwrap(), "F2"), "2.35");
    }

    #[test]
    fn test_standard_numeric_format_errors() {
        assert!(matches!(
            format_object(&TagValue::Double(1.5), "D2"),
            Err(TagError::UnsupportedFormat { kind: "Double", .. })
        ));
        assert!(matches!(
            format_object(&TagValue::Integer(1), "Z"),
            Err(TagError::UnsupportedFormat { .. })
        ));
        assert_eq!(fmt(1, "F99").len(), 101);
        for spec in ["F100", "D999999999", "N999999999"] {
            assert!(matches!(
                format_object(&TagValue::Integer(1), spec),
                Err(TagError::UnsupportedFormat { .. })
            ));
        }
    }

    #[test]
    fn test_datetime_formats() {
        let value = datetime();
        let f = |spec: &str| format_object(&value, spec).unwrap();

        assert_eq!(f("yyyy"), "2024");
        assert_eq!(f("MM"), "11");
        assert_eq!(f("yyyy*MM*dd"), "2024*11*01");
        assert_eq!(f("yyyy-MM-dd HH:mm:ss"), "2024-11-01 12:05:09");
        assert_eq!(f("dddd, MMMM d"), "Friday, November 1");
        assert_eq!(f("ddd MMM yy"), "Fri Nov 24");
        assert_eq!(f("h:mm tt"), "12:05 PM");
        assert_eq!(f("HH'h'mm"), "12h05");
        assert_eq!(f("%d"), "1");
        assert_eq!(f("d"), "11/01/2024");
        assert_eq!(f("G"), "11/01/2024 12:05:09");
        assert_eq!(f("s"), "2024-11-01T12:05:09");
        assert_eq!(f("o"), "2024-11-01T12:05:09.0000000");
        assert_eq!(f("HH:mm:ss.FFF"), "12:05:09");
        assert_eq!(f("HH:mm:ss.fff"), "12:05:09.000");
    }

    #[test]
    fn test_date_and_time_only_formats() {
        let date = TagValue::Date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert_eq!(format_object(&date, "dd/MM/yyyy").unwrap(), "07/03/2024");
        assert_eq!(format_object(&date, "o").unwrap(), "2024-03-07");
        assert!(matches!(
            format_object(&date, "HH:mm"),
            Err(TagError::UnsupportedFormat { kind: "Date", .. })
        ));

        let time = TagValue::Time(NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(format_object(&time, "HH:mm").unwrap(), "07:30");
        assert_eq!(format_object(&time, "t").unwrap(), "07:30");
        assert!(matches!(
            format_object(&time, "yyyy"),
            Err(TagError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_unsupported_kinds() {
        assert!(matches!(
            format_object(&TagValue::from("abc"), "000"),
            Err(TagError::UnsupportedFormat { kind: "String", .. })
        ));
        assert!(matches!(
            format_object(&TagValue::from(true), "x"),
            Err(TagError::UnsupportedFormat { kind: "Boolean", .. })
        ));
    }

    #[derive(Debug)]
    struct Celsius(f64);

    impl FormatValue for Celsius {
        fn to_text(&self) -> String {
            format!("{}°C", self.0)
        }

        fn format(&self, spec: &str) -> Option<String> {
            (spec == "F").then(|| format!("{}°F", self.0 * 9.0 / 5.0 + 32.0))
        }
    }

    #[test]
    fn test_opaque_values() {
        let value = TagValue::opaque(Celsius(100.0));
        assert_eq!(format_object(&value, "").unwrap(), "100°C");
        assert_eq!(format_object(&value, "F").unwrap(), "212°F");
        assert!(matches!(
            format_object(&value, "K"),
            Err(TagError::UnsupportedFormat { kind: "Opaque", .. })
        ));
    }
}
