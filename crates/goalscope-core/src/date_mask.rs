//! Manual deadline entry in the `DD:MM:YYYY HH:MM` mask.
//!
//! Typing only ever feeds digits; separators are inserted by the mask.
//! A deadline is committed only when the whole mask parses to a real
//! calendar date and time, so half-typed input never disturbs it.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Number of digits in a complete mask.
pub const MASK_DIGITS: usize = 12;

pub const MASK_PLACEHOLDER: &str = "ДД:ММ:ГГГГ ЧЧ:ММ";

/// Lay out up to twelve digits into the mask, inserting separators after
/// the day, month, year and hour groups.
pub fn format_digits(digits: &str) -> String {
    let mut out = String::with_capacity(16);
    for (i, c) in digits
        .chars()
        .filter(char::is_ascii_digit)
        .take(MASK_DIGITS)
        .enumerate()
    {
        out.push(c);
        match i {
            1 | 3 => out.push(':'),
            7 => out.push(' '),
            9 => out.push(':'),
            _ => {}
        }
    }
    out
}

/// Re-mask arbitrary typed text, keeping only its digits.
pub fn normalize_input(raw: &str) -> String {
    format_digits(raw)
}

/// Drop the last digit (not the last character) and re-mask.
pub fn backspace(text: &str) -> String {
    let mut digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.pop();
    format_digits(&digits)
}

/// Parse a complete mask. Returns `None` for partial input, out-of-range
/// fields, or dates that do not exist on the calendar.
pub fn parse(text: &str) -> Option<NaiveDateTime> {
    let bytes = text.as_bytes();
    if bytes.len() != 16 {
        return None;
    }
    let separators = [(2, b':'), (5, b':'), (10, b' '), (13, b':')];
    if separators.iter().any(|&(i, sep)| bytes[i] != sep) {
        return None;
    }
    let field = |range: std::ops::Range<usize>| -> Option<u32> {
        let s = text.get(range)?;
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    };
    let day = field(0..2)?;
    let month = field(3..5)?;
    let year = field(6..10)?;
    let hour = field(11..13)?;
    let minute = field(14..16)?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(hour, minute, 0)
}

/// Render a date-time into the mask. `parse(&format(dt))` yields `dt` for any
/// minute-aligned value with a four-digit year.
pub fn format(dt: NaiveDateTime) -> String {
    format!(
        "{:02}:{:02}:{:04} {:02}:{:02}",
        dt.day(),
        dt.month(),
        dt.year(),
        dt.hour(),
        dt.minute()
    )
}

/// Text field bound to a committed deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedDateInput {
    text: String,
    committed: NaiveDateTime,
}

impl MaskedDateInput {
    pub fn new(initial: NaiveDateTime) -> Self {
        Self {
            text: String::new(),
            committed: initial,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn committed(&self) -> NaiveDateTime {
        self.committed
    }

    /// Replace the field text. Returns the new deadline when it committed.
    pub fn set_text(&mut self, raw: &str) -> Option<NaiveDateTime> {
        self.text = normalize_input(raw);
        self.try_commit()
    }

    pub fn push_char(&mut self, c: char) -> Option<NaiveDateTime> {
        if !c.is_ascii_digit() {
            return None;
        }
        let mut raw = self.text.clone();
        raw.push(c);
        self.set_text(&raw)
    }

    pub fn backspace(&mut self) -> Option<NaiveDateTime> {
        if self.text.is_empty() {
            return None;
        }
        self.text = backspace(&self.text);
        self.try_commit()
    }

    /// Set from a picker: the text mirrors the chosen value.
    pub fn pick(&mut self, dt: NaiveDateTime) {
        self.committed = dt;
        self.text = format(dt);
    }

    fn try_commit(&mut self) -> Option<NaiveDateTime> {
        let parsed = parse(&self.text)?;
        self.committed = parsed;
        Some(parsed)
    }
}
