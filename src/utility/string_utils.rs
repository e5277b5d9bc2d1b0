//! # StringUtils
//! This module contains utility functions around string handling that are used in the project.

use core::fmt::Write;
use heapless::String;

/// Longest text we ever put on a key, `"12:59 pm"`
pub const TIME_TEXT_CAPACITY: usize = 8;

/// Text formatting for the key face
pub struct StringUtils;

impl StringUtils {
    /// Converts a 24-hour hour (0-23) to the hour shown on a 12-hour clock and whether it is pm.
    /// Midnight and noon both show as 12.
    pub const fn to_twelve_hour(hour: u8) -> (u8, bool) {
        let pm = hour >= 12;
        let shown = match hour {
            0 | 12 => 12,
            13..=23 => hour - 12,
            _ => hour,
        };
        (shown, pm)
    }

    /// This function formats the alarm time for the key face.
    /// The output is `"H:MM am"` / `"H:MM pm"`, one example being `"7:05 am"`,
    /// or `"HH:MM"` in military time, one example being `"07:05"`.
    pub fn format_alarm_time(hour: u8, minute: u8, military_time: bool) -> String<TIME_TEXT_CAPACITY> {
        let mut s: String<TIME_TEXT_CAPACITY> = String::new();
        if military_time {
            let _ = write!(s, "{hour:02}:{minute:02}");
        } else {
            let (shown, pm) = Self::to_twelve_hour(hour);
            let _ = write!(s, "{}:{:02} {}", shown, minute, if pm { "pm" } else { "am" });
        }
        s
    }
}
