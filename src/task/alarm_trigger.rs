//! # Alarm Trigger
//! This module decides when an alarm sounds next and what a key press does to the schedule.
//!
//! Trigger times are epoch milliseconds computed from the wall clock time of the alarm in the local
//! time zone. A time that is not in the future any more is scheduled for tomorrow, so a freshly
//! computed trigger is always strictly ahead of now.
use crate::state::AlarmSettings;
use chrono::{DateTime, NaiveDate, NaiveTime, Offset, TimeZone};
use tracing::info;

/// An alarm is allowed to start this long after its trigger time
pub const TRIGGER_WINDOW_MS: i64 = 60_000;

/// One day
pub const DAY_MS: i64 = 86_400_000;

/// Checks if the trigger time has come and is not older than the trigger window
pub const fn is_due(trigger: i64, now_ms: i64) -> bool {
    trigger <= now_ms && trigger > now_ms - TRIGGER_WINDOW_MS
}

/// The next moment the wall clock shows `hour:minute`, today if that is still ahead, else tomorrow
pub fn next_trigger<Tz: TimeZone>(now: &DateTime<Tz>, hour: u8, minute: u8) -> i64 {
    let today = now.date_naive();
    let trigger = alarm_on_day(now, today, hour, minute);
    if trigger > now.timestamp_millis() {
        return trigger;
    }
    today.succ_opt().map_or(trigger + DAY_MS, |tomorrow| {
        alarm_on_day(now, tomorrow, hour, minute)
    })
}

/// The alarm time on the given day
fn alarm_on_day<Tz: TimeZone>(now: &DateTime<Tz>, day: NaiveDate, hour: u8, minute: u8) -> i64 {
    let time = NaiveTime::from_hms_opt(u32::from(hour), u32::from(minute), 0).unwrap_or_default();
    let local = day.and_time(time);
    match now.timezone().from_local_datetime(&local).earliest() {
        Some(at) => at.timestamp_millis(),
        // the clock skips this time when daylight saving starts, keep the offset we are at now
        None => {
            let offset_ms = i64::from(now.offset().fix().local_minus_utc()) * 1000;
            local.and_utc().timestamp_millis() - offset_ms
        }
    }
}

/// Recompute the trigger from the alarm time
fn schedule<Tz: TimeZone>(settings: &mut AlarmSettings, now: &DateTime<Tz>) {
    let trigger = next_trigger(now, settings.hour(), settings.minute());
    info!(
        "Alarm scheduled for {:02}:{:02} at {}",
        settings.hour(),
        settings.minute(),
        trigger
    );
    settings.trigger_timestamp = Some(trigger);
}

/// A press while the alarm rings: disarm and move the trigger a day ahead
pub fn dismiss(settings: &mut AlarmSettings) {
    settings.enabled = false;
    settings.trigger_timestamp = settings.trigger_timestamp.map(|trigger| trigger + DAY_MS);
    info!("Alarm dismissed");
}

/// A press while the alarm is armed: push the alarm time back by the snooze increment.
/// Running past the full hour wraps the minute and disarms the alarm.
pub fn snooze<Tz: TimeZone>(settings: &mut AlarmSettings, now: &DateTime<Tz>) {
    let minute = u32::from(settings.minute()).saturating_add(settings.snooze_minutes());
    settings.minute = u8::try_from(minute % 60).ok();
    if minute > 59 {
        settings.enabled = false;
        info!("Snooze ran past the full hour, alarm disarmed");
    } else {
        schedule(settings, now);
    }
}

/// A press while the alarm is not armed: arm it
pub fn arm<Tz: TimeZone>(settings: &mut AlarmSettings, now: &DateTime<Tz>) {
    settings.enabled = true;
    settings.minute.get_or_insert(0);
    schedule(settings, now);
}
