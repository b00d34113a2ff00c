//! Wall clock for the keypad display
//!
//! The clock task offers new display text once a second through a
//! [`tokio::sync::watch`] channel. The channel holds a single value, so an
//! offer the master has not picked up yet is simply replaced and the clock
//! never waits on the master.

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Two lines of display text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenText {
    pub line0: String,
    pub line1: String,
}

impl ScreenText {
    pub fn new(line0: impl Into<String>, line1: impl Into<String>) -> Self {
        Self {
            line0: line0.into(),
            line1: line1.into(),
        }
    }
}

/// Date on line 0 as `MON 02 JAN`, time on line 1 as `15:04:05`
pub fn format_clock<Tz>(at: &DateTime<Tz>) -> ScreenText
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ScreenText {
        line0: at.format("%a %d %b").to_string().to_uppercase(),
        line1: at.format("%H:%M:%S").to_string(),
    }
}

/// Create the display handoff, starting out with nothing pending
pub fn display_channel() -> (watch::Sender<ScreenText>, watch::Receiver<ScreenText>) {
    watch::channel(ScreenText::default())
}

/// Offer the local time once a second until the receiver goes away
pub async fn run_clock(tx: watch::Sender<ScreenText>) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if tx.send(format_clock(&Local::now())).is_err() {
            debug!("Display receiver dropped, stopping clock");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 15, 4, 5).unwrap();
        let text = format_clock(&at);
        assert_eq!(text.line0, "TUE 02 JAN");
        assert_eq!(text.line1, "15:04:05");
    }

    #[test]
    fn test_format_pads_day() {
        let at = Utc.with_ymd_and_hms(2023, 12, 9, 0, 0, 9).unwrap();
        let text = format_clock(&at);
        assert_eq!(text.line0, "SAT 09 DEC");
        assert_eq!(text.line1, "00:00:09");
    }

    #[test]
    fn test_unread_offer_is_replaced() {
        let (tx, mut rx) = display_channel();
        assert!(!rx.has_changed().unwrap());

        tx.send(ScreenText::new("A", "1")).unwrap();
        tx.send(ScreenText::new("B", "2")).unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ScreenText::new("B", "2"));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_offers_and_stops() {
        let (tx, mut rx) = display_channel();
        let clock = tokio::spawn(run_clock(tx));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().line1.len(), 8);

        tokio::time::advance(Duration::from_millis(3500)).await;
        rx.changed().await.unwrap();

        drop(rx);
        tokio::time::advance(Duration::from_secs(2)).await;
        clock.await.unwrap();
    }
}
