//! Источник времени для кэша и координатора правок
//!
//! В браузере время берётся из `js_sys::Date`, таймеры - `gloo_timers`.
//! Тесты подставляют часы на виртуальном времени tokio.

use chrono::{DateTime, TimeZone, Utc};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::time::Duration;

pub trait Clock {
    /// Текущее время
    fn now(&self) -> DateTime<Utc>;

    /// Таймер; отмена - через drop/abort возвращённого future
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Часы браузера
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = js_sys::Date::now() as i64;
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(Utc::now)
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        gloo_timers::future::sleep(duration).boxed_local()
    }
}
