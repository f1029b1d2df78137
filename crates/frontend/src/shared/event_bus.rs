//! Шина событий данных
//!
//! Независимые части UI (дашборд, список паллет, диалоги) узнают об
//! инвалидации и изменениях без прямых вызовов друг друга и без опроса.

use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Имена событий
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    CacheInvalidated,
    DataUpdated,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::CacheInvalidated => "cache-invalidated",
            EventName::DataUpdated => "data-updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataEvent {
    /// Кэш источника очищен - перечитать данные
    CacheInvalidated { source: String },
    /// Успешная мутация; подписчик может подправить своё представление сам
    DataUpdated { source: String, payload: Value },
}

impl DataEvent {
    pub fn name(&self) -> EventName {
        match self {
            DataEvent::CacheInvalidated { .. } => EventName::CacheInvalidated,
            DataEvent::DataUpdated { .. } => EventName::DataUpdated,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            DataEvent::CacheInvalidated { source } | DataEvent::DataUpdated { source, .. } => {
                source
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Rc<dyn Fn(&DataEvent)>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(SubscriptionId, EventName, Handler)>,
}

/// Шина событий; клоны разделяют одних и тех же подписчиков
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Rc<RefCell<Subscribers>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, name: EventName, handler: impl Fn(&DataEvent) + 'static) -> SubscriptionId {
        let mut subs = self.subscribers.borrow_mut();
        let id = SubscriptionId(subs.next_id);
        subs.next_id += 1;
        let handler: Handler = Rc::new(handler);
        subs.handlers.push((id, name, handler));
        id
    }

    pub fn off(&self, id: SubscriptionId) {
        self.subscribers
            .borrow_mut()
            .handlers
            .retain(|(sub_id, _, _)| *sub_id != id);
    }

    /// Разослать событие. Обработчики вызываются вне заимствования,
    /// поэтому могут подписываться, отписываться и публиковать сами.
    pub fn emit(&self, event: DataEvent) {
        let name = event.name();
        let handlers: Vec<Handler> = self
            .subscribers
            .borrow()
            .handlers
            .iter()
            .filter(|(_, n, _)| *n == name)
            .map(|(_, _, h)| Rc::clone(h))
            .collect();

        log::debug!(
            "[event-bus] {} source='{}' -> {} handler(s)",
            name.as_str(),
            event.source(),
            handlers.len()
        );
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().handlers.len()
    }

    /// Отписать всех (сброс между тестами)
    pub fn clear(&self) {
        self.subscribers.borrow_mut().handlers.clear();
    }
}
