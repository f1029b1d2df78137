//! Координатор оптимистичных правок строк таблицы
//!
//! Правка сразу применяется к строке в памяти (итоги пересчитываются
//! синхронно), а в сеть уходит через debounce: новая правка той же строки
//! отменяет ожидающий таймер, и в запросе уходит последний полный снимок
//! строки. При ошибке строка откатывается к последнему подтверждённому
//! сервером снимку.
//!
//! Статус строки: Idle → Saving → Success | Error → Idle (по таймеру).
//!
//! Перед применением правка проверяется синхронно (`Editable::check_edit`),
//! перед отправкой асинхронно (`EditValidator`). Отклонённая правка в сеть
//! не уходит.
//!
//! Каждая правка увеличивает версию строки. Ответ на запрос с устаревшей
//! версией отбрасывается: более новая правка уже в очереди и перешлёт
//! полный снимок сама.

use async_trait::async_trait;
use contracts::shared::errors::InventoryError;
use futures::future::{AbortHandle, Abortable};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::shared::cache_graph::CacheGraph;
use crate::shared::clock::Clock;
use crate::shared::config::ConsistencyConfig;

/// Строка, которую можно править
pub trait Editable: Clone + Serialize + 'static {
    /// Ключ строки (например, ID паллеты)
    fn entity_key(&self) -> String;

    /// Можно ли применить правку к подтверждённой версии `before`
    fn check_edit(&self, before: &Self) -> Result<(), InventoryError> {
        let _ = before;
        Ok(())
    }
}

/// Проверка снимка перед отправкой (например, по вместимости)
#[async_trait(?Send)]
pub trait EditValidator<T> {
    async fn check(&self, before: &T, after: &T) -> Result<(), InventoryError>;
}

/// Сервер для записи строк
#[async_trait(?Send)]
pub trait CommitEndpoint<T> {
    /// Полный снимок строки. Повтор того же снимка должен быть безопасен.
    /// `Some` - сервер вернул исправленную строку.
    async fn submit(&self, key: &str, snapshot: &T) -> Result<Option<T>, InventoryError>;

    async fn create(&self, entity: &T) -> Result<Option<T>, InventoryError>;

    async fn delete(&self, key: &str) -> Result<(), InventoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Saving,
    Success,
    Error,
}

/// Чем закончилась конкретная правка
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Записано на сервер
    Committed,
    /// Таймер отменён более новой правкой, запрос не отправлялся
    Superseded,
    /// Ответ пришёл для устаревшей версии и отброшен
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditTimings {
    pub debounce: Duration,
    pub success_decay: Duration,
    pub error_decay: Duration,
}

impl From<&ConsistencyConfig> for EditTimings {
    fn from(config: &ConsistencyConfig) -> Self {
        Self {
            debounce: config.debounce,
            success_decay: config.success_decay,
            error_decay: config.error_decay,
        }
    }
}

struct CoordinatorState<T> {
    rows: Vec<T>,
    /// Последний подтверждённый сервером снимок строки
    known_good: HashMap<String, T>,
    /// Статус строки и штамп его установки (отсутствие = Idle)
    statuses: HashMap<String, (EditState, u64)>,
    /// Ожидающие debounce-таймеры
    timers: HashMap<String, AbortHandle>,
    versions: HashMap<String, u64>,
    errors: HashMap<String, String>,
    /// Правки, чьи строки пропали из выборки сервера до отправки
    dropped: HashMap<String, (u64, InventoryError)>,
    next_stamp: u64,
}

impl<T: Editable> CoordinatorState<T> {
    fn position(&self, key: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.entity_key() == key)
    }

    fn set_status(&mut self, key: &str, status: EditState) -> u64 {
        self.next_stamp += 1;
        let stamp = self.next_stamp;
        if status == EditState::Idle {
            self.statuses.remove(key);
        } else {
            self.statuses.insert(key.to_string(), (status, stamp));
        }
        stamp
    }

    fn bump_version(&mut self, key: &str) -> u64 {
        let version = self.versions.entry(key.to_string()).or_insert(0);
        *version += 1;
        *version
    }

    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn cancel_timer(&mut self, key: &str) {
        if let Some(timer) = self.timers.remove(key) {
            timer.abort();
        }
    }

    fn fail(&mut self, key: &str, err: &InventoryError) -> u64 {
        self.errors.insert(key.to_string(), err.to_string());
        self.set_status(key, EditState::Error)
    }
}

pub struct EditCoordinator<T: Editable> {
    source: &'static str,
    state: Rc<RefCell<CoordinatorState<T>>>,
    endpoint: Rc<dyn CommitEndpoint<T>>,
    clock: Rc<dyn Clock>,
    timings: EditTimings,
    graph: Option<CacheGraph>,
    validator: Option<Rc<dyn EditValidator<T>>>,
}

impl<T: Editable> Clone for EditCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            state: Rc::clone(&self.state),
            endpoint: Rc::clone(&self.endpoint),
            clock: Rc::clone(&self.clock),
            timings: self.timings,
            graph: self.graph.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<T: Editable> EditCoordinator<T> {
    pub fn new(
        source: &'static str,
        rows: Vec<T>,
        endpoint: Rc<dyn CommitEndpoint<T>>,
        clock: Rc<dyn Clock>,
        timings: EditTimings,
    ) -> Self {
        let known_good = rows.iter().map(|r| (r.entity_key(), r.clone())).collect();
        Self {
            source,
            state: Rc::new(RefCell::new(CoordinatorState {
                rows,
                known_good,
                statuses: HashMap::new(),
                timers: HashMap::new(),
                versions: HashMap::new(),
                errors: HashMap::new(),
                dropped: HashMap::new(),
                next_stamp: 0,
            })),
            endpoint,
            clock,
            timings,
            graph: None,
            validator: None,
        }
    }

    /// После успешной записи: `notify_updated` и сброс кэшей источника
    pub fn with_graph(mut self, graph: CacheGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_validator(mut self, validator: Rc<dyn EditValidator<T>>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn rows(&self) -> Vec<T> {
        self.state.borrow().rows.clone()
    }

    pub fn row(&self, key: &str) -> Option<T> {
        let state = self.state.borrow();
        state.position(key).map(|i| state.rows[i].clone())
    }

    pub fn edit_state(&self, key: &str) -> EditState {
        self.state
            .borrow()
            .statuses
            .get(key)
            .map(|(status, _)| *status)
            .unwrap_or_default()
    }

    /// Последнее сообщение об ошибке по строке
    pub fn last_error(&self, key: &str) -> Option<String> {
        self.state.borrow().errors.get(key).cloned()
    }

    pub fn pending_commits(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Заменить строки после перечитывания. Строки с незавершённой правкой
    /// остаются локальными, чтобы свежая выборка не затёрла ввод оператора.
    /// Если такой строки нет в выборке, её ожидающая правка завершается
    /// с `NotFound`.
    pub fn replace_rows(&self, rows: Vec<T>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let mut merged = Vec::with_capacity(rows.len());
        for row in rows {
            let key = row.entity_key();
            let busy = matches!(state.statuses.get(&key), Some((EditState::Saving, _)));
            match state.position(&key) {
                Some(i) if busy => merged.push(state.rows[i].clone()),
                _ => {
                    state.known_good.insert(key, row.clone());
                    merged.push(row);
                }
            }
        }
        let vanished: Vec<String> = state
            .rows
            .iter()
            .map(|r| r.entity_key())
            .filter(|k| matches!(state.statuses.get(k), Some((EditState::Saving, _))))
            .filter(|k| !merged.iter().any(|r| r.entity_key() == *k))
            .collect();
        state.rows = merged;

        for key in vanished {
            state.known_good.remove(&key);
            log::warn!("[edit:{}] '{}' disappeared from the server while editing", self.source, key);
            // Запрос уже в полёте: ответ сервера сам сообщит об ошибке
            if !state.timers.contains_key(&key) {
                continue;
            }
            state.cancel_timer(&key);
            let err = InventoryError::not_found(format!("строка {} удалена на сервере", key));
            let stamp = state.fail(&key, &err);
            state.dropped.insert(key, (stamp, err));
        }
    }

    /// Правка поля строки
    ///
    /// Future завершается, когда статус строки вернулся в Idle
    /// (или правка была вытеснена более новой).
    pub async fn change(
        &self,
        key: &str,
        mutate: impl FnOnce(&mut T),
    ) -> Result<CommitOutcome, InventoryError> {
        let registration = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let index = state
                .position(key)
                .ok_or_else(|| InventoryError::not_found(format!("строка {}", key)))?;

            if !state.known_good.contains_key(key) {
                let current = state.rows[index].clone();
                state.known_good.insert(key.to_string(), current);
            }
            let mut edited = state.rows[index].clone();
            mutate(&mut edited);
            let checked = match state.known_good.get(key) {
                Some(before) => edited.check_edit(before),
                None => Ok(()),
            };

            match checked {
                Ok(()) => {
                    state.rows[index] = edited;
                    state.bump_version(key);
                    state.set_status(key, EditState::Saving);
                    state.cancel_timer(key);
                    let (handle, registration) = AbortHandle::new_pair();
                    state.timers.insert(key.to_string(), handle);
                    Ok(registration)
                }
                Err(err) => Err((state.fail(key, &err), err)),
            }
        };
        let registration = match registration {
            Ok(registration) => registration,
            Err((stamp, err)) => {
                log::warn!("[edit:{}] edit of '{}' rejected: {}", self.source, key, err);
                self.decay(key, stamp, self.timings.error_decay).await;
                return Err(err);
            }
        };

        let debounce = self.clock.sleep(self.timings.debounce);
        if Abortable::new(debounce, registration).await.is_err() {
            let dropped = self.state.borrow_mut().dropped.remove(key);
            if let Some((stamp, err)) = dropped {
                self.decay(key, stamp, self.timings.error_decay).await;
                return Err(err);
            }
            log::debug!("[edit:{}] '{}' superseded by a newer edit", self.source, key);
            return Ok(CommitOutcome::Superseded);
        }

        let (snapshot, version, before) = {
            let mut state = self.state.borrow_mut();
            state.timers.remove(key);
            match state.position(key) {
                Some(i) => (
                    state.rows[i].clone(),
                    state.version(key),
                    state.known_good.get(key).cloned(),
                ),
                None => return Ok(CommitOutcome::Superseded),
            }
        };

        if let (Some(validator), Some(before)) = (&self.validator, before) {
            if let Err(err) = validator.check(&before, &snapshot).await {
                return self.reject(key, version, err).await;
            }
            if self.state.borrow().version(key) != version {
                log::debug!("[edit:{}] '{}' changed during validation", self.source, key);
                return Ok(CommitOutcome::Stale);
            }
        }

        log::debug!("[edit:{}] committing '{}' v{}", self.source, key, version);
        let result = self.endpoint.submit(key, &snapshot).await;
        self.settle_update(key, snapshot, version, result).await
    }

    /// Снимок не прошёл проверку: откат без запроса к серверу
    async fn reject(
        &self,
        key: &str,
        version: u64,
        err: InventoryError,
    ) -> Result<CommitOutcome, InventoryError> {
        let stamp = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            if state.version(key) != version {
                log::debug!("[edit:{}] dropped stale rejection for '{}'", self.source, key);
                return Ok(CommitOutcome::Stale);
            }
            if let Some(good) = state.known_good.get(key).cloned() {
                if let Some(i) = state.position(key) {
                    state.rows[i] = good;
                }
            }
            state.fail(key, &err)
        };

        log::warn!("[edit:{}] edit of '{}' rejected before commit: {}", self.source, key, err);
        self.decay(key, stamp, self.timings.error_decay).await;
        Err(err)
    }

    async fn settle_update(
        &self,
        key: &str,
        snapshot: T,
        version: u64,
        result: Result<Option<T>, InventoryError>,
    ) -> Result<CommitOutcome, InventoryError> {
        let settled = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let stale = state.version(key) != version;

            match result {
                Ok(server) => {
                    let confirmed = server.unwrap_or(snapshot);
                    state.known_good.insert(key.to_string(), confirmed.clone());
                    if stale {
                        log::debug!("[edit:{}] dropped stale response for '{}'", self.source, key);
                        return Ok(CommitOutcome::Stale);
                    }
                    if let Some(i) = state.position(key) {
                        state.rows[i] = confirmed.clone();
                    }
                    state.errors.remove(key);
                    let stamp = state.set_status(key, EditState::Success);
                    Ok((stamp, confirmed))
                }
                Err(_) if stale => {
                    log::debug!("[edit:{}] dropped stale failure for '{}'", self.source, key);
                    return Ok(CommitOutcome::Stale);
                }
                Err(err) => {
                    if let InventoryError::NotFound { .. } = err {
                        if let Some(i) = state.position(key) {
                            state.rows.remove(i);
                        }
                        state.known_good.remove(key);
                    } else if let Some(good) = state.known_good.get(key).cloned() {
                        if let Some(i) = state.position(key) {
                            state.rows[i] = good;
                        }
                    }
                    Err((state.fail(key, &err), err))
                }
            }
        };

        match settled {
            Ok((stamp, confirmed)) => {
                self.after_commit(&confirmed);
                self.decay(key, stamp, self.timings.success_decay).await;
                Ok(CommitOutcome::Committed)
            }
            Err((stamp, err)) => {
                log::warn!("[edit:{}] commit of '{}' failed: {}", self.source, key, err);
                self.decay(key, stamp, self.timings.error_decay).await;
                Err(err)
            }
        }
    }

    /// Добавление строки (явное действие, без debounce)
    pub async fn add_row(&self, row: T) -> Result<CommitOutcome, InventoryError> {
        let key = row.entity_key();
        let version = {
            let mut state = self.state.borrow_mut();
            if state.position(&key).is_some() {
                return Err(InventoryError::validation(format!(
                    "Строка {} уже существует",
                    key
                )));
            }
            state.rows.push(row.clone());
            state.set_status(&key, EditState::Saving);
            state.bump_version(&key)
        };

        let result = self.endpoint.create(&row).await;

        let settled = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            match result {
                Ok(server) => {
                    let confirmed = server.unwrap_or(row);
                    state.known_good.insert(key.clone(), confirmed.clone());
                    if state.version(&key) == version {
                        if let Some(i) = state.position(&key) {
                            state.rows[i] = confirmed.clone();
                        }
                    }
                    state.errors.remove(&key);
                    Ok((state.set_status(&key, EditState::Success), confirmed))
                }
                Err(err) => {
                    state.cancel_timer(&key);
                    if let Some(i) = state.position(&key) {
                        state.rows.remove(i);
                    }
                    state.known_good.remove(&key);
                    Err((state.fail(&key, &err), err))
                }
            }
        };

        match settled {
            Ok((stamp, confirmed)) => {
                self.after_commit(&confirmed);
                self.decay(&key, stamp, self.timings.success_decay).await;
                Ok(CommitOutcome::Committed)
            }
            Err((stamp, err)) => {
                log::warn!("[edit:{}] create of '{}' failed: {}", self.source, key, err);
                self.decay(&key, stamp, self.timings.error_decay).await;
                Err(err)
            }
        }
    }

    /// Удаление строки (явное действие, без debounce)
    ///
    /// При ошибке строка возвращается на прежнее место. `NotFound` значит,
    /// что строку уже удалил кто-то другой: локально она тоже не нужна.
    pub async fn delete_row(&self, key: &str) -> Result<CommitOutcome, InventoryError> {
        let (index, removed) = {
            let mut state = self.state.borrow_mut();
            let index = state
                .position(key)
                .ok_or_else(|| InventoryError::not_found(format!("строка {}", key)))?;
            state.cancel_timer(key);
            state.bump_version(key);
            state.set_status(key, EditState::Saving);
            (index, state.rows.remove(index))
        };

        let result = self.endpoint.delete(key).await;

        let settled = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            match result {
                Ok(()) => {
                    state.known_good.remove(key);
                    state.errors.remove(key);
                    Ok(state.set_status(key, EditState::Success))
                }
                Err(err) => {
                    if let InventoryError::NotFound { .. } = err {
                        state.known_good.remove(key);
                    } else {
                        let restored = state.known_good.get(key).cloned().unwrap_or(removed);
                        let at = index.min(state.rows.len());
                        state.rows.insert(at, restored);
                    }
                    Err((state.fail(key, &err), err))
                }
            }
        };

        match settled {
            Ok(stamp) => {
                if let Some(graph) = &self.graph {
                    graph.notify_updated(self.source, serde_json::json!({ "deleted": key }));
                    graph.invalidate(self.source);
                }
                self.decay(key, stamp, self.timings.success_decay).await;
                Ok(CommitOutcome::Committed)
            }
            Err((stamp, err)) => {
                log::warn!("[edit:{}] delete of '{}' failed: {}", self.source, key, err);
                self.decay(key, stamp, self.timings.error_decay).await;
                Err(err)
            }
        }
    }

    fn after_commit(&self, confirmed: &T) {
        if let Some(graph) = &self.graph {
            let payload = serde_json::to_value(confirmed).unwrap_or(serde_json::Value::Null);
            graph.notify_updated(self.source, payload);
            graph.invalidate(self.source);
        }
    }

    /// Вернуть статус в Idle, если его никто не поменял за время ожидания
    async fn decay(&self, key: &str, stamp: u64, after: Duration) {
        self.clock.sleep(after).await;
        let mut state = self.state.borrow_mut();
        if matches!(state.statuses.get(key), Some((_, s)) if *s == stamp) {
            state.set_status(key, EditState::Idle);
        }
    }

    /// Запустить правку в фоне (обработчики UI)
    pub fn spawn_change(&self, key: String, mutate: impl FnOnce(&mut T) + 'static) {
        let this = self.clone();
        leptos::task::spawn_local(async move {
            if let Err(e) = this.change(&key, mutate).await {
                log::warn!("[edit:{}] edit of '{}' rejected: {}", this.source, key, e);
            }
        });
    }
}
