//! Общие типы склада: агрегаты, жизненные циклы, валидатор вместимости
//! и таксономия ошибок. Используются и frontend, и backend.

pub mod domain;
pub mod shared;
