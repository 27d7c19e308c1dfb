//! Per-model router client implementations.

pub mod ax5400pro;
