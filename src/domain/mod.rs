//! Domain layer: wage configuration, pay periods, the accrual state machine,
//! and the port the engine persists through.

pub mod accrual;
pub mod currency;
pub mod period;
pub mod ports;
pub mod wage;
