pub mod handlers;

pub use handlers::{conciliar, conciliar_relatorio, health_check};
