mod echo;
mod health;

pub use echo::echo;
pub use health::{health_check, readiness_check};
