// Domain layer: record model, boundary schema and ports. No HTTP or filesystem here.

pub mod model;
pub mod ports;
pub mod schema;
