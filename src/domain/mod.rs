// Domain layer: injectable domain types, default/solve states and the param ports.

pub mod model;
pub mod ports;
