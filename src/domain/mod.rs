// Domain layer: data model and ports (interfaces) shared by the engine and pipelines.

pub mod model;
pub mod ports;
