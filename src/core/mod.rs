pub mod etl;
pub mod pipeline;
pub mod samples;
pub mod volume;

pub use crate::domain::model::{Extracted, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
