use crate::core::volume::{RunMode, VolumeLayout};
use crate::domain::model::{Extracted, TransformResult};
use crate::io::SaveMode;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// Local CSV copied into the volume's `input/` folder.
    fn source_file(&self) -> &str;
    /// Optional multiline JSON staged next to the CSV.
    fn people_file(&self) -> Option<&str>;
    fn run_mode(&self) -> RunMode;
    fn volume(&self) -> VolumeLayout;
    /// Workspace folder that `output/` and `other/` are synced back into.
    fn workspace_dir(&self) -> &str;
    fn save_mode(&self) -> SaveMode;
    fn top_n(&self) -> usize;
    fn archive_output(&self) -> bool;
    fn s3_target(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Extracted>;
    async fn transform(&self, data: Extracted) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
