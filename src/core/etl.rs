use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use tracing::info;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        info!("🚀 Starting ETL process...");
        self.monitor.log_stats("Start");

        // Extract
        info!("📥 Extracting data...");
        let extracted = self.pipeline.extract().await?;
        info!(
            "Extracted {} flight rows, {} raw rows",
            extracted.flights.count(),
            extracted.flights_raw.count()
        );
        self.monitor.log_stats("Extract");

        // Transform
        info!("🔄 Transforming data...");
        let transformed = self.pipeline.transform(extracted).await?;
        info!(
            "Transformed {} rows, {} bad records, {} summaries",
            transformed.flights.count(),
            transformed.bad_records.count(),
            transformed.summaries.len()
        );
        self.monitor.log_stats("Transform");

        // Load
        info!("💾 Loading data...");
        let output_path = self.pipeline.load(transformed).await?;
        self.monitor.log_stats("Load");
        info!("✅ Output saved to: {}", output_path);

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
