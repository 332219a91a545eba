use clap::Parser;
use handson_etl::core::ConfigProvider;
use handson_etl::utils::error::ErrorSeverity;
use handson_etl::utils::{logger, validation::Validate};
use handson_etl::{EtlEngine, HandsOnPipeline, LocalStorage, TomlConfig};
use std::path::Path;

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Flight ETL driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the save mode from config
    #[arg(long)]
    save_mode: Option<String>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger_with(config.log_level());
    } else {
        logger::init_cli_logger_with(config.log_level(), args.verbose);
    }
    tracing::info!("🚀 Starting TOML-based ETL tool");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(mode) = &args.save_mode {
        config.load.save_mode = Some(mode.clone());
        tracing::info!("🔧 Save mode overridden to: {}", mode);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    // 顯示配置摘要
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config);
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.volume().output_dir());
    let pipeline = HandsOnPipeline::new(storage, config);

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Source: {}", config.source_file());
    if let Some(people) = config.people_file() {
        println!("  People: {}", people);
    }
    println!("  Run Mode: {}", config.run_mode());
    println!("  Volume: {}", config.volume().qualified_name());
    println!("  Save Mode: {}", config.save_mode());
    println!("  Top N: {}", config.top_n());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    // 輸入檔分析
    println!("📥 Inputs:");
    for file in std::iter::once(config.source_file()).chain(config.people_file()) {
        let status = if Path::new(file).is_file() {
            "found"
        } else {
            "MISSING"
        };
        println!("  {} ({})", file, status);
    }

    // Volume 配置
    let layout = config.volume();
    println!();
    println!("📦 Volume:");
    println!("  Input:  {}", layout.input_dir().display());
    println!("  Output: {}", layout.output_dir().display());
    println!("  Other:  {}", layout.other_dir().display());

    // 輸出分析
    println!();
    println!("💾 Outputs:");
    for name in [
        "parquet_data",
        "csv_output",
        "partitioned_csv",
        "top_destinations",
        "ranked_flights",
    ] {
        println!("  {}", layout.output_dir().join(name).display());
    }
    println!("  {}", layout.other_dir().join("bad_records").display());
    if config.archive_output() {
        println!("  Archive: etl_output.zip (ZIP)");
    }
    if let Some(target) = config.s3_target() {
        println!("  S3: {}", target);
    }
    println!(
        "  Sync back to: {}/{{output,other}}",
        config.workspace_dir()
    );

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
