use anyhow::{Context, Result};
use cdz_harvest::utils::logging;
use cdz_harvest::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：设置了 CDZ_CONFIG 时从 TOML 文件读取，否则只用环境变量
    let config = match std::env::var("CDZ_CONFIG") {
        Ok(path) if !path.trim().is_empty() => Config::from_toml_file(&path)
            .with_context(|| format!("无法加载配置文件: {}", path))?,
        _ => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging, &config.output_log_file)?;

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
