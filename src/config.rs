use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 运行模式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// 只下载页面
    Download,
    /// 只解析已缓存的页面
    Parse,
    /// 先下载再解析
    All,
    /// 在已解析的记录中搜索
    Search,
    /// 输出指定页面的结构诊断
    Debug,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Download => "download",
            RunMode::Parse => "parse",
            RunMode::All => "all",
            RunMode::Search => "search",
            RunMode::Debug => "debug",
        }
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "download" => Ok(RunMode::Download),
            "parse" => Ok(RunMode::Parse),
            "all" => Ok(RunMode::All),
            "search" => Ok(RunMode::Search),
            "debug" => Ok(RunMode::Debug),
            other => Err(ConfigError::UnknownRunMode {
                value: other.to_string(),
            }),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTML 页面缓存目录
    pub html_storage_dir: String,
    /// 解析结果存储文件
    pub records_path: String,
    /// 起始测试ID（含）
    pub start_id: u64,
    /// 结束测试ID（含）
    pub end_id: u64,
    /// 两次请求之间的间隔（毫秒）
    pub sleep_between_ms: u64,
    // --- HTTP 配置 ---
    pub base_url: String,
    pub referer: String,
    pub user_agent: String,
    /// 完整的 Cookie 字符串（从浏览器 DevTools 复制）
    pub cookie: String,
    pub request_timeout_secs: u64,
    pub max_redirects: usize,
    /// 单个页面的最大尝试次数
    pub max_retries: usize,
    /// 服务端错误（429 / 5xx）后的等待秒数
    pub server_backoff_secs: u64,
    /// 网络错误后的等待秒数
    pub error_backoff_secs: u64,
    // --- 解析配置 ---
    /// 同时解析的页面数量
    pub max_concurrent_documents: usize,
    /// 解析时两次写回记录存储之间的最短间隔（秒），结束时总会写回
    pub flush_interval_secs: u64,
    /// 诊断模式要检查的页面ID
    pub debug_ids: Vec<u64>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- 运行模式 ---
    pub run_mode: RunMode,
    pub search_query: String,
    pub search_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            html_storage_dir: "html_files".to_string(),
            records_path: "zin_cdz.json".to_string(),
            start_id: 0,
            end_id: 89_999,
            sleep_between_ms: 500,
            base_url: "https://zin.pw/cdz/test".to_string(),
            referer: "https://zin.pw/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36".to_string(),
            cookie: String::new(),
            request_timeout_secs: 30,
            max_redirects: 30,
            max_retries: 3,
            server_backoff_secs: 5,
            error_backoff_secs: 2,
            max_concurrent_documents: 16,
            flush_interval_secs: 30,
            debug_ids: Vec::new(),
            verbose_logging: false,
            output_log_file: "cdz_harvest.log".to_string(),
            run_mode: RunMode::All,
            search_query: String::new(),
            search_limit: 20,
        }
    }
}

impl Config {
    /// 从环境变量加载配置，未设置或无法解析的变量使用默认值
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，环境变量仍然优先
    ///
    /// # 参数
    /// - `path`: 配置文件路径
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        let base = self;
        Self {
            html_storage_dir: env_string("HTML_STORAGE_DIR").unwrap_or(base.html_storage_dir),
            records_path: env_string("RECORDS_PATH").unwrap_or(base.records_path),
            start_id: env_parse("START_ID").unwrap_or(base.start_id),
            end_id: env_parse("END_ID").unwrap_or(base.end_id),
            sleep_between_ms: env_parse("SLEEP_BETWEEN_MS").unwrap_or(base.sleep_between_ms),
            base_url: env_string("BASE_URL").unwrap_or(base.base_url),
            referer: env_string("REFERER").unwrap_or(base.referer),
            user_agent: env_string("USER_AGENT").unwrap_or(base.user_agent),
            cookie: env_string("COOKIE").unwrap_or(base.cookie),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(base.request_timeout_secs),
            max_redirects: env_parse("MAX_REDIRECTS").unwrap_or(base.max_redirects),
            max_retries: env_parse("MAX_RETRIES").unwrap_or(base.max_retries),
            server_backoff_secs: env_parse("SERVER_BACKOFF_SECS").unwrap_or(base.server_backoff_secs),
            error_backoff_secs: env_parse("ERROR_BACKOFF_SECS").unwrap_or(base.error_backoff_secs),
            max_concurrent_documents: env_parse("MAX_CONCURRENT_DOCUMENTS").unwrap_or(base.max_concurrent_documents),
            flush_interval_secs: env_parse("FLUSH_INTERVAL_SECS").unwrap_or(base.flush_interval_secs),
            debug_ids: env_string("DEBUG_IDS").map(|v| parse_id_list(&v)).unwrap_or(base.debug_ids),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(base.verbose_logging),
            output_log_file: env_string("OUTPUT_LOG_FILE").unwrap_or(base.output_log_file),
            run_mode: env_parse("RUN_MODE").unwrap_or(base.run_mode),
            search_query: env_string("SEARCH_QUERY").unwrap_or(base.search_query),
            search_limit: env_parse("SEARCH_LIMIT").unwrap_or(base.search_limit),
        }
    }

    pub fn sleep_between(&self) -> Duration {
        Duration::from_millis(self.sleep_between_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn server_backoff(&self) -> Duration {
        Duration::from_secs(self.server_backoff_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

/// "1, 2 3" → [1, 2, 3]，无法解析的项忽略
fn parse_id_list(value: &str) -> Vec<u64> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_mode_parse() {
        assert_eq!("download".parse::<RunMode>().unwrap(), RunMode::Download);
        assert_eq!(" Parse ".parse::<RunMode>().unwrap(), RunMode::Parse);
        assert_eq!("ALL".parse::<RunMode>().unwrap(), RunMode::All);
        assert_eq!("search".parse::<RunMode>().unwrap(), RunMode::Search);
        assert_eq!("debug".parse::<RunMode>().unwrap(), RunMode::Debug);
        assert!("upload".parse::<RunMode>().is_err());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("89247, 88316 88320,,x"), vec![89247, 88316, 88320]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn test_toml_debug_ids_and_flush_interval() {
        let config: Config = toml::from_str("debug_ids = [1, 2]\nflush_interval_secs = 0\n").unwrap();
        assert_eq!(config.debug_ids, vec![1, 2]);
        assert!(config.flush_interval().is_zero());
    }

    #[test]
    fn test_toml_partial_config_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            html_storage_dir = "pages"
            end_id = 100
            run_mode = "parse"
            "#,
        )
        .unwrap();

        assert_eq!(config.html_storage_dir, "pages");
        assert_eq!(config.end_id, 100);
        assert_eq!(config.run_mode, RunMode::Parse);
        assert_eq!(config.start_id, 0);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cdz.toml");
        std::fs::write(&path, "max_concurrent_documents = 4\nsearch_limit = 5\n").unwrap();

        let config = Config::from_toml_file(&path).unwrap();
        assert_eq!(config.max_concurrent_documents, 4);
        assert_eq!(config.search_limit, 5);
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = Config::from_toml_file("/definitely/not/here/cdz.toml");
        assert!(result.is_err());
    }
}
