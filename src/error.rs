use thiserror::Error;

/// 应用程序错误类型
///
/// 只在基础设施层（页面缓存、记录存储、HTTP 客户端）和配置加载中出现。
/// 解析引擎本身没有错误类型：任何解析失败都表现为空结果。
#[derive(Debug, Error)]
pub enum AppError {
    /// 下载相关错误
    #[error("下载错误: {0}")]
    Fetch(#[from] FetchError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 记录存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 下载相关错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 构建 HTTP 客户端失败
    #[error("无法构建 HTTP 客户端: {source}")]
    ClientBuildFailed {
        #[source]
        source: reqwest::Error,
    },
    /// 网络请求失败
    #[error("请求 {url} 失败: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 读取响应体失败
    #[error("读取 {url} 响应体失败: {source}")]
    BodyReadFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 请求头内容非法
    #[error("请求头 {name} 的值非法")]
    InvalidHeader { name: &'static str },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 目录操作失败
    #[error("目录操作失败 ({path}): {source}")]
    DirectoryFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 记录存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 存储文件内容无法解析
    #[error("存储文件损坏 ({path}): {source}")]
    Corrupted {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 序列化失败
    #[error("序列化记录失败: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 运行模式无法识别
    #[error("未知的运行模式: '{value}' (可选: download / parse / all / search / debug)")]
    UnknownRunMode { value: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建目录操作错误
    pub fn directory_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::DirectoryFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建网络请求错误
    pub fn request_failed(url: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Fetch(FetchError::RequestFailed {
            url: url.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
