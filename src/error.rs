/// 处理流程中的结果类型
pub type Result<T> = std::result::Result<T, PipelineError>;

/// 处理流程的错误类型
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP 错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML 解析错误: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("CSV 错误: {0}")]
    Csv(#[from] csv::Error),

    #[error("分词器初始化失败: {0}")]
    TokenizerInit(String),

    #[error("分词失败: {0}")]
    Tokenize(String),

    #[error("API 请求失败: {0}")]
    Api(String),

    #[error("语法模式表错误: {0}")]
    Registry(String),

    #[error("上传学习路径失败: {0}")]
    Upload(String),

    #[error("配置错误: {0}")]
    Config(String),
}
