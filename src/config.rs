//! 运行配置解析：四个来源按字段独立合并
//!
//! 优先级（高到低）：
//! 1. 调用方显式覆盖（ConfigOverrides）
//! 2. 运行上下文提供的参数表（RunnableConfig，可从 TOML/JSON/YAML 文件加载）
//! 3. 环境变量 `HIVE_<FIELD>`，其次裸大写 `<FIELD>`；api_key 另有 OPENAI_API_KEY / DEEPSEEK_API_KEY 兜底
//! 4. 内置默认值
//!
//! 数值上限（max_concurrent_units / max_iterations / recursion_limit）必须 ≥ 1，
//! 不合法时整个解析失败，不做钳制。

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "HIVE";

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_MAX_CONCURRENT_UNITS: usize = 3;
pub const DEFAULT_MAX_ITERATIONS: usize = 3;
pub const DEFAULT_SUMMARIZATION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_RECURSION_LIMIT: usize = 50;

/// api_key 未在前三个来源出现时依次尝试的通用凭据变量
const CREDENTIAL_FALLBACKS: &[&str] = &["OPENAI_API_KEY", "DEEPSEEK_API_KEY"];

/// 某个字段值的出处（用于错误信息与日志）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Override,
    Runnable,
    Environment(String),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => f.write_str("explicit override"),
            Self::Runnable => f.write_str("runnable config"),
            Self::Environment(key) => write!(f, "environment variable {key}"),
        }
    }
}

/// 配置错误：在任何运行开始前报告
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for `{field}` ({origin}): {reason}")]
    Invalid {
        field: &'static str,
        origin: ConfigSource,
        reason: String,
    },

    #[error("`{field}` must be >= 1, got {value} ({origin})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        origin: ConfigSource,
    },

    #[error("missing required value `{0}`")]
    Missing(&'static str),

    #[error("worker registry: {0}")]
    InvalidWorker(String),

    #[error("failed to load config file: {0}")]
    Load(#[from] config::ConfigError),
}

/// 显式覆盖：字段名与环境变量后缀一致，None 表示不覆盖
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_concurrent_units: Option<i64>,
    pub max_iterations: Option<i64>,
    pub summarization_model: Option<String>,
    pub api_key: Option<String>,
    pub recursion_limit: Option<i64>,
}

/// 运行上下文参数表（相当于每次运行的 configurable 字典）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunnableConfig {
    values: Map<String, Value>,
}

impl RunnableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从任意 JSON 构造；若含 `configurable` 子表则取子表
    pub fn from_value(value: Value) -> Self {
        let values = match value {
            Value::Object(mut map) => match map.remove("configurable") {
                Some(Value::Object(inner)) => inner,
                Some(other) => {
                    map.insert("configurable".to_string(), other);
                    map
                }
                None => map,
            },
            _ => Map::new(),
        };
        Self { values }
    }

    /// 通过 config crate 从文件加载（按扩展名识别 TOML / JSON / YAML）
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let value: Value = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        Ok(Self::from_value(value))
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// null 视为未设置
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }
}

/// 环境变量快照；测试中用显式键值构造，避免读写进程环境
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// 空字符串视为未设置
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// 解析完成后的有效配置，构造后不可变
#[derive(Clone, PartialEq)]
pub struct EffectiveConfig {
    model: String,
    temperature: f32,
    max_concurrent_units: usize,
    max_iterations: usize,
    summarization_model: String,
    api_key: Option<String>,
    recursion_limit: usize,
}

impl EffectiveConfig {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_concurrent_units(&self) -> usize {
        self.max_concurrent_units
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn summarization_model(&self) -> &str {
        &self.summarization_model
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_concurrent_units: DEFAULT_MAX_CONCURRENT_UNITS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            summarization_model: DEFAULT_SUMMARIZATION_MODEL.to_string(),
            api_key: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_concurrent_units", &self.max_concurrent_units)
            .field("max_iterations", &self.max_iterations)
            .field("summarization_model", &self.summarization_model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}

/// 第 2、3 层查到的原始值
enum Raw<'a> {
    Json(&'a Value),
    Text(&'a str),
}

struct Layers<'a> {
    runnable: &'a RunnableConfig,
    env: &'a EnvSnapshot,
}

impl<'a> Layers<'a> {
    /// 依次查运行参数表、`HIVE_<FIELD>`、`<FIELD>`
    fn find(&self, field: &'static str) -> Option<(Raw<'a>, ConfigSource)> {
        if let Some(v) = self.runnable.get(field) {
            return Some((Raw::Json(v), ConfigSource::Runnable));
        }
        let bare = field.to_uppercase();
        let prefixed = format!("{ENV_PREFIX}_{bare}");
        [prefixed, bare].into_iter().find_map(|key| {
            self.env
                .get(&key)
                .map(|v| (Raw::Text(v), ConfigSource::Environment(key.clone())))
        })
    }

    fn text(
        &self,
        field: &'static str,
        over: Option<&String>,
    ) -> Result<Option<(String, ConfigSource)>, ConfigError> {
        if let Some(v) = over {
            return Ok(Some((v.clone(), ConfigSource::Override)));
        }
        match self.find(field) {
            Some((Raw::Text(s), origin)) => Ok(Some((s.to_string(), origin))),
            Some((Raw::Json(Value::String(s)), origin)) => Ok(Some((s.clone(), origin))),
            Some((Raw::Json(other), origin)) => Err(ConfigError::Invalid {
                field,
                origin,
                reason: format!("expected a string, got {other}"),
            }),
            None => Ok(None),
        }
    }

    fn float(
        &self,
        field: &'static str,
        over: Option<f32>,
    ) -> Result<Option<(f32, ConfigSource)>, ConfigError> {
        if let Some(v) = over {
            return Ok(Some((v, ConfigSource::Override)));
        }
        let Some((raw, origin)) = self.find(field) else {
            return Ok(None);
        };
        let parsed = match raw {
            Raw::Text(s) => s.trim().parse::<f32>().map_err(|e| e.to_string()),
            Raw::Json(Value::Number(n)) => n
                .as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| format!("{n} is not representable")),
            Raw::Json(Value::String(s)) => s.trim().parse::<f32>().map_err(|e| e.to_string()),
            Raw::Json(other) => Err(format!("expected a number, got {other}")),
        };
        parsed
            .map(|v| Some((v, origin.clone())))
            .map_err(|reason| ConfigError::Invalid {
                field,
                origin,
                reason,
            })
    }

    fn integer(
        &self,
        field: &'static str,
        over: Option<i64>,
    ) -> Result<Option<(i64, ConfigSource)>, ConfigError> {
        if let Some(v) = over {
            return Ok(Some((v, ConfigSource::Override)));
        }
        let Some((raw, origin)) = self.find(field) else {
            return Ok(None);
        };
        let parsed = match raw {
            Raw::Text(s) => s.trim().parse::<i64>().map_err(|e| e.to_string()),
            Raw::Json(Value::Number(n)) => {
                n.as_i64().ok_or_else(|| format!("{n} is not an integer"))
            }
            Raw::Json(Value::String(s)) => s.trim().parse::<i64>().map_err(|e| e.to_string()),
            Raw::Json(other) => Err(format!("expected an integer, got {other}")),
        };
        parsed
            .map(|v| Some((v, origin.clone())))
            .map_err(|reason| ConfigError::Invalid {
                field,
                origin,
                reason,
            })
    }

    /// 凭据字段：每一层的空白值都视为未设置，继续查下一层
    fn credential(
        &self,
        field: &'static str,
        over: Option<&String>,
    ) -> Result<Option<String>, ConfigError> {
        if let Some(v) = over.filter(|v| !v.trim().is_empty()) {
            return Ok(Some(v.clone()));
        }
        match self.runnable.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Ok(Some(s.clone())),
            Some(Value::String(_)) | None => {}
            Some(other) => {
                return Err(ConfigError::Invalid {
                    field,
                    origin: ConfigSource::Runnable,
                    reason: format!("expected a string, got {other}"),
                })
            }
        }
        let bare = field.to_uppercase();
        let prefixed = format!("{ENV_PREFIX}_{bare}");
        Ok([prefixed, bare]
            .iter()
            .find_map(|key| self.env.get(key).map(str::to_string)))
    }

    /// 上限字段：缺省用默认值，< 1 报错
    fn limit(
        &self,
        field: &'static str,
        over: Option<i64>,
        default: usize,
    ) -> Result<usize, ConfigError> {
        match self.integer(field, over)? {
            None => Ok(default),
            Some((value, origin)) if value < 1 => Err(ConfigError::OutOfRange {
                field,
                value,
                origin,
            }),
            Some((value, origin)) => usize::try_from(value).map_err(|e| ConfigError::Invalid {
                field,
                origin,
                reason: e.to_string(),
            }),
        }
    }
}

fn non_empty(
    field: &'static str,
    found: Option<(String, ConfigSource)>,
    default: &str,
) -> Result<String, ConfigError> {
    match found {
        None => Ok(default.to_string()),
        Some((v, origin)) if v.trim().is_empty() => Err(ConfigError::Invalid {
            field,
            origin,
            reason: "must not be empty".to_string(),
        }),
        Some((v, _)) => Ok(v),
    }
}

/// 按字段合并四个来源，得到有效配置
pub fn resolve(
    overrides: &ConfigOverrides,
    runnable: &RunnableConfig,
    env: &EnvSnapshot,
) -> Result<EffectiveConfig, ConfigError> {
    let layers = Layers { runnable, env };

    let model = non_empty("model", layers.text("model", overrides.model.as_ref())?, DEFAULT_MODEL)?;
    let summarization_model = non_empty(
        "summarization_model",
        layers.text("summarization_model", overrides.summarization_model.as_ref())?,
        DEFAULT_SUMMARIZATION_MODEL,
    )?;

    let temperature = match layers.float("temperature", overrides.temperature)? {
        None => DEFAULT_TEMPERATURE,
        Some((t, origin)) if !t.is_finite() || t < 0.0 => {
            return Err(ConfigError::Invalid {
                field: "temperature",
                origin,
                reason: format!("{t} is not a non-negative number"),
            })
        }
        Some((t, _)) => t,
    };

    let max_concurrent_units = layers.limit(
        "max_concurrent_units",
        overrides.max_concurrent_units,
        DEFAULT_MAX_CONCURRENT_UNITS,
    )?;
    let max_iterations =
        layers.limit("max_iterations", overrides.max_iterations, DEFAULT_MAX_ITERATIONS)?;
    let recursion_limit =
        layers.limit("recursion_limit", overrides.recursion_limit, DEFAULT_RECURSION_LIMIT)?;

    let api_key = layers
        .credential("api_key", overrides.api_key.as_ref())?
        .or_else(|| {
            CREDENTIAL_FALLBACKS
                .iter()
                .find_map(|key| env.get(key).map(str::to_string))
        });

    let cfg = EffectiveConfig {
        model,
        temperature,
        max_concurrent_units,
        max_iterations,
        summarization_model,
        api_key,
        recursion_limit,
    };
    tracing::debug!(config = ?cfg, "configuration resolved");
    Ok(cfg)
}

/// 从默认位置（config/hive.toml 等）或指定文件加载运行参数表，再叠加进程环境解析
///
/// 指定文件不存在视为错误；默认位置找不到则只用环境变量与默认值。
pub fn load_config(
    config_path: Option<PathBuf>,
    overrides: &ConfigOverrides,
) -> Result<EffectiveConfig, ConfigError> {
    let runnable = match config_path {
        Some(path) => RunnableConfig::from_file(path)?,
        None => ["config/hive.toml", "../config/hive.toml", "hive.toml"]
            .into_iter()
            .find(|p| Path::new(p).exists())
            .map(RunnableConfig::from_file)
            .transpose()?
            .unwrap_or_default(),
    };
    resolve(overrides, &runnable, &EnvSnapshot::from_process())
}
