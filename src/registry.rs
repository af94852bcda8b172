use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

/// 课程体系，决定语法模式映射到哪一套模块
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Curriculum {
    #[default]
    Genki1,
    Genki2,
    Tobira,
}

impl Curriculum {
    pub fn as_str(&self) -> &'static str {
        match self {
            Curriculum::Genki1 => "genki1",
            Curriculum::Genki2 => "genki2",
            Curriculum::Tobira => "tobira",
        }
    }
}

impl fmt::Display for Curriculum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Curriculum {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "genki1" | "genki_1" => Ok(Curriculum::Genki1),
            "genki2" | "genki_2" => Ok(Curriculum::Genki2),
            "tobira" => Ok(Curriculum::Tobira),
            other => Err(PipelineError::Registry(format!("未知的课程体系: {}", other))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    curricula: HashMap<String, HashMap<String, Vec<String>>>,
}

/// 语法模式 -> 课程模块 的静态映射表，加载后只读
///
/// 文件格式：
///
/// ```toml
/// [curricula.genki1]
/// "past-tense-ました" = ["genki1-lesson-4"]
/// ```
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    tables: HashMap<Curriculum, HashMap<String, Vec<String>>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(content)?;

        let mut tables = HashMap::new();
        for (name, table) in file.curricula {
            let curriculum: Curriculum = name.parse()?;
            tables.insert(curriculum, table);
        }
        Ok(Self { tables })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Registry(format!("无法读取语法模式表 {}: {}", path.display(), e))
        })?;
        let registry = Self::from_toml_str(&content)?;

        tracing::info!(
            "📚 已加载语法模式表: {} ({} 个课程体系)",
            path.display(),
            registry.tables.len()
        );
        Ok(registry)
    }

    /// 注册映射，主要给测试和嵌入式使用
    pub fn insert(&mut self, curriculum: Curriculum, pattern: &str, modules: &[&str]) {
        self.tables
            .entry(curriculum)
            .or_default()
            .insert(
                pattern.to_string(),
                modules.iter().map(|m| m.to_string()).collect(),
            );
    }

    pub fn modules_for(&self, curriculum: Curriculum, pattern: &str) -> &[String] {
        self.tables
            .get(&curriculum)
            .and_then(|table| table.get(pattern))
            .map(|modules| modules.as_slice())
            .unwrap_or(&[])
    }

    /// 模块列表为空的模式等同于未映射
    pub fn has_modules(&self, curriculum: Curriculum, pattern: &str) -> bool {
        !self.modules_for(curriculum, pattern).is_empty()
    }

    /// 该课程体系下可以被识别的语法模式（排序后）
    pub fn known_patterns(&self, curriculum: Curriculum) -> Vec<&str> {
        let mut patterns: Vec<&str> = self
            .tables
            .get(&curriculum)
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, modules)| !modules.is_empty())
                    .map(|(pattern, _)| pattern.as_str())
                    .collect()
            })
            .unwrap_or_default();
        patterns.sort_unstable();
        patterns
    }
}
