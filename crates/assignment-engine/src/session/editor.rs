use std::collections::HashMap;
use std::sync::Arc;

use codelab_core::domain::{
    EvaluationVerdict, ExecutionResult, Language, LanguageTable, SubmissionId, UserId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::ClientStore;

pub const DEFAULT_THEME: &str = "vs-dark";
pub const DEFAULT_FONT_SIZE: u16 = 14;
pub const MIN_FONT_SIZE: u16 = 8;
pub const MAX_FONT_SIZE: u16 = 48;

/// 最近一次运行或提交的结果。切换语言或重置缓冲区时清空。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionOutcome {
    Executed(ExecutionResult),
    Submitted {
        submission_id: SubmissionId,
        verdict: EvaluationVerdict,
    },
    EvaluationFailed {
        message: String,
    },
}

/// 编辑器状态：每种语言一个独立缓冲区。
///
/// 持久化写入是尽力而为的，失败时仅记录日志，会话继续在内存中工作。
pub struct EditorSession {
    user_id: UserId,
    languages: Arc<LanguageTable>,
    store: Arc<dyn ClientStore>,
    starter_code: HashMap<Language, String>,
    active_language: Language,
    theme: String,
    font_size: u16,
    buffers: HashMap<Language, String>,
    outcome: Option<SessionOutcome>,
    generation: u64,
}

impl EditorSession {
    /// 从客户端存储恢复偏好与当前语言的缓冲区。
    pub fn restore(
        user_id: UserId,
        languages: Arc<LanguageTable>,
        store: Arc<dyn ClientStore>,
        starter_code: HashMap<Language, String>,
    ) -> Self {
        let mut session = Self {
            user_id,
            languages,
            store,
            starter_code,
            active_language: Language::Python,
            theme: DEFAULT_THEME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            buffers: HashMap::new(),
            outcome: None,
            generation: 0,
        };

        let stored_language = session
            .read(&session.language_key())
            .and_then(|value| value.parse::<Language>().ok())
            .filter(|language| session.languages.get(*language).is_some());
        let starter_language = session.starter_code.keys().min().copied();
        session.active_language = stored_language
            .or(starter_language)
            .unwrap_or(Language::Python);

        if let Some(theme) = session.read(&session.theme_key()) {
            session.theme = theme;
        }
        if let Some(font_size) = session
            .read(&session.font_size_key())
            .and_then(|value| value.parse::<u16>().ok())
        {
            session.font_size = font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        }

        let initial = session.load_buffer(session.active_language);
        session.buffers.insert(session.active_language, initial);
        session
    }

    pub fn active_language(&self) -> Language {
        self.active_language
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn font_size(&self) -> u16 {
        self.font_size
    }

    pub fn buffer(&self) -> &str {
        self.buffers
            .get(&self.active_language)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 切换语言：先落盘当前缓冲区，再载入目标语言。
    /// 已在内存中的缓冲区原样恢复；否则按 作业初始代码 → 已存储内容 → 默认代码 的优先级载入。
    pub fn select_language(&mut self, language: Language) {
        if self.languages.get(language).is_none() {
            warn!(%language, "ignoring unknown language");
            return;
        }

        let current = self.buffer().to_string();
        self.write(&self.code_key(self.active_language), &current);

        self.active_language = language;
        if !self.buffers.contains_key(&language) {
            let loaded = self.load_buffer(language);
            self.buffers.insert(language, loaded);
        }
        self.write(&self.language_key(), language.as_str());

        self.clear_outcome();
    }

    /// 不做校验，校验只在运行或提交时发生。
    pub fn update_buffer(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.write(&self.code_key(self.active_language), &text);
        self.buffers.insert(self.active_language, text);
    }

    pub fn reset_buffer(&mut self) {
        let default_source = self
            .languages
            .default_source(self.active_language)
            .to_string();
        self.buffers.insert(self.active_language, default_source);
        self.remove(&self.code_key(self.active_language));
        self.clear_outcome();
    }

    pub fn set_font_size(&mut self, font_size: u16) {
        self.font_size = font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self.write(&self.font_size_key(), &self.font_size.to_string());
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.theme = theme.into();
        self.write(&self.theme_key(), &self.theme);
    }

    /// 调用开始时的语言、源代码与代次。
    pub fn snapshot(&self) -> (Language, String, u64) {
        (self.active_language, self.buffer().to_string(), self.generation)
    }

    /// 只有代次未变化时才应用结果，迟到的结果被丢弃。
    pub fn apply_outcome(&mut self, generation: u64, outcome: SessionOutcome) -> bool {
        if generation != self.generation {
            debug!(
                expected = generation,
                current = self.generation,
                "discarding stale outcome"
            );
            return false;
        }
        self.outcome = Some(outcome);
        true
    }

    /// 使所有进行中的调用结果失效。
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    fn clear_outcome(&mut self) {
        self.outcome = None;
        self.invalidate();
    }

    fn load_buffer(&self, language: Language) -> String {
        if let Some(starter) = self.starter_code.get(&language) {
            return starter.clone();
        }
        if let Some(stored) = self.read(&self.code_key(language)) {
            return stored;
        }
        self.languages.default_source(language).to_string()
    }

    fn code_key(&self, language: Language) -> String {
        format!("{}:code:{}", self.user_id, language)
    }

    fn language_key(&self) -> String {
        format!("{}:language", self.user_id)
    }

    fn theme_key(&self) -> String {
        format!("{}:theme", self.user_id)
    }

    fn font_size_key(&self) -> String {
        format!("{}:fontSize", self.user_id)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "client store read failed");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            warn!(key, error = %err, "client store write failed, keeping state in memory");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(err) = self.store.remove(key) {
            warn!(key, error = %err, "client store remove failed");
        }
    }
}
