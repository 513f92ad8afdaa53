// パス: src/config.rs
// 役割: セッション全体の設定値（ステップ上限・厳格モード・変換アルゴリズムなど）
// 意図: CLI フラグと REPL の `set` コマンドが同じ構造体を書き換えるようにする
// 関連ファイル: src/session.rs, src/bin/combinatorx.rs
//! セッション設定

use serde::Serialize;

use crate::combinator::Algorithm;
use crate::reducer::FreeVariables;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    /// 素の評価で使うステップ上限。
    pub eval_steps: usize,
    /// `reduce` で使うステップ上限。
    pub max_steps: usize,
    /// `trace` で表示する最大ステップ数。
    pub trace_limit: usize,
    pub free_variables: FreeVariables,
    /// true なら型の付かない `def` を拒否する。
    pub require_types: bool,
    pub algorithm: Algorithm,
    pub search_size: usize,
    pub search_steps: usize,
    /// 標準ライブラリを読み込むか。
    pub prelude: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            eval_steps: 10_000,
            max_steps: 1_000_000,
            trace_limit: 60,
            free_variables: FreeVariables::Symbolic,
            require_types: false,
            algorithm: Algorithm::Turner,
            search_size: 4,
            search_steps: 100,
            prelude: true,
        }
    }
}

/// `set` で変更できるキー。
pub const SETTING_KEYS: &[&str] = &[
    "steps",
    "max-steps",
    "trace",
    "strict",
    "types",
    "search-size",
    "search-steps",
];

impl SessionConfig {
    /// `set KEY VALUE` を適用し、正規化した値を返す。
    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<String, String> {
        match key {
            "steps" => self.eval_steps = parse_count(key, value)?,
            "max-steps" => self.max_steps = parse_count(key, value)?,
            "trace" => self.trace_limit = parse_count(key, value)?,
            "search-size" => self.search_size = parse_count(key, value)?,
            "search-steps" => self.search_steps = parse_count(key, value)?,
            "strict" => {
                self.free_variables = if parse_switch(key, value)? {
                    FreeVariables::Reject
                } else {
                    FreeVariables::Symbolic
                }
            }
            "types" => self.require_types = parse_switch(key, value)?,
            _ => {
                return Err(format!(
                    "unknown setting `{}` (expected one of: {})",
                    key,
                    SETTING_KEYS.join(", ")
                ))
            }
        }
        self.setting(key)
            .ok_or_else(|| format!("unknown setting `{}`", key))
    }

    /// キーの現在値を表示用文字列で返す。
    pub fn setting(&self, key: &str) -> Option<String> {
        let value = match key {
            "steps" => self.eval_steps.to_string(),
            "max-steps" => self.max_steps.to_string(),
            "trace" => self.trace_limit.to_string(),
            "search-size" => self.search_size.to_string(),
            "search-steps" => self.search_steps.to_string(),
            "strict" => switch(self.free_variables == FreeVariables::Reject).to_string(),
            "types" => switch(self.require_types).to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// 全キーと現在値の一覧。
    pub fn settings(&self) -> Vec<(String, String)> {
        SETTING_KEYS
            .iter()
            .filter_map(|k| self.setting(k).map(|v| (k.to_string(), v)))
            .collect()
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("`{}` expects a positive integer, got `{}`", key, value)),
    }
}

fn parse_switch(key: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(format!("`{}` expects on or off, got `{}`", key, value)),
    }
}

fn switch(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}
