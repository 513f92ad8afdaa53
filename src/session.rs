// パス: src/session.rs
// 役割: 1 行の入力をコマンドに振り分け、パース・推論・簡約を順に呼ぶ窓口
// 意図: 定義環境を書き換えるのは `def` だけにし、失敗時は環境を一切変更しない
// 関連ファイル: src/repl/cmd.rs, src/repl/printer.rs, src/bin/combinatorx.rs, tests/session.rs
//! セッション
//!
//! REPL やバッチ実行から渡された 1 行を `Command` に分類し、`Outcome` を返す。
//! 出力の整形は呼び出し側（`repl::printer` や `--json`）に任せる。

use serde::Serialize;
use tracing::debug;

use crate::combinator::{self, Algorithm};
use crate::config::SessionConfig;
use crate::definitions::Definitions;
use crate::errors::Error;
use crate::infer::Inferencer;
use crate::parser::{parse_definition, parse_equation, parse_expr};
use crate::reducer::{Interrupt, NeverInterrupt, Reducer, Status};
use crate::search::{search, SearchQuery};
use crate::term::Term;

/// 表に出さずにそのまま外側へ返すコマンド。
pub const PASS_THROUGH: &[&str] = &["doc", "theme", "macros", "lib", "matrix", "quit", "exit"];

/// 入力 1 行の分類結果。引数はキーワードを除いた残り。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Define(String),
    TypeOf(String),
    Reduce(String),
    Trace(String),
    Compile(String),
    Algo(Option<String>),
    Search(String),
    Set(String),
    Help,
    PassThrough { command: String, args: String },
    Eval(String),
    Empty,
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::Define(_) => "def",
            Command::TypeOf(_) => "type",
            Command::Reduce(_) => "reduce",
            Command::Trace(_) => "trace",
            Command::Compile(_) => "compile",
            Command::Algo(_) => "algo",
            Command::Search(_) => "search",
            Command::Set(_) => "set",
            Command::Help => "help",
            Command::PassThrough { command, .. } => command,
            Command::Eval(_) => "eval",
            Command::Empty => "empty",
        }
    }
}

/// 先頭の単語でコマンドを判定する。キーワードでなければ式の評価。
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let rest = rest.to_string();
    match head {
        "def" => Command::Define(rest),
        "type" => Command::TypeOf(rest),
        "reduce" => Command::Reduce(rest),
        "trace" => Command::Trace(rest),
        "compile" => Command::Compile(rest),
        "algo" => Command::Algo(if rest.is_empty() { None } else { Some(rest) }),
        "search" => Command::Search(rest),
        "set" => Command::Set(rest),
        "help" => Command::Help,
        _ if PASS_THROUGH.contains(&head) => Command::PassThrough {
            command: head.to_string(),
            args: rest,
        },
        _ => Command::Eval(line.to_string()),
    }
}

/// `reduced` の出所。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMode {
    /// 素の評価。項だけを表示する。
    Evaluate,
    /// `reduce`。ステップ数も表示する。
    Reduce,
}

/// コマンド 1 つの実行結果。
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Defined {
        name: String,
        redefined: bool,
        scheme: Option<String>,
        /// 型が付かなかったときの理由。定義自体は行われている。
        warning: Option<String>,
    },
    Typed {
        expr: String,
        scheme: String,
    },
    Reduced {
        term: String,
        steps: usize,
        status: Status,
        mode: EvalMode,
    },
    Trace {
        /// `n: term` 形式。0 行目は入力そのもの。
        lines: Vec<String>,
        steps: usize,
        status: Status,
    },
    Compiled {
        algorithm: Algorithm,
        term: String,
    },
    #[serde(rename = "algorithm")]
    AlgorithmSet {
        algorithm: Algorithm,
        changed: bool,
    },
    Searched {
        found: Option<String>,
        tried: usize,
        target_normalized: bool,
    },
    Setting {
        key: String,
        value: String,
    },
    Settings {
        settings: Vec<(String, String)>,
    },
    Help,
    PassThrough {
        command: String,
        args: String,
    },
    Empty,
}

/// 定義環境と設定を持つ対話セッション。
#[derive(Debug)]
pub struct Session {
    defs: Definitions,
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, Error> {
        let defs = if config.prelude {
            Definitions::with_prelude()?
        } else {
            Definitions::new()
        };
        Ok(Self { defs, config })
    }

    pub fn with_definitions(defs: Definitions, config: SessionConfig) -> Self {
        Self { defs, config }
    }

    pub fn definitions(&self) -> &Definitions {
        &self.defs
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn execute(&mut self, line: &str) -> Result<Outcome, Error> {
        self.execute_with_interrupt(line, &NeverInterrupt)
    }

    /// 簡約系のコマンドは各ステップの前に `interrupt` を確認する。
    pub fn execute_with_interrupt(
        &mut self,
        line: &str,
        interrupt: &dyn Interrupt,
    ) -> Result<Outcome, Error> {
        let command = parse_command(line);
        debug!(command = command.name(), "dispatch");
        match command {
            Command::Define(src) => self.define(&src),
            Command::TypeOf(src) => self.type_of(&src),
            Command::Reduce(src) => {
                self.reduce(&src, self.config.max_steps, EvalMode::Reduce, interrupt)
            }
            Command::Eval(src) => {
                self.reduce(&src, self.config.eval_steps, EvalMode::Evaluate, interrupt)
            }
            Command::Trace(src) => self.trace(&src, interrupt),
            Command::Compile(src) => {
                let term = parse_expr(&src)?;
                let compiled = combinator::compile(&term, self.config.algorithm);
                Ok(Outcome::Compiled {
                    algorithm: self.config.algorithm,
                    term: compiled.to_string(),
                })
            }
            Command::Algo(None) => Ok(Outcome::AlgorithmSet {
                algorithm: self.config.algorithm,
                changed: false,
            }),
            Command::Algo(Some(name)) => {
                let algorithm = name.parse::<Algorithm>().map_err(Error::command)?;
                let changed = algorithm != self.config.algorithm;
                self.config.algorithm = algorithm;
                Ok(Outcome::AlgorithmSet { algorithm, changed })
            }
            Command::Search(src) => self.search(&src),
            Command::Set(src) => self.set(&src),
            Command::Help => Ok(Outcome::Help),
            Command::PassThrough { command, args } => Ok(Outcome::PassThrough { command, args }),
            Command::Empty => Ok(Outcome::Empty),
        }
    }

    /// 構文と型を全て確認してから環境に入れる。途中で失敗すれば何も変えない。
    fn define(&mut self, src: &str) -> Result<Outcome, Error> {
        let definition = parse_definition(src)?;
        let term = definition.term();
        let typed = Inferencer::new(&self.defs, self.config.free_variables)
            .infer_definition(&definition.name, &term);
        let (scheme, warning) = match typed {
            Ok(sch) => (Some(sch), None),
            Err(e) if self.config.require_types => return Err(e.into()),
            Err(e) => (None, Some(e.to_string())),
        };
        let redefined = self.defs.define(definition.name.clone(), term).is_some();
        if let Some(sch) = &scheme {
            self.defs.cache_scheme(&definition.name, sch.clone());
        }
        debug!(name = %definition.name, redefined, typed = scheme.is_some(), "defined");
        Ok(Outcome::Defined {
            name: definition.name,
            redefined,
            scheme: scheme.map(|s| s.to_string()),
            warning,
        })
    }

    fn type_of(&self, src: &str) -> Result<Outcome, Error> {
        let term = parse_expr(src)?;
        let scheme = Inferencer::new(&self.defs, self.config.free_variables).infer_term(&term)?;
        Ok(Outcome::Typed {
            expr: term.to_string(),
            scheme: scheme.to_string(),
        })
    }

    fn reduce(
        &self,
        src: &str,
        max_steps: usize,
        mode: EvalMode,
        interrupt: &dyn Interrupt,
    ) -> Result<Outcome, Error> {
        let term = parse_expr(src)?;
        let r = Reducer::new(&self.defs, max_steps)
            .free_variables(self.config.free_variables)
            .interrupt(interrupt)
            .normalize(&term)?;
        Ok(Outcome::Reduced {
            term: r.term.to_string(),
            steps: r.steps,
            status: r.status,
            mode,
        })
    }

    fn trace(&self, src: &str, interrupt: &dyn Interrupt) -> Result<Outcome, Error> {
        let term = parse_expr(src)?;
        let mut lines = vec![format!("0: {}", term)];
        let mut record = |n: usize, t: &Term| lines.push(format!("{}: {}", n, t));
        let r = Reducer::new(&self.defs, self.config.trace_limit)
            .free_variables(self.config.free_variables)
            .interrupt(interrupt)
            .observe(&mut record)
            .normalize(&term)?;
        Ok(Outcome::Trace {
            lines,
            steps: r.steps,
            status: r.status,
        })
    }

    /// `x y = body using S K I`
    fn search(&self, src: &str) -> Result<Outcome, Error> {
        let usage = || Error::command("usage: search <params> = <body> using <name> ...");
        let (equation, basis) = split_keyword(src, "using").ok_or_else(usage)?;
        let basis: Vec<String> = basis.split_whitespace().map(str::to_string).collect();
        if basis.is_empty() {
            return Err(usage());
        }
        let equation = parse_equation(equation)?;
        let query = SearchQuery {
            params: &equation.params,
            body: &equation.body,
            basis: &basis,
            max_size: self.config.search_size,
            max_steps: self.config.search_steps,
            free_variables: self.config.free_variables,
        };
        let result = search(&self.defs, &query)?;
        Ok(Outcome::Searched {
            found: result.found.map(|t| t.to_string()),
            tried: result.tried,
            target_normalized: result.target_normalized,
        })
    }

    fn set(&mut self, src: &str) -> Result<Outcome, Error> {
        let mut words = src.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (None, _, _) => Ok(Outcome::Settings {
                settings: self.config.settings(),
            }),
            (Some(key), None, _) => {
                let value = self
                    .config
                    .setting(key)
                    .ok_or_else(|| Error::command(format!("unknown setting `{}`", key)))?;
                Ok(Outcome::Setting {
                    key: key.to_string(),
                    value,
                })
            }
            (Some(key), Some(value), None) => {
                let value = self
                    .config
                    .apply_setting(key, value)
                    .map_err(Error::command)?;
                debug!(key, value = %value, "setting changed");
                Ok(Outcome::Setting {
                    key: key.to_string(),
                    value,
                })
            }
            _ => Err(Error::command("usage: set <key> <value>")),
        }
    }
}

/// 単語として現れる `keyword` の前後に分ける。
fn split_keyword<'s>(src: &'s str, keyword: &str) -> Option<(&'s str, &'s str)> {
    let mut offset = 0;
    for word in src.split_whitespace() {
        let start = offset + src[offset..].find(word)?;
        let end = start + word.len();
        if word == keyword {
            return Some((&src[..start], &src[end..]));
        }
        offset = end;
    }
    None
}
