// パス: src/bin/combinatorx.rs
// 役割: CLI エントリポイント（フラグの解釈、ログの初期化、REPL またはバッチ実行）
// 意図: `-e` が与えられたら各行を実行して終了し、なければ対話ループに入る
// 関連ファイル: src/repl/mod.rs, src/config.rs, src/lib.rs
use std::io;
use std::process::ExitCode;

use clap::Parser;
use combinatorx::combinator::Algorithm;
use combinatorx::repl::{run_batch, run_repl};
use combinatorx::{FreeVariables, Session, SessionConfig};
use tracing_subscriber::EnvFilter;

/// ラムダ計算とコンビネータ論理の評価器
#[derive(Parser, Debug)]
#[command(name = "combinatorx-repl", version)]
#[command(about = "Interactive lambda-calculus and combinatory-logic evaluator", long_about = None)]
struct Cli {
    /// 素の評価のステップ上限
    #[arg(long, value_name = "N")]
    eval_steps: Option<usize>,
    /// `reduce` のステップ上限
    #[arg(long, value_name = "N")]
    max_steps: Option<usize>,
    /// 未定義の自由変数をエラーにする
    #[arg(long)]
    strict: bool,
    /// 型の付かない def を拒否する
    #[arg(long)]
    require_types: bool,
    /// ブラケット抽象のアルゴリズム（primitive, eta, turner）
    #[arg(long, value_name = "ALGO")]
    algo: Option<Algorithm>,
    /// 標準ライブラリを読み込まない
    #[arg(long)]
    no_prelude: bool,
    /// 実行する行（複数可）。指定すると対話ループに入らない
    #[arg(short = 'e', long = "eval", value_name = "LINE")]
    eval: Vec<String>,
    /// バッチ実行の結果を 1 行 1 オブジェクトの JSON で出す
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> SessionConfig {
        let mut config = SessionConfig::default();
        if let Some(n) = self.eval_steps {
            config.eval_steps = n;
        }
        if let Some(n) = self.max_steps {
            config.max_steps = n;
        }
        if self.strict {
            config.free_variables = FreeVariables::Reject;
        }
        config.require_types = self.require_types;
        if let Some(algo) = self.algo {
            config.algorithm = algo;
        }
        config.prelude = !self.no_prelude;
        config
    }
}

/// `COMBINATORX_LOG`、なければ `RUST_LOG`、どちらもなければ warn。
fn init_tracing() {
    let filter = EnvFilter::try_from_env("COMBINATORX_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let mut session = match Session::new(cli.config()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if cli.eval.is_empty() {
        run_repl(session);
        return ExitCode::SUCCESS;
    }
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    match run_batch(&mut session, &cli.eval, cli.json, &mut stdout, &mut stderr) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("出力エラー: {}", e);
            ExitCode::FAILURE
        }
    }
}
