use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel as channel;
use fsplit_core::{
    run, InputEncodingChoice, LineOverflow, OutputEncodingChoice, SplitMode, SplitOutcome,
    SplitRequest, UnencodablePolicy,
};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "fsplit", version, about = "文本文件分割工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 按字符数 / 行数 / 份数 / 正则命中分割文本文件
    Split {
        /// 输入文件路径
        #[arg(long)]
        input: PathBuf,

        /// 输出目录（默认为输入文件所在目录）
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// 分割模式：chars、lines、parts 或 regex
        #[arg(long, default_value = "chars", value_parser = ["chars", "lines", "parts", "regex"])]
        mode: String,

        /// 大小参数：每文件字符数（chars）/ 每文件行数（lines）/ 总份数（parts）
        #[arg(long)]
        size: Option<u64>,

        /// chars 模式下按整行装箱，不在行中间截断
        #[arg(long)]
        by_line: bool,

        /// 整行装箱的溢出策略：strict 或 flexible
        #[arg(long, value_parser = ["strict", "flexible"])]
        line_mode: Option<String>,

        /// regex 模式的分割模式串
        #[arg(long)]
        pattern: Option<String>,

        /// regex 模式下把命中文本保留为独立分片
        #[arg(long)]
        keep_delimiter: bool,

        /// 输入编码：auto 或具体编码名（如 utf-8、gbk）
        #[arg(long)]
        input_encoding: Option<String>,

        /// 输出编码：same（同输入）、system（系统默认）或具体编码名
        #[arg(long)]
        output_encoding: Option<String>,

        /// 输出编码无法表示字符时的处置：replace（写 ?）或 fail
        #[arg(long, default_value = "replace", value_parser = ["replace", "fail"])]
        on_unencodable: String,

        /// 默认值文件路径（TOML），默认 ./fsplit.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// 默认值文件（./fsplit.toml）；缺失的键落到内置默认
#[derive(Debug, Clone, Default, Deserialize)]
struct Defaults {
    #[serde(default)]
    chars_per_file: Option<u64>,
    #[serde(default)]
    input_encoding: Option<String>,
    #[serde(default)]
    output_encoding: Option<String>,
    #[serde(default)]
    split_by_line: Option<bool>,
    #[serde(default)]
    line_mode: Option<String>,
}

/// 引擎工作线程发往渲染线程的事件
enum Event {
    Progress(f64),
    Log(String),
    Done(fsplit_core::Result<SplitOutcome>),
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Split {
            input,
            output_dir,
            mode,
            size,
            by_line,
            line_mode,
            pattern,
            keep_delimiter,
            input_encoding,
            output_encoding,
            on_unencodable,
            config,
        } => {
            // 默认值文件的键可被命令行参数覆盖：参数 > 文件 > 内置
            let config_path = config.unwrap_or_else(|| PathBuf::from("./fsplit.toml"));
            let defaults = load_defaults(&config_path)?;

            let output_dir = output_dir.unwrap_or_else(|| parent_dir(&input));
            let mode = build_mode(
                &mode,
                size,
                by_line,
                line_mode,
                pattern,
                keep_delimiter,
                &defaults,
            )?;
            let input_label = input_encoding
                .or(defaults.input_encoding)
                .unwrap_or_else(|| "auto".to_string());
            let output_label = output_encoding
                .or(defaults.output_encoding)
                .unwrap_or_else(|| "same".to_string());

            let request = SplitRequest {
                input_path: input.clone(),
                output_dir: output_dir.clone(),
                mode,
                input_encoding: InputEncodingChoice::parse_label(&input_label)
                    .with_context(|| format!("未知的输入编码: {input_label}"))?,
                output_encoding: OutputEncodingChoice::parse_label(&output_label)
                    .with_context(|| format!("未知的输出编码: {output_label}"))?,
                on_unencodable: match on_unencodable.as_str() {
                    "fail" => UnencodablePolicy::Fail,
                    _ => UnencodablePolicy::Replace,
                },
            };

            info!(?input, ?output_dir, "starting split");
            let outcome = run_on_worker(request)?;
            info!(files_created = outcome.files_created, "split finished");
        }
    }

    Ok(())
}

/// 在后台线程运行引擎，主线程渲染进度与日志
/// 回调在工作线程同步触发，经有界通道转发到这里，引擎不被渲染阻塞感知。
fn run_on_worker(request: SplitRequest) -> Result<SplitOutcome> {
    let (tx, rx) = channel::bounded::<Event>(256);

    let tx_progress = tx.clone();
    let tx_log = tx.clone();
    let worker = std::thread::spawn(move || {
        let mut progress = move |p: f64| {
            let _ = tx_progress.send(Event::Progress(p));
        };
        let mut log = move |m: &str| {
            let _ = tx_log.send(Event::Log(m.to_string()));
        };
        let result = run(&request, &mut progress, &mut log);
        let _ = tx.send(Event::Done(result));
    });

    let mut done = None;
    while let Ok(event) = rx.recv() {
        match event {
            Event::Progress(p) => {
                eprint!("\r进度: {p:.1}%");
                let _ = std::io::stderr().flush();
            }
            Event::Log(line) => info!("{line}"),
            Event::Done(result) => {
                done = Some(result);
                break;
            }
        }
    }
    eprintln!();
    let _ = worker.join();

    match done {
        Some(result) => result.context("split failed"),
        None => bail!("工作线程未返回结果即退出"),
    }
}

/// 组装分割模式；chars 模式的大小可落到默认值文件，其余模式必须显式给出
fn build_mode(
    mode: &str,
    size: Option<u64>,
    by_line: bool,
    line_mode: Option<String>,
    pattern: Option<String>,
    keep_delimiter: bool,
    defaults: &Defaults,
) -> Result<SplitMode> {
    match mode {
        "lines" => Ok(SplitMode::LineCount {
            lines_per_file: size.context("lines 模式需要 --size 指定每文件行数")?,
        }),
        "parts" => Ok(SplitMode::Partition {
            total_parts: size.context("parts 模式需要 --size 指定总份数")?,
        }),
        "regex" => Ok(SplitMode::Regex {
            pattern: pattern.context("regex 模式需要 --pattern 指定模式串")?,
            keep_delimiter,
        }),
        _ => {
            let chars_per_file = size.or(defaults.chars_per_file).unwrap_or(1000);
            let line_aware = if by_line || defaults.split_by_line.unwrap_or(false) {
                let policy = line_mode
                    .or_else(|| defaults.line_mode.clone())
                    .unwrap_or_else(|| "strict".to_string());
                Some(match policy.as_str() {
                    "flexible" => LineOverflow::Flexible,
                    _ => LineOverflow::Strict,
                })
            } else {
                None
            };
            Ok(SplitMode::FixedChars {
                chars_per_file,
                line_aware,
            })
        }
    }
}

/// 加载默认值文件；文件不存在按全空处理，所有键落到内置默认
fn load_defaults(path: &Path) -> Result<Defaults> {
    if !path.is_file() {
        return Ok(Defaults::default());
    }
    let txt = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&txt).with_context(|| format!("parse config {}", path.display()))
}

/// 输入文件所在目录；相对裸文件名落到当前目录
fn parent_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
