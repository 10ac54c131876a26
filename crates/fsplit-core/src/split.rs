//! 分割主流程与五种分割算法
use encoding_rs::Encoding;
use regex::Regex;
use std::path::Path;

use crate::count::{count_chars, count_lines};
use crate::encoding::resolve_encodings;
use crate::error::{Result, SplitError};
use crate::options::{LineOverflow, SplitMode, SplitOutcome, SplitRequest};
use crate::sinks::{LogSink, ProgressSink};
use crate::stream::DecodedStream;
use crate::writer::{ChunkWriter, PartFile, PartInfo};

/// 执行一次分割请求，返回实际创建的分片文件数
/// 流程保证：
/// - 参数校验（含正则编译）先于任何 I/O；输入文件检查先于创建输出目录。
/// - 单次前向流式遍历输入；分片按 1 起始连续编号落盘。
/// - 每写出一个分片至少汇报一次进度，百分比单调不减，结束时补一次 100。
pub fn run(
    request: &SplitRequest,
    progress: &mut dyn ProgressSink,
    log: &mut dyn LogSink,
) -> Result<SplitOutcome> {
    let plan = SplitPlan::from_mode(&request.mode)?;

    // 输入必须是常规文件，在创建输出目录之前检出
    if !request.input_path.is_file() {
        return Err(SplitError::InputNotFound(request.input_path.clone()));
    }

    let resolved = resolve_encodings(
        &request.input_path,
        request.input_encoding,
        request.output_encoding,
        log,
    )?;
    std::fs::create_dir_all(&request.output_dir)?;

    let writer = ChunkWriter::new(
        &request.output_dir,
        &request.input_path,
        resolved.output,
        request.on_unencodable,
    );
    let input = request.input_path.as_path();
    let enc = resolved.input;

    let files_created = match plan {
        SplitPlan::FixedRaw { chars_per_file } => {
            split_fixed_raw(input, enc, chars_per_file, &writer, progress, log)?
        }
        SplitPlan::FixedLines {
            chars_per_file,
            policy,
        } => split_fixed_lines(input, enc, chars_per_file, policy, &writer, progress, log)?,
        SplitPlan::LineCount { lines_per_file } => {
            split_line_count(input, enc, lines_per_file, &writer, progress, log)?
        }
        SplitPlan::Partition { total_parts } => {
            split_partition(input, enc, total_parts, &writer, progress, log)?
        }
        SplitPlan::Regex { re, keep_delimiter } => {
            split_regex(input, enc, &re, keep_delimiter, &writer, progress, log)?
        }
    };

    progress.progress(100.0);
    Ok(SplitOutcome { files_created })
}

/// 校验后的执行计划；正则在这里完成编译
enum SplitPlan {
    FixedRaw {
        chars_per_file: u64,
    },
    FixedLines {
        chars_per_file: u64,
        policy: LineOverflow,
    },
    LineCount {
        lines_per_file: u64,
    },
    Partition {
        total_parts: u64,
    },
    Regex {
        re: Regex,
        keep_delimiter: bool,
    },
}

impl SplitPlan {
    /// 参数校验，发生在任何 I/O 之前
    fn from_mode(mode: &SplitMode) -> Result<Self> {
        match mode {
            SplitMode::FixedChars {
                chars_per_file,
                line_aware,
            } => {
                if *chars_per_file == 0 {
                    return Err(SplitError::InvalidParameter(
                        "每个文件的字符数必须为正整数".into(),
                    ));
                }
                Ok(match line_aware {
                    None => SplitPlan::FixedRaw {
                        chars_per_file: *chars_per_file,
                    },
                    Some(policy) => SplitPlan::FixedLines {
                        chars_per_file: *chars_per_file,
                        policy: *policy,
                    },
                })
            }
            SplitMode::LineCount { lines_per_file } => {
                if *lines_per_file == 0 {
                    return Err(SplitError::InvalidParameter(
                        "每个文件的行数必须为正整数".into(),
                    ));
                }
                Ok(SplitPlan::LineCount {
                    lines_per_file: *lines_per_file,
                })
            }
            SplitMode::Partition { total_parts } => {
                if *total_parts == 0 {
                    return Err(SplitError::InvalidParameter("分割份数必须为正整数".into()));
                }
                Ok(SplitPlan::Partition {
                    total_parts: *total_parts,
                })
            }
            SplitMode::Regex {
                pattern,
                keep_delimiter,
            } => Ok(SplitPlan::Regex {
                re: Regex::new(pattern)?,
                keep_delimiter: *keep_delimiter,
            }),
        }
    }
}

/// 原始定长模式：每片恰好 `chars_per_file` 个字符，行可能在中间截断
fn split_fixed_raw(
    input: &Path,
    encoding: &'static Encoding,
    chars_per_file: u64,
    writer: &ChunkWriter,
    progress: &mut dyn ProgressSink,
    log: &mut dyn LogSink,
) -> Result<u64> {
    let total_chars = precount_chars(input, encoding, log)?;
    let num_files = total_chars.div_ceil(chars_per_file);
    log.log(&format!("将分割为 {} 个文件", num_files));
    log.log("开始分割文件...");

    let mut stream = DecodedStream::open(input, encoding)?;
    for index in 1..=num_files {
        let chunk = stream.read_chars(chars_per_file)?;
        flush_part(writer, index, &chunk, log)?;
        report_ratio(progress, index, num_files);
    }
    Ok(num_files)
}

/// 整行装箱的定长模式，溢出处置见 [`LineOverflow`]
/// 两种策略下，单独一行超过上限时都自成一片、不再拆行。
fn split_fixed_lines(
    input: &Path,
    encoding: &'static Encoding,
    chars_per_file: u64,
    policy: LineOverflow,
    writer: &ChunkWriter,
    progress: &mut dyn ProgressSink,
    log: &mut dyn LogSink,
) -> Result<u64> {
    let total_chars = precount_chars(input, encoding, log)?;
    // 整行装箱下实际片数可能多于这个估计，进度相应封顶在 100
    let expected = total_chars.div_ceil(chars_per_file);
    log.log(&format!("预计分割为 {} 个文件", expected));
    log.log("开始分割文件...");

    let mut stream = DecodedStream::open(input, encoding)?;
    let mut buf = String::new();
    let mut buf_chars: u64 = 0;
    let mut created: u64 = 0;

    while let Some(line) = stream.next_line()? {
        let line_chars = line.chars().count() as u64;
        // Strict：先判断再追加，装不下的行整体推迟到下一片
        if policy == LineOverflow::Strict
            && buf_chars > 0
            && buf_chars + line_chars > chars_per_file
        {
            created += 1;
            flush_part(writer, created, &buf, log)?;
            report_ratio(progress, created, expected);
            buf.clear();
            buf_chars = 0;
        }
        buf.push_str(&line);
        buf_chars += line_chars;
        // Flexible：先追加，见顶即关闭当前片
        if policy == LineOverflow::Flexible && buf_chars >= chars_per_file {
            created += 1;
            flush_part(writer, created, &buf, log)?;
            report_ratio(progress, created, expected);
            buf.clear();
            buf_chars = 0;
        }
    }
    if !buf.is_empty() {
        created += 1;
        flush_part(writer, created, &buf, log)?;
        report_ratio(progress, created, expected);
    }
    Ok(created)
}

/// 按固定行数分片；同一时间只保有一个输出句柄，片界处换新句柄
fn split_line_count(
    input: &Path,
    encoding: &'static Encoding,
    lines_per_file: u64,
    writer: &ChunkWriter,
    progress: &mut dyn ProgressSink,
    log: &mut dyn LogSink,
) -> Result<u64> {
    log.log("正在计算文件总行数...");
    let total_lines = count_lines(input, encoding)?;
    log.log(&format!("文件总行数: {}", total_lines));
    let num_files = total_lines.div_ceil(lines_per_file);
    log.log(&format!("将分割为 {} 个文件", num_files));
    log.log("开始分割文件...");

    let mut stream = DecodedStream::open(input, encoding)?;
    let mut part: Option<PartFile> = None;
    let mut lines_in_part: u64 = 0;
    let mut line_no: u64 = 0;
    let mut created: u64 = 0;

    while let Some(line) = stream.next_line()? {
        line_no += 1;
        if part.is_none() {
            part = Some(writer.open_part(created + 1)?);
        }
        if let Some(open) = part.as_mut() {
            open.write_str(&line)?;
        }
        lines_in_part += 1;
        if lines_in_part == lines_per_file {
            if let Some(open) = part.take() {
                let info = open.finish()?;
                created += 1;
                log_part(&info, log);
            }
            lines_in_part = 0;
        }
        report_ratio(progress, line_no, total_lines);
    }
    if let Some(open) = part.take() {
        let info = open.finish()?;
        created += 1;
        log_part(&info, log);
    }
    Ok(created)
}

/// 均分为 N 份：前 `total_chars mod N` 份各多一个字符，与行边界无关
/// 字符先于份数耗尽时提前停止，只写出非空的前缀分片。
fn split_partition(
    input: &Path,
    encoding: &'static Encoding,
    total_parts: u64,
    writer: &ChunkWriter,
    progress: &mut dyn ProgressSink,
    log: &mut dyn LogSink,
) -> Result<u64> {
    let total_chars = precount_chars(input, encoding, log)?;
    let base = total_chars / total_parts;
    let remainder = total_chars % total_parts;
    // base 为 0 时只有前 remainder 份有内容
    let expected = if base > 0 { total_parts } else { remainder };
    log.log(&format!("将分割为 {} 个文件", expected));
    log.log("开始分割文件...");

    let mut stream = DecodedStream::open(input, encoding)?;
    let mut created: u64 = 0;
    for i in 1..=total_parts {
        let quota = base + u64::from(i <= remainder);
        if quota == 0 {
            break;
        }
        let chunk = stream.read_chars(quota)?;
        if chunk.is_empty() {
            break;
        }
        created += 1;
        flush_part(writer, created, &chunk, log)?;
        report_ratio(progress, created, expected);
    }
    Ok(created)
}

/// 在每个正则命中处切开；命中永不跨行（逐行匹配，属既定行为）
/// `keep_delimiter` 为 true 时命中文本单独成片，否则从输出中剔除。
fn split_regex(
    input: &Path,
    encoding: &'static Encoding,
    re: &Regex,
    keep_delimiter: bool,
    writer: &ChunkWriter,
    progress: &mut dyn ProgressSink,
    log: &mut dyn LogSink,
) -> Result<u64> {
    // 片数事先未知，进度按已消费字符的占比汇报
    let total_chars = precount_chars(input, encoding, log)?;
    log.log("开始分割文件...");

    let mut stream = DecodedStream::open(input, encoding)?;
    let mut pending = String::new();
    let mut seen_chars: u64 = 0;
    let mut created: u64 = 0;

    while let Some(line) = stream.next_line()? {
        seen_chars += line.chars().count() as u64;
        let mut tail = 0usize;
        for m in re.find_iter(&line) {
            // 空宽度命中不切分，避免产出空分片
            if m.start() == m.end() {
                continue;
            }
            pending.push_str(&line[tail..m.start()]);
            if !pending.is_empty() {
                created += 1;
                flush_part(writer, created, &pending, log)?;
                pending.clear();
                report_ratio(progress, seen_chars, total_chars);
            }
            if keep_delimiter {
                created += 1;
                flush_part(writer, created, m.as_str(), log)?;
                report_ratio(progress, seen_chars, total_chars);
            }
            tail = m.end();
        }
        pending.push_str(&line[tail..]);
    }
    if !pending.is_empty() {
        created += 1;
        flush_part(writer, created, &pending, log)?;
        report_ratio(progress, seen_chars, total_chars);
    }
    Ok(created)
}

/// 预统计总字符数并记录日志（定长、均分、正则模式共用）
fn precount_chars(
    input: &Path,
    encoding: &'static Encoding,
    log: &mut dyn LogSink,
) -> Result<u64> {
    log.log("正在计算文件总字符数...");
    let total = count_chars(input, encoding)?;
    log.log(&format!("文件总字符数: {}", total));
    Ok(total)
}

/// 写出一个整片并记录日志
fn flush_part(writer: &ChunkWriter, index: u64, text: &str, log: &mut dyn LogSink) -> Result<()> {
    let info = writer.write_part(index, text)?;
    log_part(&info, log);
    Ok(())
}

/// 分片落盘后的统一日志行
fn log_part(info: &PartInfo, log: &mut dyn LogSink) {
    let name = info
        .path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    log.log(&format!("已创建分割文件: {} ({} 字符)", name, info.chars));
}

/// 按比例汇报进度；分母为 0 时（空输入）不汇报
fn report_ratio(progress: &mut dyn ProgressSink, done: u64, expected: u64) {
    if expected > 0 {
        progress.progress((done as f64 / expected as f64 * 100.0).min(100.0));
    }
}
