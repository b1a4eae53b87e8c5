//! Directory batch run: archives first, then standalone PDFs, then the
//! merged aggregate.
//!
//! Per-document failures are printed and logged and never stop the run;
//! only failing to create the output directory or to list the input
//! directory is fatal.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use billplumber::{
    RecordSet, ReportSummary, TableSettings, merge, parse_statement_bytes, write_html, write_xlsx,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::archive::{self, has_extension};
use crate::password::{MAX_PASSWORD_ATTEMPTS, PasswordAttempts, PasswordSource, next_non_empty};

/// Base name of the aggregate outputs.
pub const MERGED_BASE: &str = "merged_bill";

const PASSWORD_PROMPT: &str = "请输入解压密码: ";

/// State threaded through one batch run.
pub struct RunContext<'a> {
    /// Last password that opened an archive; reused for later archives and
    /// as the PDF fallback password.
    pub password: Option<String>,
    pub source: &'a mut dyn PasswordSource,
    pub settings: TableSettings,
    pub output: PathBuf,
    pub report: bool,
}

/// What a run produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Documents that yielded a record set.
    pub documents: usize,
    pub skipped_archives: usize,
    pub merged: bool,
}

/// Run the batch over `input`.
///
/// # Errors
///
/// Fails when the input directory cannot be created or listed, or the output
/// directory cannot be created.
pub fn run_batch(input: &Path, ctx: &mut RunContext<'_>) -> anyhow::Result<BatchOutcome> {
    println!("=== 微信支付账单批处理解析器 ===");
    let mut outcome = BatchOutcome::default();

    if !input.exists() {
        fs::create_dir_all(input)
            .with_context(|| format!("cannot create input directory {}", input.display()))?;
        println!(
            "提示: 已创建 {} 目录，请将 ZIP 或 PDF 文件放入其中后再次运行。",
            input.display()
        );
        return Ok(outcome);
    }

    fs::create_dir_all(&ctx.output)
        .with_context(|| format!("cannot create output directory {}", ctx.output.display()))?;

    let zips = list_files(input, "zip")?;
    let pdfs = list_files(input, "pdf")?;
    if zips.is_empty() && pdfs.is_empty() {
        println!("错误: 在 {} 目录中未找到 .zip 或 .pdf 文件", input.display());
        return Ok(outcome);
    }
    info!(zips = zips.len(), pdfs = pdfs.len(), "input scanned");

    let mut record_sets: Vec<RecordSet> = Vec::new();

    for zip_path in &zips {
        println!("\n[处理压缩包] {}", file_name(zip_path));
        match process_archive(zip_path, ctx) {
            Some(found) => record_sets.extend(found),
            None => outcome.skipped_archives += 1,
        }
    }

    for pdf_path in &pdfs {
        println!("\n[处理独立 PDF] {}", file_name(pdf_path));
        record_sets.extend(process_pdf(pdf_path, ctx));
    }

    outcome.documents = record_sets.len();
    if record_sets.len() > 1 {
        println!("\n--- 正在生成合并汇总报告 ---");
        if let Some(merged) = merge(record_sets) {
            export(&merged, MERGED_BASE, ctx);
            outcome.merged = true;
        }
    }

    println!("\n=== 所有任务处理完成 ===");
    Ok(outcome)
}

/// Files in `dir` with extension `ext` (any case), sorted by name.
fn list_files(dir: &Path, ext: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("cannot read directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract an archive and parse the PDFs inside.
///
/// `None` when the archive was skipped.
fn process_archive(path: &Path, ctx: &mut RunContext<'_>) -> Option<Vec<RecordSet>> {
    let temp = match tempfile::tempdir() {
        Ok(temp) => temp,
        Err(err) => {
            println!("  错误: 无法创建临时目录: {err}");
            error!(error = %err, "temporary directory");
            return None;
        }
    };

    let extracted = match archive::is_encrypted(path) {
        Ok(false) => archive::extract_archive(path, temp.path(), None)
            .inspect_err(|err| {
                println!("  错误: {err}");
                warn!(archive = %path.display(), error = %err, "extraction failed");
            })
            .ok(),
        Ok(true) => extract_with_retries(path, temp.path(), ctx),
        Err(err) => {
            println!("  错误: {err}");
            warn!(archive = %path.display(), error = %err, "cannot read archive");
            None
        }
    }?;

    let pdfs: Vec<&PathBuf> = extracted
        .iter()
        .filter(|p| has_extension(p, "pdf"))
        .collect();
    if pdfs.is_empty() {
        println!("  警告: 压缩包内未找到 PDF 文件");
        warn!(archive = %path.display(), "no PDF in archive");
    }

    Some(pdfs.into_iter().filter_map(|pdf| process_pdf(pdf, ctx)).collect())
}

/// The password retry loop for an encrypted archive.
fn extract_with_retries(path: &Path, dest: &Path, ctx: &mut RunContext<'_>) -> Option<Vec<PathBuf>> {
    let mut attempts = PasswordAttempts::new(MAX_PASSWORD_ATTEMPTS);
    let mut candidate = ctx.password.clone();

    while let Some(attempt) = attempts.begin() {
        let Some(password) = candidate
            .take()
            .filter(|p| !p.is_empty())
            .or_else(|| next_non_empty(ctx.source, PASSWORD_PROMPT))
        else {
            println!("  未提供密码，跳过该文件。");
            attempts.exhaust();
            break;
        };

        match archive::extract_archive(path, dest, Some(&password)) {
            Ok(files) => {
                debug!(archive = %path.display(), attempt, "archive opened");
                ctx.password = Some(password.clone());
                attempts.succeed(password);
                return Some(files);
            }
            Err(err) => {
                println!("  错误: {err}");
                warn!(archive = %path.display(), attempt, error = %err, "extraction failed");
                match attempts.fail() {
                    0 => println!("  跳过该文件。"),
                    left => println!("  请重试密码 (剩余次数: {left})"),
                }
            }
        }
    }
    None
}

fn page_progress() -> ProgressBar {
    let style = ProgressStyle::with_template("  {bar:30.cyan/blue} {pos}/{len} 页")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    ProgressBar::new(0).with_style(style)
}

/// Parse one statement and export it; `None` when nothing was recognized.
fn process_pdf(path: &Path, ctx: &RunContext<'_>) -> Option<RecordSet> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            println!("  解析 PDF 失败: {err}");
            warn!(pdf = %path.display(), error = %err, "read failed");
            return None;
        }
    };

    let progress = page_progress();
    let parsed = parse_statement_bytes(
        &bytes,
        ctx.password.as_deref(),
        &ctx.settings,
        |done, total| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
        },
    );
    progress.finish_and_clear();

    let statement = match parsed {
        Ok(statement) => statement,
        Err(err) => {
            println!("  解析 PDF 失败: {err}");
            warn!(pdf = %path.display(), error = %err, "parse failed");
            return None;
        }
    };
    if !statement.warnings.is_empty() {
        debug!(pdf = %path.display(), warnings = statement.warnings.len(), "extraction warnings");
    }

    let Some(records) = statement.records else {
        println!("  提示: {} 中未识别出交易数据", file_name(path));
        return None;
    };

    let base = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bill".to_string());
    export(&records, &base, ctx);
    Some(records)
}

/// Write `<base>.xlsx` and, unless disabled, `<base>.html`.
fn export(records: &RecordSet, base: &str, ctx: &RunContext<'_>) {
    let xlsx = ctx.output.join(format!("{base}.xlsx"));
    match write_xlsx(records, &xlsx) {
        Ok(()) => println!("  成功导出: {}", xlsx.display()),
        Err(err) => {
            println!("  导出 Excel 失败: {err}");
            error!(path = %xlsx.display(), error = %err, "xlsx export failed");
        }
    }

    if !ctx.report {
        return;
    }
    let html = ctx.output.join(format!("{base}.html"));
    let Some(summary) = ReportSummary::from_record_set(records) else {
        println!("  提示: 缺少交易时间或金额数据，未生成可视化报表");
        return;
    };
    match write_html(&summary, &html) {
        Ok(()) => println!("  可视化报表已生成: {}", html.display()),
        Err(err) => {
            println!("  生成可视化报表失败: {err}");
            error!(path = %html.display(), error = %err, "report failed");
        }
    }
}
