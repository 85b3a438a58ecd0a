use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use student_records::{export_json, load, summarize, Config, RecordError, RecordStore, Shell, ShellExit};

#[derive(Parser)]
#[command(name = "student_records")]
#[command(about = "学生成绩管理系统：添加、查询、编辑、统计并保存学生记录")]
#[command(version)]
struct Cli {
    /// TOML配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 记录文件路径（覆盖配置文件中的 data_file）
    #[arg(short, long)]
    data_file: Option<PathBuf>,

    /// 打印成绩统计报告后退出
    #[arg(long)]
    stats: bool,

    /// 将全部记录和统计报告导出为JSON文件后退出
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// 静默模式(仅输出错误)
    #[arg(long)]
    quiet: bool,

    /// 日志级别（error/warn/info/debug/trace）
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level);

    let config = Config::resolve(cli.config.as_deref(), cli.data_file.as_deref())
        .context("加载配置失败")?;
    info!(data_file = %config.data_file.display(), policy = ?config.grade_policy, "configuration resolved");

    if cli.stats {
        return handle_stats(&config);
    }

    if let Some(export_path) = &cli.export_json {
        return handle_export(&cli, &config, export_path);
    }

    handle_interactive(&cli, &config)
}

/// 初始化日志（输出到stderr，不读取环境变量）
fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(format!("student_records={}", level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("student_records=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// 读取记录文件，供非交互模式使用
fn load_required(config: &Config) -> anyhow::Result<RecordStore> {
    let outcome = load(&config.data_file, config.grade_policy)
        .with_context(|| format!("读取记录文件失败: {:?}", config.data_file))?;
    Ok(outcome.store)
}

/// 处理统计报告模式
fn handle_stats(config: &Config) -> anyhow::Result<ExitCode> {
    let store = load_required(config)?;

    match summarize(&store) {
        Some(report) => print!("{}", report),
        None => println!("没有学生，无法生成报告！"),
    }
    Ok(ExitCode::SUCCESS)
}

/// 处理JSON导出模式
fn handle_export(cli: &Cli, config: &Config, export_path: &Path) -> anyhow::Result<ExitCode> {
    let store = load_required(config)?;

    let json_output = export_json(&store).context("序列化JSON失败")?;
    std::fs::write(export_path, json_output)
        .with_context(|| format!("写入文件失败: {:?}", export_path))?;

    if !cli.quiet {
        println!("已导出 {} 条学生记录到: {:?}", store.len(), export_path);
    }
    Ok(ExitCode::SUCCESS)
}

/// 处理交互模式
fn handle_interactive(cli: &Cli, config: &Config) -> anyhow::Result<ExitCode> {
    let store = autoload(cli, config);

    let stdin = std::io::stdin();
    let input = stdin.lock();
    let output = std::io::stdout();

    let mut shell = Shell::new(input, output, store, config.data_file.clone())
        .with_writer(Box::new(student_records::io::CsvStoreWriter::with_backup(
            config.backup_on_save,
        )));

    match shell.run().context("控制台读写失败")? {
        ShellExit::Exit => Ok(ExitCode::SUCCESS),
        ShellExit::LoginFailed => Ok(ExitCode::FAILURE),
    }
}

/// 启动时加载已有记录；失败时提示并以空存储继续
fn autoload(cli: &Cli, config: &Config) -> RecordStore {
    let empty = RecordStore::with_policy(config.grade_policy);
    if !config.autoload {
        return empty;
    }

    match load(&config.data_file, config.grade_policy) {
        Ok(outcome) => {
            if !cli.quiet {
                println!(
                    "已从 {:?} 加载 {} 条学生记录",
                    config.data_file,
                    outcome.store.len()
                );
            }
            outcome.store
        }
        Err(RecordError::FileNotFound(_)) => empty,
        Err(e) => {
            warn!(error = %e, "autoload failed, starting with an empty store");
            eprintln!("加载已有记录失败: {}", e);
            empty
        }
    }
}
