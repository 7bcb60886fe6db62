// ==========================================
// 内容排期系统 - 主入口
// ==========================================
// 用法:
//   content-pipeline [--once] [--dry-run] [--db <path>]
//
// 默认按 rerun_interval_minutes 周期性执行全渠道分配，
// --once 只执行一轮后退出。
// ==========================================

use chrono::Local;
use content_pipeline::api::RunAssignmentResponse;
use content_pipeline::app::{get_default_db_path, AppState};
use content_pipeline::logging;

#[derive(Debug, Default)]
struct CliArgs {
    once: bool,
    dry_run: bool,
    db_path: Option<String>,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut out = CliArgs::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--once" => out.once = true,
            "--dry-run" => out.dry_run = true,
            "--db" => {
                let path = args.next().ok_or("--db 缺少路径参数")?;
                out.db_path = Some(path);
            }
            other => return Err(format!("未知参数: {}", other)),
        }
    }
    Ok(out)
}

fn log_summary(response: &RunAssignmentResponse) {
    tracing::info!(
        created = response.created,
        filled = response.filled,
        failed = response.failed,
        already_drafted = response.already_drafted,
        unfilled = response.unfilled.len(),
        warnings = response.warnings.len(),
        dry_run = response.dry_run,
        "本轮分配完成"
    );
    for warning in &response.warnings {
        tracing::warn!(
            schedule_id = %warning.schedule_id,
            "排期规则配置异常: {}",
            warning.message
        );
    }
}

async fn run_once(state: &AppState, dry_run: bool) {
    let today = Local::now().date_naive();
    match state.assignment_api.run_scheduled(today, dry_run).await {
        Ok(response) => log_summary(&response),
        Err(e) => tracing::error!("分配执行失败: {}", e),
    }
}

#[tokio::main]
async fn main() {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", content_pipeline::APP_NAME);
    tracing::info!("系统版本: {}", content_pipeline::VERSION);
    tracing::info!("==================================================");

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    let db_path = args.db_path.clone().unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("无法初始化AppState: {}", e);
            std::process::exit(1);
        }
    };

    if args.once {
        run_once(&state, args.dry_run).await;
        return;
    }

    let period = match state.assignment_api.rerun_interval().await {
        Ok(period) => period,
        Err(e) => {
            tracing::error!("读取重跑间隔失败: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(interval_secs = period.as_secs(), "进入定时分配循环");

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_once(&state, args.dry_run).await,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到退出信号，停止定时分配");
                break;
            }
        }
    }
}
