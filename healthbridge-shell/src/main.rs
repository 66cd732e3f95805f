//! HealthBridge 命令行客户端

mod commands;
mod render;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use healthbridge_admin::{init_logging, ConfigManager, SystemManager};
use healthbridge_core::RandomIdGenerator;
use healthbridge_session::SessionRuntime;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::commands::{parse_line, ConfigCommand, ShellCommand, HELP};
use crate::render::{render_screen, render_triage};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "healthbridge-shell")]
#[command(about = "HealthBridge 远程问诊客户端（命令行）")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    /// 从文件读取命令
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// 医生日程使用的日期 (YYYY-MM-DD)，默认为本地日期
    #[arg(long)]
    today: Option<NaiveDate>,
}

enum Flow {
    Continue,
    Quit,
}

struct Shell {
    system: SystemManager,
    runtime: SessionRuntime,
    today: NaiveDate,
}

impl Shell {
    fn show(&mut self) {
        self.runtime.drain();
        print!("{}", render_screen(&self.runtime.screen(self.today)));
    }

    async fn execute(&mut self, command: ShellCommand) -> Result<Flow> {
        match command {
            ShellCommand::Session(command) => {
                self.runtime.drain();
                self.runtime.dispatch(command);
                tokio::task::yield_now().await;
                self.show();
            }
            ShellCommand::Wait(None) => {
                self.runtime.settle_all().await;
                self.show();
            }
            ShellCommand::Wait(Some(duration)) => {
                tokio::time::sleep(duration).await;
                self.show();
            }
            ShellCommand::Triage(symptoms) => {
                let assessment = self.system.generative().triage(&symptoms).await;
                print!("{}", render_triage(assessment.as_ref()));
            }
            ShellCommand::Media(mode) => {
                self.system.set_media_mode(mode);
                println!("Simulated media devices: {:?}", mode);
            }
            ShellCommand::Show => self.show(),
            ShellCommand::Config(command) => self.configure(command).await?,
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn configure(&self, command: ConfigCommand) -> Result<()> {
        let manager = self.system.config_manager();
        match command {
            ConfigCommand::Show(None) => print!("{}", manager.render_toml().await?),
            ConfigCommand::Show(Some(path)) => {
                let value: serde_json::Value = manager.get_value(&path).await?;
                println!("{} = {}", path, value);
            }
            ConfigCommand::Set { path, value } => {
                manager.set_value(&path, value).await?;
                self.apply_live_settings().await;
                println!("{} updated", path);
            }
            ConfigCommand::Reload => {
                manager.reload_config().await?;
                self.apply_live_settings().await;
                println!("Configuration reloaded");
            }
            ConfigCommand::Save(path) => {
                manager.save_to(&path).await?;
                println!("Configuration saved to {}", path.display());
            }
        }
        Ok(())
    }

    /// 模拟设备行为可以在运行中切换，其余设置在下次启动时生效
    async fn apply_live_settings(&self) {
        let config = self.system.config_manager().get_config().await;
        self.system.set_media_mode(config.media.simulate);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager =
        ConfigManager::load(args.config.as_deref()).context("Failed to load configuration")?;
    let config = config_manager.get_config().await;
    init_logging(&config.logging, args.log_level.as_deref())?;

    info!("Starting HealthBridge shell");
    let system = SystemManager::from_manager(config_manager).await?;
    let runtime = system.build_runtime(Box::new(RandomIdGenerator)).await;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let mut shell = Shell {
        system,
        runtime,
        today,
    };

    shell.runtime.start();
    shell.show();
    shell.runtime.settle_all().await;
    shell.show();

    let input: Box<dyn AsyncBufRead + Unpin> = match &args.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let echo = args.script.is_some();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if echo && !line.trim().is_empty() {
            println!("> {}", line.trim());
        }
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("error: {}", e);
                continue;
            }
        };

        match shell.execute(command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => {
                warn!("Command failed: {:#}", e);
                println!("error: {:#}", e);
            }
        }
    }

    info!("HealthBridge shell exiting");
    Ok(())
}
