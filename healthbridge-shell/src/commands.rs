//! 命令行解析
//!
//! 每行一条命令，`#` 开头的行为注释。

use anyhow::{anyhow, bail, Result};
use healthbridge_core::UserRole;
use healthbridge_integration::SimulationMode;
use healthbridge_session::{Command, Tab};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// 交互命令
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// 交给会话引擎的命令
    Session(Command),
    /// 不带参数时等待所有在途操作完成，否则等待指定毫秒
    Wait(Option<Duration>),
    Triage(String),
    /// 切换模拟设备行为
    Media(SimulationMode),
    Show,
    Config(ConfigCommand),
    Help,
    Quit,
}

/// 配置相关命令
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigCommand {
    /// 输出整份配置或单个路径的值
    Show(Option<String>),
    /// 按路径修改配置，值按JSON解析，失败时当作字符串
    Set { path: String, value: Value },
    /// 从配置文件和环境变量重新加载
    Reload,
    Save(PathBuf),
}

pub const HELP: &str = "\
Commands:
  role <patient|doctor|admin>      choose a role and open sign-up
  signup <name> <email>            complete sign-up
  back                             return to the login screen
  signout                          sign out
  tab <dashboard|appointments|records|profile>
  book <doctor_id> <date> <time>   date as YYYY-MM-DD
  summarize <record_id>            request an AI summary
  call <appointment_id>            join a video call
  retry | mute | camera | end      call controls
  media <available|denied|absent|unsupported>
  wait [ms]                        wait for pending work
  triage <symptoms>                ask for a triage assessment
  show                             render the current screen
  config [path]                    print configuration
  config set <path> <value>        change a configuration value
  config reload                    reload the configuration file
  config save <file>               write the configuration as TOML
  quit";

/// 解析一行输入；空行和注释返回 `None`
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "role" => {
            let role: UserRole = required(rest, "role")?.parse()?;
            ShellCommand::Session(Command::SelectRole(role))
        }
        "signup" => {
            let (name, email) = rest
                .rsplit_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("usage: signup <name> <email>"))?;
            ShellCommand::Session(Command::CompleteSignUp {
                name: name.trim().to_string(),
                email: email.trim().to_string(),
            })
        }
        "back" => ShellCommand::Session(Command::BackToLogin),
        "signout" => ShellCommand::Session(Command::SignOut),
        "tab" => {
            let tab: Tab = required(rest, "tab")?.parse()?;
            ShellCommand::Session(Command::SetActiveTab(tab))
        }
        "book" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(doctor_id), Some(date), Some(time)) if !doctor_id.is_empty() => {
                    ShellCommand::Session(Command::BookAppointment {
                        doctor_id: doctor_id.to_string(),
                        date: date.to_string(),
                        time: time.trim().to_string(),
                    })
                }
                _ => bail!("usage: book <doctor_id> <date> <time>"),
            }
        }
        "summarize" => ShellCommand::Session(Command::Summarize {
            record_id: required(rest, "record id")?.to_string(),
        }),
        "call" => ShellCommand::Session(Command::StartCall {
            appointment_id: required(rest, "appointment id")?.to_string(),
        }),
        "retry" => ShellCommand::Session(Command::RetryMedia),
        "mute" => ShellCommand::Session(Command::ToggleAudio),
        "camera" => ShellCommand::Session(Command::ToggleVideo),
        "end" => ShellCommand::Session(Command::EndCall),
        "media" => {
            let mode = required(rest, "media mode")?
                .parse::<SimulationMode>()
                .map_err(|e| anyhow!(e))?;
            ShellCommand::Media(mode)
        }
        "wait" if rest.is_empty() => ShellCommand::Wait(None),
        "wait" => {
            let millis: u64 = rest
                .parse()
                .map_err(|_| anyhow!("wait expects milliseconds, got {}", rest))?;
            ShellCommand::Wait(Some(Duration::from_millis(millis)))
        }
        "triage" => ShellCommand::Triage(required(rest, "symptoms")?.to_string()),
        "show" => ShellCommand::Show,
        "config" => ShellCommand::Config(parse_config(rest)?),
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => bail!("unknown command: {} (try 'help')", other),
    };

    Ok(Some(command))
}

fn parse_config(rest: &str) -> Result<ConfigCommand> {
    let (sub, args) = match rest.split_once(char::is_whitespace) {
        Some((sub, args)) => (sub, args.trim()),
        None => (rest, ""),
    };

    let command = match sub {
        "" => ConfigCommand::Show(None),
        "set" => {
            let (path, raw) = args
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("usage: config set <path> <value>"))?;
            let raw = raw.trim();
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            ConfigCommand::Set {
                path: path.to_string(),
                value,
            }
        }
        "reload" => ConfigCommand::Reload,
        "save" => ConfigCommand::Save(PathBuf::from(required(args, "file path")?)),
        path => ConfigCommand::Show(Some(path.to_string())),
    };
    Ok(command)
}

fn required<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    if value.is_empty() {
        bail!("missing {}", what);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ShellCommand {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   # book later").unwrap().is_none());
    }

    #[test]
    fn test_signup_keeps_multi_word_names() {
        assert_eq!(
            parse("signup Jane van Dyke jane@example.com"),
            ShellCommand::Session(Command::CompleteSignUp {
                name: "Jane van Dyke".to_string(),
                email: "jane@example.com".to_string(),
            })
        );
        assert!(parse_line("signup jane").is_err());
    }

    #[test]
    fn test_book_takes_rest_as_time() {
        assert_eq!(
            parse("book doc2 2024-11-02 10:30 AM"),
            ShellCommand::Session(Command::BookAppointment {
                doctor_id: "doc2".to_string(),
                date: "2024-11-02".to_string(),
                time: "10:30 AM".to_string(),
            })
        );
        assert!(parse_line("book doc2 2024-11-02").is_err());
    }

    #[test]
    fn test_roles_tabs_and_controls() {
        assert_eq!(parse("role Doctor"), ShellCommand::Session(Command::SelectRole(UserRole::Doctor)));
        assert_eq!(parse("tab History"), ShellCommand::Session(Command::SetActiveTab(Tab::Records)));
        assert_eq!(parse("mute"), ShellCommand::Session(Command::ToggleAudio));
        assert_eq!(parse("camera"), ShellCommand::Session(Command::ToggleVideo));
        assert_eq!(parse("media denied"), ShellCommand::Media(SimulationMode::Denied));
        assert!(parse_line("role nurse").is_err());
        assert!(parse_line("tab").is_err());
    }

    #[test]
    fn test_wait_and_config() {
        assert_eq!(parse("wait"), ShellCommand::Wait(None));
        assert_eq!(parse("wait 1500"), ShellCommand::Wait(Some(Duration::from_millis(1500))));
        assert!(parse_line("wait soon").is_err());
        assert_eq!(parse("config"), ShellCommand::Config(ConfigCommand::Show(None)));
        assert_eq!(
            parse("config media.width"),
            ShellCommand::Config(ConfigCommand::Show(Some("media.width".to_string())))
        );
    }

    #[test]
    fn test_config_subcommands() {
        assert_eq!(
            parse("config set app.splash_delay_ms 100"),
            ShellCommand::Config(ConfigCommand::Set {
                path: "app.splash_delay_ms".to_string(),
                value: Value::from(100),
            })
        );
        assert_eq!(
            parse("config set summarizer.model gemini-2.5-pro"),
            ShellCommand::Config(ConfigCommand::Set {
                path: "summarizer.model".to_string(),
                value: Value::String("gemini-2.5-pro".to_string()),
            })
        );
        assert_eq!(
            parse("config set media.audio false"),
            ShellCommand::Config(ConfigCommand::Set {
                path: "media.audio".to_string(),
                value: Value::Bool(false),
            })
        );
        assert!(parse_line("config set media.audio").is_err());
        assert_eq!(parse("config reload"), ShellCommand::Config(ConfigCommand::Reload));
        assert_eq!(
            parse("config save out.toml"),
            ShellCommand::Config(ConfigCommand::Save(PathBuf::from("out.toml")))
        );
        assert!(parse_line("config save").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_line("teleport").unwrap_err();
        assert!(err.to_string().contains("unknown command"));
    }
}
