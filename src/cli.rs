//! Command-line front end for the dashboard.

use crate::api::{ApiClient, Error as ApiError};
use crate::auth::SessionStore;
use crate::config::Config;
use crate::dashboard::{Dashboard, Table, ViewState};
use crate::model::{
    DEFAULT_SCHEDULE, DEFAULT_TIMEOUT_SECS, LogPage, NewShellTask, Task, TaskLog,
    format_timestamp,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

/// Width used when the terminal size is unknown.
const DEFAULT_WIDTH: usize = 100;

/// Dashboard for the GoDo task scheduling service
#[derive(Parser, Debug)]
#[command(name = "godo", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend origin, e.g. http://localhost:8080 (overrides config)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and remember the session
    Login(LoginArgs),
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List, create, run, and delete scheduled tasks
    Tasks(TasksArgs),
    /// Manage uploaded script files
    Files(FilesArgs),
    /// Browse execution logs
    Logs(LogsArgs),
    /// View configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct LoginArgs {
    pub username: String,

    /// Password (read from stdin when omitted)
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Parser, Debug)]
pub struct TasksArgs {
    #[command(subcommand)]
    pub action: Option<TaskAction>,
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// List tasks (default)
    List,
    /// Create a shell task
    Add(AddTaskArgs),
    /// Run a task now
    Run { task_id: String },
    /// Delete a task
    Delete { task_id: String },
}

#[derive(Parser, Debug)]
pub struct AddTaskArgs {
    /// Task name
    #[arg(long)]
    pub name: String,

    /// Command to execute
    #[arg(long)]
    pub command: String,

    /// Space-separated arguments
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub args: String,

    /// Cron expression (with seconds)
    #[arg(long, default_value = DEFAULT_SCHEDULE)]
    pub schedule: String,

    /// Timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Execute the command directly instead of through a shell
    #[arg(long)]
    pub no_shell: bool,
}

impl From<AddTaskArgs> for NewShellTask {
    fn from(args: AddTaskArgs) -> Self {
        Self {
            task_name: args.name,
            description: args.description,
            command: args.command,
            args: NewShellTask::split_args(&args.args),
            scheduled_time: args.schedule,
            timeout: args.timeout,
            use_shell: !args.no_shell,
        }
    }
}

#[derive(Parser, Debug)]
pub struct FilesArgs {
    #[command(subcommand)]
    pub action: Option<FileAction>,
}

#[derive(Subcommand, Debug)]
pub enum FileAction {
    /// List uploaded files (default)
    List,
    /// Upload a script
    Upload { path: PathBuf },
    /// Delete an uploaded file
    Delete { file_name: String },
}

#[derive(Parser, Debug)]
pub struct LogsArgs {
    /// Page number, starting at 1
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,

    /// Show full details for one log entry on the page
    #[arg(long, value_name = "LOG_ID")]
    pub show: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective configuration (default)
    Show,
    /// Show config file path
    Path,
}

/// Initialize logging. `GODO_LOG` writes debug logs to `godo.log`; otherwise
/// `RUST_LOG` goes to stderr.
pub fn init_logging() {
    if std::env::var("GODO_LOG").is_ok() {
        use std::fs::File;
        use tracing_subscriber::prelude::*;
        match File::create("godo.log") {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false);
                let filter = tracing_subscriber::EnvFilter::new("godo=debug");
                let _ = tracing_subscriber::registry()
                    .with(file_layer.with_filter(filter))
                    .try_init();
            }
            Err(err) => {
                eprintln!("Failed to create log file: {err}");
            }
        }
    } else if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .try_init();
    }
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> ExitCode {
    match run_inner(cli).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<ApiError>() {
                Some(api) if api.is_unauthorized() => {
                    eprintln!("Unauthorized. Run `godo login <username>` to sign in again.");
                }
                _ => eprintln!("Error: {e:#}"),
            }
            ExitCode::from(1)
        }
    }
}

async fn run_inner(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load().context("Failed to load config")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let command = match cli.command {
        Commands::Config(args) => {
            return Ok(show_config(&config, args.action.unwrap_or(ConfigAction::Show)));
        }
        command => command,
    };

    let store = SessionStore::at(config.session_file());
    let client = ApiClient::new(&config, store)?;
    let mut dash = Dashboard::new(client, &config);
    let authenticated = dash.start()?;

    match command {
        Commands::Login(args) => {
            let password = match args.password {
                Some(password) => password,
                None => read_password()?,
            };
            let session = dash.login(&args.username, &password).await?;
            println!("Logged in as {}", session.username);
        }
        Commands::Logout => {
            dash.logout()?;
            println!("Logged out");
        }
        Commands::Whoami => match dash.session() {
            Some(session) => println!("{}", session.username),
            None => {
                println!("Not logged in");
                return Ok(ExitCode::from(1));
            }
        },
        command => {
            if !authenticated {
                eprintln!("Not logged in. Run `godo login <username>` first.");
                return Ok(ExitCode::from(1));
            }
            dispatch(&mut dash, command).await?;
        }
    }

    Ok(ExitCode::from(0))
}

async fn dispatch(dash: &mut Dashboard, command: Commands) -> Result<()> {
    let width = terminal_width();
    match command {
        Commands::Tasks(args) => {
            dash.set_view(ViewState::Tasks);
            match args.action.unwrap_or(TaskAction::List) {
                TaskAction::List => {
                    let tasks = dash.refresh_tasks().await?;
                    print_lines(&render_tasks(tasks, width));
                }
                TaskAction::Add(args) => {
                    let added = dash.create_task(&args.into()).await?;
                    println!("Created task {}", added.task_id);
                }
                TaskAction::Run { task_id } => {
                    dash.run_task(&task_id).await?;
                    println!("Triggered task {task_id}");
                }
                TaskAction::Delete { task_id } => {
                    dash.delete_task(&task_id).await?;
                    println!("Deleted task {task_id}");
                }
            }
        }
        Commands::Files(args) => {
            dash.set_view(ViewState::Files);
            match args.action.unwrap_or(FileAction::List) {
                FileAction::List => {
                    let files = dash.refresh_files().await?;
                    print_lines(&render_files(files, width));
                }
                FileAction::Upload { path } => {
                    let uploaded = dash.upload_file(&path).await?;
                    println!("Uploaded {}", uploaded.file_name);
                }
                FileAction::Delete { file_name } => {
                    dash.delete_file(&file_name).await?;
                    println!("Deleted {file_name}");
                }
            }
        }
        Commands::Logs(args) => {
            dash.set_view(ViewState::Logs);
            dash.fetch_logs(args.page).await?;
            match args.show {
                Some(id) => match dash.find_log(id) {
                    Some(log) => print_lines(&render_log_details(log)),
                    None => anyhow::bail!("Log {id} is not on page {}", dash.log_page()),
                },
                None => print_lines(&render_logs(
                    dash.logs(),
                    dash.log_page(),
                    dash.log_page_size(),
                    width,
                )),
            }
        }
        Commands::Login(_) | Commands::Logout | Commands::Whoami | Commands::Config(_) => {}
    }
    Ok(())
}

fn show_config(config: &Config, action: ConfigAction) -> ExitCode {
    match action {
        ConfigAction::Path => {
            println!("{}", crate::config::godo_config_dir().join("config.toml").display());
        }
        ConfigAction::Show => {
            println!("base_url: {}", config.base_url);
            println!("request_timeout_secs: {}", config.request_timeout_secs);
            println!("connect_timeout_secs: {}", config.connect_timeout_secs);
            println!("max_upload_bytes: {}", config.max_upload_bytes);
            println!("log_page_size: {}", config.log_page_size);
            println!("session_path: {}", config.session_file().display());
        }
    }
    ExitCode::from(0)
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .filter(|&c: &usize| c > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

#[must_use]
pub fn render_tasks(tasks: &[Task], width: usize) -> Vec<String> {
    if tasks.is_empty() {
        return vec!["No tasks found".to_string()];
    }
    let mut table = Table::new(["ID", "Name", "Schedule", "Command", "Owner"]);
    for task in tasks {
        table.push_row([
            task.id.clone(),
            task.task_name.clone(),
            task.scheduled_time.clone(),
            task.job.summary(),
            task.owner_name.clone(),
        ]);
    }
    table.render(width)
}

#[must_use]
pub fn render_files(files: &[String], width: usize) -> Vec<String> {
    if files.is_empty() {
        return vec!["No files uploaded".to_string()];
    }
    let mut table = Table::new(["File"]);
    for file in files {
        table.push_row([file.clone()]);
    }
    table.render(width)
}

#[must_use]
pub fn render_logs(page: &LogPage, current: u32, page_size: u32, width: usize) -> Vec<String> {
    if page.list.is_empty() {
        return vec!["No execution logs found".to_string()];
    }
    let mut table = Table::new(["ID", "Status", "Task", "Command", "Started", "Finished"]);
    for log in &page.list {
        table.push_row([
            log.id.to_string(),
            log.status().title().to_string(),
            log.name.clone(),
            log.content.summary(),
            format_timestamp(&log.start_time),
            format_timestamp(&log.end_time),
        ]);
    }
    let mut lines = table.render(width);
    lines.push(format!(
        "Page {current} of {} ({} total)",
        page.total_pages(page_size).max(1),
        page.total
    ));
    lines
}

#[must_use]
pub fn render_log_details(log: &TaskLog) -> Vec<String> {
    let mut lines = vec![
        format!("Log {} ({})", log.id, log.status()),
        format!("Task:     {} ({})", log.name, log.task_id),
        format!("Started:  {}", format_timestamp(&log.start_time)),
        format!("Finished: {}", format_timestamp(&log.end_time)),
        String::new(),
        "Job:".to_string(),
    ];
    match log.content.fields() {
        Some(fields) => lines.extend(fields.into_iter().map(|(k, v)| format!("  {k}: {v}"))),
        None => lines.push(format!("  {}", log.content.summary())),
    }

    lines.push(String::new());
    lines.push("Output:".to_string());
    if log.output.is_empty() {
        lines.push("  (none)".to_string());
    } else {
        lines.extend(log.output.lines().map(|l| format!("  {l}")));
    }
    if !log.err_output.is_empty() {
        lines.push(String::new());
        lines.push("Error output:".to_string());
        lines.extend(log.err_output.lines().map(|l| format!("  {l}")));
    }
    lines
}
