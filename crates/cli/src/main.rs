use std::io::{self, stdout, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use crossterm::style::Color;
use device_deck_cli::cli_args::Args;
use device_deck_cli::display::{format_catalog, write_colored, write_event};
use device_deck_cli::provider::TerminalProvider;
use device_deck_cli::selection::find_template;
use device_deck_core::command_definitions::CommandTemplate;
use device_deck_core::error::{Error, Result};
use device_deck_core::execution::{CompletionEvent, RunEvent};
use device_deck_core::resolution::{ParameterResolver, Resolution, ResolvedCommand};
use device_deck_core::supervisor::RunSupervisor;
use device_deck_core::{config, file_handling};
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const INTERACTIVE_PROMPT: &str = "deck> ";

fn notice(color: Color, message: &str) {
    let mut stdout = stdout().lock();
    if let Err(e) = write_colored(&mut stdout, Some(color), &format!("{message}\n")) {
        warn!("Could not write to the terminal: {e}");
    }
}

fn print_event(event: &RunEvent) {
    let mut stdout = stdout().lock();
    if let Err(e) = write_event(&mut stdout, event) {
        warn!("Could not write run event: {e}");
    }
}

fn spawn_printer(mut events: mpsc::UnboundedReceiver<RunEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    })
}

/// Runs the blocking prompts on a worker thread so streamed output keeps flowing.
async fn resolve(resolver: &ParameterResolver, template: &CommandTemplate) -> Result<Resolution> {
    let resolver = resolver.clone();
    let template = template.clone();

    tokio::task::spawn_blocking(move || {
        let mut provider = TerminalProvider::stdio();
        resolver.resolve(&template, &mut provider)
    })
    .await
    .map_err(|e| Error::Misc(format!("Parameter prompt failed: {e}")))?
}

async fn read_line(prompt: &'static str) -> Result<Option<String>> {
    tokio::task::spawn_blocking(move || -> Result<Option<String>> {
        print!("{prompt}");
        stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    })
    .await
    .map_err(|e| Error::Misc(format!("Reading input failed: {e}")))?
}

/// Returns the command to submit, or `None` when nothing should run.
async fn prepare(
    args: &Args,
    resolver: &ParameterResolver,
    template: &CommandTemplate,
) -> Result<Option<ResolvedCommand>> {
    match resolve(resolver, template).await? {
        Resolution::Cancelled(reason) => {
            notice(Color::Yellow, &reason);
            Ok(None)
        }
        Resolution::Resolved(command) if args.dry_run => {
            println!("Dry run is specified, not executing:\n{}", command.command_line);
            Ok(None)
        }
        Resolution::Resolved(command) => Ok(Some(command)),
    }
}

fn exit_code(completion: &CompletionEvent) -> ExitCode {
    if completion.success() {
        return ExitCode::SUCCESS;
    }

    completion
        .exit_code
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .map_or(ExitCode::FAILURE, ExitCode::from)
}

async fn run_once(
    args: &Args,
    catalog: &[CommandTemplate],
    selector: &str,
    supervisor: &mut RunSupervisor,
) -> Result<ExitCode> {
    let template = find_template(catalog, selector)?;
    debug!("Selected command: {template}");

    let Some(command) = prepare(args, &ParameterResolver::new(), template).await? else {
        return Ok(ExitCode::SUCCESS);
    };

    supervisor.submit(command).await;
    Ok(supervisor
        .wait()
        .await
        .map_or(ExitCode::SUCCESS, |completion| exit_code(&completion)))
}

async fn run_interactive(
    args: &Args,
    catalog: &[CommandTemplate],
    supervisor: &mut RunSupervisor,
) -> Result<ExitCode> {
    let resolver = ParameterResolver::new();
    println!("{}", format_catalog(catalog));
    println!("Type a command name or index, `list`, `stop` or `quit`.");

    while let Some(line) = read_line(INTERACTIVE_PROMPT).await? {
        match line.as_str() {
            "" => {}
            "quit" | "exit" => break,
            "list" => println!("{}", format_catalog(catalog)),
            "stop" => {
                if supervisor.cancel().await.is_none() {
                    notice(Color::Yellow, "Nothing is running");
                }
            }
            selector => {
                let template = match find_template(catalog, selector) {
                    Ok(template) => template,
                    Err(e) => {
                        notice(Color::Red, &e.to_string());
                        continue;
                    }
                };

                match prepare(args, &resolver, template).await {
                    Ok(Some(command)) => {
                        supervisor.submit(command).await;
                    }
                    Ok(None) => {}
                    Err(e) => notice(Color::Red, &e.to_string()),
                }
            }
        }
    }

    supervisor.cancel().await;
    Ok(ExitCode::SUCCESS)
}

async fn execute(args: Args) -> Result<ExitCode> {
    let config_path = config::get_config_path(args.config_path.as_deref());
    debug!("Config path: `{config_path}`");

    let catalog = file_handling::get_catalog_or_default(&config_path)?;

    if args.list {
        println!("{}", format_catalog(&catalog));
        return Ok(ExitCode::SUCCESS);
    }

    let (events, receiver) = mpsc::unbounded_channel();
    let printer = spawn_printer(receiver);
    let mut supervisor = RunSupervisor::new(args.supervisor_settings()?, events);

    let result = match &args.command {
        Some(selector) => run_once(&args, &catalog, selector, &mut supervisor).await,
        None => run_interactive(&args, &catalog, &mut supervisor).await,
    };

    // Closing the last sender lets the printer drain and stop.
    drop(supervisor);
    if let Err(e) = printer.await {
        warn!("Output printer stopped abnormally: {e}");
    }

    result
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match execute(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
