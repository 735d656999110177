use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use ratatui::DefaultTerminal;

use mtag::app::App;
use mtag::catalogue::CatalogueKind;
use mtag::commands;
use mtag::config::Config;
use mtag::error::{MtagError, Result};
use mtag::logger;
use mtag::ui::render_app;

#[derive(Parser)]
#[command(name = "mtag")]
#[command(about = "Merge-tag catalogue and template editor", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (defaults to ~/.config/mtag/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalogues to layer, in order; overrides the config file
    #[arg(short, long = "catalogue", global = true, value_enum, value_delimiter = ',')]
    catalogues: Vec<CatalogueKind>,

    /// Template document to edit
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Edit templates with merge-tag autocomplete (default)
    Edit,
    /// Print every merge tag with its breadcrumbs, token and sample
    List,
    /// Print sample values keyed by tag key as JSON
    Samples,
    /// Print the catalogue tree as JSON
    Export,
    /// Render a template file with sample values
    Preview { file: PathBuf },
    /// Report tags in a template file that the catalogue does not define
    Check { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "mtag failed");
            eprintln!("mtag: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(&cli.catalogues, cli.templates.as_deref())?;

    let command = cli.command.unwrap_or(Command::Edit);
    match &command {
        Command::Edit => logger::init_file_logger(&config.log_path()?, cli.verbose)?,
        _ => logger::init_cli_logger(cli.verbose)?,
    }
    tracing::debug!(catalogues = ?config.catalogues, "configuration resolved");

    let merge_tags = config.merge_tags()?;
    match command {
        Command::Edit => {
            let templates_path = config.templates_path()?;
            run_editor(App::new(&config, merge_tags, templates_path))?;
        }
        Command::List => {
            for line in commands::list_lines(&merge_tags) {
                println!("{line}");
            }
        }
        Command::Samples => println!("{}", commands::samples_json(&merge_tags)?),
        Command::Export => println!("{}", commands::export_json(&merge_tags)?),
        Command::Preview { file } => {
            print!("{}", commands::preview(&read_template(&file)?, &merge_tags));
        }
        Command::Check { file } => {
            let report = commands::check(&read_template(&file)?, &merge_tags);
            for line in report.lines(&file) {
                println!("{line}");
            }
            return Ok(ExitCode::from(report.exit_code()));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_editor(app: App) -> Result<()> {
    let terminal = ratatui::init();
    execute!(io::stdout(), EnableMouseCapture)?;

    let result = run_app(terminal, app);

    execute!(io::stdout(), DisableMouseCapture)?;
    ratatui::restore();
    result
}

fn run_app(mut terminal: DefaultTerminal, mut app: App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    loop {
        terminal.draw(|frame| render_app(frame, &mut app))?;

        if app.should_quit {
            break;
        }

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press {
                        app.on_key(key);
                    }
                }
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }
    Ok(())
}

fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| MtagError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mtag", "check", "letter.md", "--catalogue", "base,pod", "--templates", "t.md",
        ])
        .unwrap();
        assert_eq!(cli.catalogues, vec![CatalogueKind::Base, CatalogueKind::Pod]);
        assert_eq!(cli.templates, Some(PathBuf::from("t.md")));
        assert!(matches!(cli.command, Some(Command::Check { file }) if file == PathBuf::from("letter.md")));
    }

    #[test]
    fn no_subcommand_means_edit() {
        let cli = Cli::try_parse_from(["mtag", "-c", "run"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.catalogues, vec![CatalogueKind::Run]);
    }
}
