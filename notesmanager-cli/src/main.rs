mod output;
mod settings;

use clap::{Parser, Subcommand};
use notesmanager_core::{
    export_notebook, read_export, register, write_export, NotesError, Result, Session, Storage,
};
use output::Format;
use settings::{load_settings, save_settings, settings_file_path, AppSettings};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "notesmanager",
    version,
    about = "Binders, tabs and notes kept in a local SQLite database"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    format: Format,
    /// Database file (overrides the settings file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// Settings file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Account email (defaults to the last successful login)
    #[arg(long, global = true)]
    email: Option<String>,
    /// Account password
    #[arg(long, global = true)]
    password: Option<String>,
    /// Log library activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty database with the default colors and labels
    Init,
    /// Create an account
    Register {
        /// Display name
        #[arg(long)]
        name: String,
    },
    /// Check credentials and remember the email for later commands
    Login,
    /// Show the notebook as an outline
    Tree {
        /// Only show notes carrying this label
        #[arg(long)]
        label: Option<String>,
    },
    /// Manage binders
    #[command(subcommand)]
    Binder(BinderCommand),
    /// Manage tabs
    #[command(subcommand)]
    Tab(TabCommand),
    /// Manage notes
    #[command(subcommand)]
    Note(NoteCommand),
    /// Manage labels
    #[command(subcommand)]
    Labels(LabelsCommand),
    /// Manage colors
    #[command(subcommand)]
    Colors(ColorsCommand),
    /// Write the notebook to a JSON file
    Export {
        path: PathBuf,
        /// Only export notes carrying this label
        #[arg(long)]
        label: Option<String>,
    },
    /// Add the binders of a JSON export to this account
    Import { path: PathBuf },
    /// Inspect or change settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum BinderCommand {
    /// Create a binder (with a default tab)
    Add {
        name: String,
        /// Color id or name
        #[arg(long)]
        color: Option<String>,
    },
    Rename { id: i64, name: String },
    /// Set a color by id or name, or clear it with "none"
    Color { id: i64, color: String },
    /// Delete a binder with all its tabs and notes
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum TabCommand {
    Add {
        binder: i64,
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    Rename { id: i64, name: String },
    Color { id: i64, color: String },
    /// Delete a tab with all its notes
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum NoteCommand {
    Add {
        tab: i64,
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    Rename { id: i64, name: String },
    Color { id: i64, color: String },
    /// Replace the note body
    Edit {
        id: i64,
        /// New content
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read new content from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Delete { id: i64 },
    /// Attach a label (id or name); a note holds at most two
    Label { id: i64, label: String },
    /// Detach a label (id or name)
    Unlabel { id: i64, label: String },
    Show { id: i64 },
}

#[derive(Subcommand)]
enum LabelsCommand {
    List,
    Add { name: String },
}

#[derive(Subcommand)]
enum ColorsCommand {
    List,
    Add { name: String, hex: String },
}

#[derive(Subcommand)]
enum ConfigCommand {
    Show,
    SetDatabase { path: PathBuf },
}

/// Resolved settings plus where they came from.
struct Context {
    format: Format,
    settings_path: PathBuf,
    settings: AppSettings,
    database: PathBuf,
    email: Option<String>,
    password: Option<String>,
}

impl Context {
    fn from_cli(cli: &Cli) -> Self {
        let settings_path = cli.config.clone().unwrap_or_else(settings_file_path);
        let settings = load_settings(&settings_path);
        let database = cli
            .database
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings.database_path));
        let email = cli.email.clone().or_else(|| settings.last_email.clone());
        Self {
            format: cli.format,
            settings_path,
            settings,
            database,
            email,
            password: cli.password.clone(),
        }
    }

    fn open_storage(&self) -> Result<Storage> {
        if let Some(parent) = self.database.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Storage::open_or_create(&self.database)
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let email = self.email.as_deref().ok_or_else(|| {
            NotesError::ValidationFailed("An email is required (--email)".to_string())
        })?;
        let password = self.password.as_deref().ok_or_else(|| {
            NotesError::ValidationFailed("A password is required (--password)".to_string())
        })?;
        Ok((email, password))
    }

    fn login(&self) -> Result<Session> {
        let (email, password) = self.credentials()?;
        Session::login(self.open_storage()?, email, password)
    }

    fn remember_email(&mut self, email: &str) -> Result<()> {
        if self.settings.last_email.as_deref() != Some(email) {
            self.settings.last_email = Some(email.to_string());
            save_settings(&self.settings_path, &self.settings)?;
        }
        Ok(())
    }
}

/// Resolves a color given as a name, an id, or `none`. Names win over ids.
fn resolve_color(session: &Session, color: Option<&str>) -> Result<Option<i64>> {
    let Some(color) = color else {
        return Ok(None);
    };
    let found = session.colors().find_by_name(color).or_else(|| {
        color
            .parse::<i64>()
            .ok()
            .and_then(|id| session.colors().get(id))
    });
    if found.is_none() && color.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    found
        .map(|c| Some(c.id))
        .ok_or_else(|| NotesError::not_found("Color", color))
}

/// Resolves a label given as a name or an id. Names win over ids.
fn resolve_label(session: &Session, label: &str) -> Result<i64> {
    let found = session.labels().find_by_name(label).or_else(|| {
        label
            .parse::<i64>()
            .ok()
            .and_then(|id| session.labels().get(id))
    });
    found
        .map(|l| l.id)
        .ok_or_else(|| NotesError::not_found("Label", label))
}

fn report_change(changed: bool, what: &'static str, id: i64, format: Format) -> Result<()> {
    if !changed {
        return Err(NotesError::not_found(what, id));
    }
    output::print_value(
        &serde_json::json!({ "id": id, "changed": changed }),
        format,
        || format!("{what} {id} updated"),
    )
}

fn report_created(what: &str, id: i64, format: Format) -> Result<()> {
    output::print_value(&serde_json::json!({ "id": id }), format, || {
        format!("Created {what} {id}")
    })
}

fn run(cli: Cli) -> Result<()> {
    let mut ctx = Context::from_cli(&cli);
    let format = ctx.format;

    match cli.command {
        Commands::Init => {
            if ctx.database.exists() && fs::metadata(&ctx.database)?.len() > 0 {
                Storage::open(&ctx.database)?;
            } else {
                ctx.open_storage()?;
            }
            output::print_value(
                &serde_json::json!({ "database": ctx.database }),
                format,
                || format!("Database ready at {}", ctx.database.display()),
            )?;
        }
        Commands::Register { name } => {
            let (email, password) = ctx.credentials()?;
            let storage = ctx.open_storage()?;
            let user = register(storage.connection(), &name, email, password)?;
            let email = user.email.clone();
            output::print_value(&user, format, || {
                format!("Registered {} <{}> as user {}", user.name, user.email, user.id)
            })?;
            ctx.remember_email(&email)?;
        }
        Commands::Login => {
            let session = ctx.login()?;
            let user = session.user().clone();
            output::print_value(&user, format, || {
                format!("Logged in as {} <{}>", user.name, user.email)
            })?;
            ctx.remember_email(&user.email)?;
        }
        Commands::Tree { label } => {
            let mut session = ctx.login()?;
            if label.is_some() {
                session.set_label_filter(label.as_deref())?;
            }
            output::print_notebook(session.notebook(), session.colors(), format)?;
        }
        Commands::Binder(cmd) => {
            let mut session = ctx.login()?;
            match cmd {
                BinderCommand::Add { name, color } => {
                    let color = resolve_color(&session, color.as_deref())?;
                    let id = session.create_binder(&name, color)?;
                    report_created("binder", id, format)?;
                }
                BinderCommand::Rename { id, name } => {
                    report_change(session.rename_binder(id, &name)?, "Binder", id, format)?;
                }
                BinderCommand::Color { id, color } => {
                    let color = resolve_color(&session, Some(&color))?;
                    report_change(session.set_binder_color(id, color)?, "Binder", id, format)?;
                }
                BinderCommand::Delete { id } => {
                    report_change(session.delete_binder(id)?, "Binder", id, format)?;
                }
            }
        }
        Commands::Tab(cmd) => {
            let mut session = ctx.login()?;
            match cmd {
                TabCommand::Add {
                    binder,
                    name,
                    color,
                } => {
                    let color = resolve_color(&session, color.as_deref())?;
                    let id = session.create_tab(binder, &name, color)?;
                    report_created("tab", id, format)?;
                }
                TabCommand::Rename { id, name } => {
                    report_change(session.rename_tab(id, &name)?, "Tab", id, format)?;
                }
                TabCommand::Color { id, color } => {
                    let color = resolve_color(&session, Some(&color))?;
                    report_change(session.set_tab_color(id, color)?, "Tab", id, format)?;
                }
                TabCommand::Delete { id } => {
                    report_change(session.delete_tab(id)?, "Tab", id, format)?;
                }
            }
        }
        Commands::Note(cmd) => {
            let mut session = ctx.login()?;
            match cmd {
                NoteCommand::Add { tab, name, color } => {
                    let color = resolve_color(&session, color.as_deref())?;
                    let id = session.create_note(tab, &name, color)?;
                    report_created("note", id, format)?;
                }
                NoteCommand::Rename { id, name } => {
                    report_change(session.rename_note(id, &name)?, "Note", id, format)?;
                }
                NoteCommand::Color { id, color } => {
                    let color = resolve_color(&session, Some(&color))?;
                    report_change(session.set_note_color(id, color)?, "Note", id, format)?;
                }
                NoteCommand::Edit { id, content, file } => {
                    let content = match (content, file) {
                        (Some(content), _) => content,
                        (None, Some(file)) => fs::read_to_string(file)?,
                        (None, None) => {
                            return Err(NotesError::ValidationFailed(
                                "Pass --content or --file".to_string(),
                            ))
                        }
                    };
                    report_change(session.update_note_content(id, &content)?, "Note", id, format)?;
                }
                NoteCommand::Delete { id } => {
                    report_change(session.delete_note(id)?, "Note", id, format)?;
                }
                NoteCommand::Label { id, label } => {
                    let label_id = resolve_label(&session, &label)?;
                    let changed = session.attach_label(id, label_id)?;
                    output::print_value(
                        &serde_json::json!({ "id": id, "changed": changed }),
                        format,
                        || match changed {
                            true => format!("Label '{label}' attached to note {id}"),
                            false => format!("Note {id} already has label '{label}'"),
                        },
                    )?;
                }
                NoteCommand::Unlabel { id, label } => {
                    let label_id = resolve_label(&session, &label)?;
                    let changed = session.detach_label(id, label_id)?;
                    output::print_value(
                        &serde_json::json!({ "id": id, "changed": changed }),
                        format,
                        || match changed {
                            true => format!("Label '{label}' removed from note {id}"),
                            false => format!("Note {id} does not have label '{label}'"),
                        },
                    )?;
                }
                NoteCommand::Show { id } => {
                    let note = session
                        .notebook()
                        .note(id)
                        .ok_or_else(|| NotesError::not_found("Note", id))?;
                    output::print_note(note, session.colors(), format)?;
                }
            }
        }
        Commands::Labels(cmd) => {
            let mut session = ctx.login()?;
            match cmd {
                LabelsCommand::List => output::print_labels(session.labels().all(), format)?,
                LabelsCommand::Add { name } => {
                    let label = session.create_label(&name)?;
                    report_created("label", label.id, format)?;
                }
            }
        }
        Commands::Colors(cmd) => {
            let mut session = ctx.login()?;
            match cmd {
                ColorsCommand::List => output::print_colors(session.colors().all(), format)?,
                ColorsCommand::Add { name, hex } => {
                    let color = session.create_color(&name, &hex)?;
                    report_created("color", color.id, format)?;
                }
            }
        }
        Commands::Export { path, label } => {
            let mut session = ctx.login()?;
            if label.is_some() {
                session.set_label_filter(label.as_deref())?;
            }
            let export = export_notebook(&session);
            write_export(&export, &path)?;
            let notes = export.notebook.notes().count();
            output::print_value(
                &serde_json::json!({ "path": path, "binders": export.notebook.binders.len(), "notes": notes }),
                format,
                || format!("Exported {notes} notes to {}", path.display()),
            )?;
        }
        Commands::Import { path } => {
            let export = read_export(&path)?;
            let mut session = ctx.login()?;
            let summary = session.import_notebook(&export)?;
            output::print_value(&summary, format, || {
                format!(
                    "Imported {} binders, {} tabs and {} notes",
                    summary.binders, summary.tabs, summary.notes
                )
            })?;
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommand::Show => {
                let settings = &ctx.settings;
                output::print_value(settings, format, || {
                    format!(
                        "settings: {}\ndatabase: {}\nlast email: {}",
                        ctx.settings_path.display(),
                        settings.database_path,
                        settings.last_email.as_deref().unwrap_or("-")
                    )
                })?;
            }
            ConfigCommand::SetDatabase { path } => {
                ctx.settings.database_path = path.to_string_lossy().to_string();
                save_settings(&ctx.settings_path, &ctx.settings)?;
                output::print_value(&ctx.settings, format, || {
                    format!("Database set to {}", path.display())
                })?;
            }
        },
    }
    Ok(())
}

/// Filter used when `RUST_LOG` is unset: warnings only, library activity with `-v`.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

fn init_logging(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_log_filter(verbose)));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let format = cli.format;
    if let Err(e) = run(cli) {
        log::debug!("command failed: {e}");
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.user_message()
                    })
                );
            }
            Format::Pretty => eprintln!("error: {}", e.user_message()),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_log_filter() {
        assert_eq!(default_log_filter(false), "warn");
        assert_eq!(default_log_filter(true), "info");
    }
}
