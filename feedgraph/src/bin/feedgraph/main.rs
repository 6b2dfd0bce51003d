mod commands;
mod context;
mod examples;
mod output;
mod theme;

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, RgbColor, Style},
    },
};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};
use log::info;

use feedgraph::{Backend, Failure, GraphError, GraphStore, MemoryStore, RedisStore, Settings};

use commands::{
    comment::{CommentCommands, handle_comment_commands},
    feed::{FeedCommands, handle_feed_commands},
    post::{AudioCommands, PostCommands, handle_audio_commands, handle_post_commands},
    user::{UserCommands, handle_block, handle_follow, handle_user_commands},
};
use context::Session;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("REDIS_URL", "Redis connection URL used when the config keeps the ${REDIS_URL} placeholder"),
    ("RUST_LOG", "Log filter, e.g. feedgraph=debug"),
];

#[derive(Parser)]
#[command(name = "feedgraph")]
#[command(version)]
#[command(
    about = "Operator CLI for the feedgraph social graph engine",
    long_about = r#"Operator CLI for the feedgraph social graph engine.

Runs graph operations against the store configured in feedgraph.toml
(or .feedgraph/config.toml), acting as the user given with --as.

Commands:
  user      Register users, patch profiles, manage follow requests
  follow    Toggle following a user
  block     Toggle blocking a user
  audio     Register and inspect audio tracks
  post      Create, publish, update and engage with posts
  comment   Comment, reply and render comment trees
  feed      Read feeds through the visibility rules
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Path to the settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User id to act as
    #[arg(long = "as", global = true, value_name = "USER_ID")]
    acting_as: Option<String>,

    /// Act with the admin role
    #[arg(long, global = true)]
    admin: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Users, profiles and follow requests
    #[command(subcommand)]
    User(UserCommands),

    /// Follow, unfollow, request or cancel a request
    Follow { target_id: String },

    /// Block or unblock a user
    Block { target_id: String },

    /// Audio tracks
    #[command(subcommand)]
    Audio(AudioCommands),

    /// Posts and drafts
    #[command(subcommand)]
    Post(PostCommands),

    /// Comments and replies
    #[command(subcommand)]
    Comment(CommentCommands),

    /// Feeds and listings
    #[command(subcommand)]
    Feed(FeedCommands),
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let mut command = Cli::command()
        .after_long_help(render_top_level_appendix(use_color))
        .styles(help_styles())
        .color(if use_color { ColorChoice::Auto } else { ColorChoice::Never });
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let updated = subcommand.clone().after_long_help(render_examples(example.groups, use_color));
            *subcommand = updated;
        }
    }
    command
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "{}", stylize("Examples:", THEME.highlight, true, use_color));
    for (index, group) in groups.iter().enumerate() {
        let _ = writeln!(buffer, "  {}", stylize(group.title, THEME.primary, true, use_color));
        for command in group.commands {
            let arrow = stylize(ICONS.arrow, THEME.secondary, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {}", stylize(command, THEME.secondary, false, use_color));
        }
        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }
    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "{}", stylize("Environment Variables:", THEME.highlight, true, use_color));
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, THEME.key, true, use_color);
        let _ = writeln!(buffer, "  {key_text}  {}", stylize(description, THEME.value, false, use_color));
    }
    buffer.push('\n');
    let tip = stylize(
        "Use 'feedgraph <command> --help' to view examples for each command.",
        THEME.secondary,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{} {tip}", stylize("Tip:", THEME.highlight, true, use_color));
    buffer
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let styled = text.color(color);
    if bold { styled.bold().to_string() } else { styled.to_string() }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

fn help_styles() -> Styles {
    Styles::styled()
        .usage(style_from_color(THEME.primary).bold())
        .header(style_from_color(THEME.highlight).bold())
        .literal(style_from_color(THEME.secondary))
        .placeholder(style_from_color(THEME.muted))
        .valid(style_from_color(THEME.success))
        .invalid(style_from_color(THEME.warning))
        .error(style_from_color(THEME.error).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    Style::new().fg_color(Some(color_to_clap_color(color)))
}

fn color_to_clap_color(color: ThemeColor) -> ClapColor {
    match color {
        ThemeColor::Black => ClapColor::Ansi(AnsiColor::Black),
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Yellow => ClapColor::Ansi(AnsiColor::Yellow),
        ThemeColor::Blue => ClapColor::Ansi(AnsiColor::Blue),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightRed => ClapColor::Ansi(AnsiColor::BrightRed),
        ThemeColor::BrightGreen => ClapColor::Ansi(AnsiColor::BrightGreen),
        ThemeColor::BrightYellow => ClapColor::Ansi(AnsiColor::BrightYellow),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightMagenta => ClapColor::Ansi(AnsiColor::BrightMagenta),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        ThemeColor::BrightWhite => ClapColor::Ansi(AnsiColor::BrightWhite),
        ThemeColor::TrueColor { r, g, b } => ClapColor::Rgb(RgbColor(r, g, b)),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let matches = build_cli_command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    if let Err(err) = execute(cli, &output).await {
        match err.downcast_ref::<GraphError>() {
            Some(graph_err) => output.failure(&Failure::from_error(graph_err)),
            None => output.error(&format!("{err:#}")),
        }
        std::process::exit(1);
    }
}

async fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    match settings.store.backend {
        Backend::Redis => {
            let url = settings.redis_url()?;
            let store = RedisStore::connect(&url, settings.store.prefix.clone()).await?;
            info!("connected to redis with prefix {}", store.prefix());
            run(store, &settings, cli, output).await
        }
        Backend::Memory => {
            output.warning("Using the in-memory store; changes are discarded when the command exits");
            let store = MemoryStore::new(settings.store.prefix.clone());
            run(store, &settings, cli, output).await
        }
    }
}

async fn run<S: GraphStore>(store: S, settings: &Settings, cli: Cli, output: &OutputManager) -> Result<()> {
    let session = Session::new(store, settings, cli.acting_as, cli.admin);
    match cli.command {
        Commands::User(command) => handle_user_commands(command, &session, output).await,
        Commands::Follow { target_id } => handle_follow(&target_id, &session, output).await,
        Commands::Block { target_id } => handle_block(&target_id, &session, output).await,
        Commands::Audio(command) => handle_audio_commands(command, &session, output).await,
        Commands::Post(command) => handle_post_commands(command, &session, output).await,
        Commands::Comment(command) => handle_comment_commands(command, &session, output).await,
        Commands::Feed(command) => handle_feed_commands(command, &session, output).await,
    }
}
