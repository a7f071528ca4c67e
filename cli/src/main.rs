mod commands;
mod config;
mod logging;
mod mcp;
mod server;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    cmd_food_add, cmd_food_lookup, cmd_goal_set, cmd_goal_show, cmd_info, cmd_log, cmd_meals,
};
use crate::config::Config;
use crate::mcp::McpServer;
use macro_tracker_core::models::{Macros, MealType};
use macro_tracker_core::{NutritionStore, StoreConfig};

#[derive(Parser)]
#[command(
    name = "macro-tracker",
    version,
    about = "Track daily macro goals, reference foods and meals"
)]
struct Cli {
    /// Path to the store file (default: per-user data directory)
    #[arg(long, global = true, env = "MACRO_TRACKER_DB", value_name = "PATH")]
    db: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct MacroArgs {
    /// Calories
    #[arg(long, allow_negative_numbers = true)]
    calories: f64,
    /// Protein in grams
    #[arg(long, allow_negative_numbers = true)]
    protein: f64,
    /// Carbohydrates in grams
    #[arg(long, allow_negative_numbers = true)]
    carbs: f64,
    /// Fat in grams
    #[arg(long, allow_negative_numbers = true)]
    fat: f64,
}

impl From<MacroArgs> for Macros {
    fn from(m: MacroArgs) -> Self {
        Macros::new(m.calories, m.protein, m.carbs, m.fat)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Manage daily macro goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Manage the food reference database (values per 100g)
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Log food intake with macros already calculated for the portion
    Log {
        /// Name of the food eaten
        food: String,
        /// Portion description (e.g. "200g", "1 cup", "1 medium apple")
        portion: String,
        #[command(flatten)]
        totals: MacroArgs,
        /// Meal type: breakfast, lunch, dinner, snack, other
        #[arg(short, long, default_value = "other")]
        meal: MealType,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Review the meals logged for a day, grouped by meal type
    Meals {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show store location, size and contents
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Serve the tools over MCP stdio, or over HTTP with --http
    Serve {
        /// Serve HTTP instead of MCP stdio
        #[arg(long)]
        http: bool,
        /// Port to listen on
        #[arg(short, long, default_value = "8080", requires = "http")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1", requires = "http")]
        bind: String,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Set the macro goals for a day, replacing any already set
    Set {
        #[command(flatten)]
        targets: MacroArgs,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the macro goals for a day
    Show {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a food with its values per 100g
    Add {
        /// Food name (must be unique)
        name: String,
        #[command(flatten)]
        per_100g: MacroArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List foods, or those whose name contains the query
    Lookup {
        /// Name or part of a name
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    logging::init(default_level, cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db)?;
    let store = NutritionStore::new(StoreConfig::new(&config.db_path));

    if !matches!(cli.command, Commands::Info { .. }) {
        store.initialize().with_context(|| {
            format!("Failed to initialize store at {}", config.db_path.display())
        })?;
    }

    match cli.command {
        Commands::Goal { command } => match command {
            GoalCommands::Set {
                targets,
                date,
                json,
            } => cmd_goal_set(&store, targets.into(), date.as_deref(), json),
            GoalCommands::Show { date, json } => cmd_goal_show(&store, date.as_deref(), json),
        },
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                per_100g,
                json,
            } => cmd_food_add(&store, &name, per_100g.into(), json),
            FoodCommands::Lookup { name, json } => cmd_food_lookup(&store, name.as_deref(), json),
        },
        Commands::Log {
            food,
            portion,
            totals,
            meal,
            date,
            json,
        } => cmd_log(
            &store,
            &food,
            &portion,
            totals.into(),
            meal,
            date.as_deref(),
            json,
        ),
        Commands::Meals { date, json } => cmd_meals(&store, date.as_deref(), json),
        Commands::Info { json } => cmd_info(&store, json),
        Commands::Serve { http, port, bind } => {
            if http {
                server::start_server(store, port, &bind).await
            } else {
                McpServer::new(store).run_stdio().await
            }
        }
    }
}
