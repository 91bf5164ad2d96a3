use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use config_finder::ConfigDirs;
use tracing_subscriber::EnvFilter;

use fintrack::{
    compile_regex, config_template, convert, filter_records, highlight, import_json,
    normalize_path, parse_amount, parse_positive_amount, sorted_by, summarize, today,
    validate_amount, validate_category, validate_date, validate_description,
    validate_record_fields, validate_settings, write_export, AppConfig, Field, FieldErrors,
    FileStore, Rates, Record, RecordDate, RecordPatch, RecordStore, Settings, SortKey,
    BASE_CURRENCY,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log what the store is doing.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Add a new record")]
    Add {
        description: String,
        amount: String,
        category: String,
        /// Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    #[command(about = "Change fields of an existing record")]
    Edit {
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    #[command(about = "Delete a record")]
    Delete { id: String },
    #[command(about = "List records, optionally filtered by a regular expression")]
    List {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long)]
        sort: Option<SortKey>,
    },
    #[command(about = "Show totals, budget status and recent spending")]
    Dashboard {},
    #[command(about = "Write all records to finance-records.json")]
    Export {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    #[command(about = "Import records from a JSON export")]
    Import { file: PathBuf },
    #[command(about = "Show or change settings")]
    Settings {
        #[arg(long)]
        budget_cap: Option<String>,
        #[arg(long)]
        rate_usd: Option<String>,
        #[arg(long)]
        rate_eur: Option<String>,
    },
    #[command(about = "Manage custom categories")]
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    #[command(about = "Convert an amount to USD and EUR")]
    Convert { amount: String },
    #[command(about = "Show the location of the config.toml file")]
    ShowConfig {},
    #[command(about = "Create the config.toml file")]
    CreateConfig {},
}

#[derive(Subcommand, Debug)]
enum CategoryAction {
    Add { name: String },
    Remove { name: String },
    List {},
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::CreateConfig {} => {
            let config_file = get_config_file()?;
            if config_file.is_file() {
                return Err(anyhow!(
                    "The config file {:#?} already exists.",
                    config_file
                ));
            }
            let parent = config_file
                .parent()
                .ok_or(anyhow!("Cannot identify parent of {:#?}", config_file))?;
            if !parent.is_dir() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_file, config_template())?;
            println!("Created {:#?}.\n", config_file);
            println!("Edit this file to point at your storage directory.");
        }
        Commands::ShowConfig {} => {
            println!("{}", get_config_file()?.display());
        }
        command => {
            let config = load_config()?;
            let mut store = RecordStore::init(FileStore::new(&config.paths.storage));
            run(command, &config, &mut store)?;
        }
    }

    Ok(())
}

/// Execute a command that works on the record store.
fn run(command: Commands, config: &AppConfig, store: &mut RecordStore<FileStore>) -> Result<()> {
    match command {
        Commands::Add {
            description,
            amount,
            category,
            date,
        } => {
            let date = date.unwrap_or_else(|| RecordDate::from(today()).to_string());
            let fields =
                validate_record_fields(description.trim(), amount.trim(), &category, date.trim())
                    .map_err(|errors| anyhow!(errors))?;
            ensure_known_category(store, &fields.category)?;
            let id = store.generate_id()?;
            store.add(Record::new(
                &id,
                fields.description,
                fields.amount,
                fields.category,
                fields.date,
            ))?;
            println!("Record {id} added.");
        }
        Commands::Edit {
            id,
            description,
            amount,
            category,
            date,
        } => {
            let patch = build_patch(description, amount, category, date)?;
            if let Some(category) = &patch.category {
                ensure_known_category(store, category)?;
            }
            if patch.is_empty() {
                println!("Nothing to change.");
            } else if store.update(&id, patch)? {
                println!("Record {id} updated.");
            } else {
                println!("No record with id {id}.");
            }
        }
        Commands::Delete { id } => {
            if store.delete(&id)? {
                println!("Record {id} deleted.");
            } else {
                println!("No record with id {id}.");
            }
        }
        Commands::List {
            search,
            case_sensitive,
            sort,
        } => {
            let case_sensitive = case_sensitive || config.search.case_sensitive;
            let pattern = search.as_deref().unwrap_or_default().trim();
            let matcher = compile_regex(pattern, case_sensitive);
            if matcher.is_invalid() {
                eprintln!("Invalid regex pattern.");
            }
            let sorted = sorted_by(store.list(), sort.unwrap_or(config.list.sort));
            let shown = filter_records(&sorted, &matcher);
            if shown.is_empty() {
                println!("No records found.");
                return Ok(());
            }
            for record in shown.iter() {
                println!(
                    "{}  {}  {}{:>10.2}  {:<14}  {}",
                    record.id,
                    record.date,
                    BASE_CURRENCY,
                    record.amount,
                    highlight(&record.category, &matcher),
                    highlight(&record.description, &matcher),
                );
            }
            let plural = if shown.len() == 1 { "" } else { "s" };
            println!("Showing {} record{plural}.", shown.len());
        }
        Commands::Dashboard {} => {
            print!("{}", summarize(store.list(), store.settings(), today()));
        }
        Commands::Export { dir } => {
            let path = write_export(normalize_path(dir)?, store.list())?;
            println!("Exported {} record(s) to {}.", store.list().len(), path.display());
        }
        Commands::Import { file } => {
            let text = fs::read_to_string(normalize_path(file)?)?;
            let report = import_json(store, &text)?;
            println!("{report}");
        }
        Commands::Settings {
            budget_cap,
            rate_usd,
            rate_eur,
        } => {
            if budget_cap.is_none() && rate_usd.is_none() && rate_eur.is_none() {
                print_settings(store.settings());
                return Ok(());
            }
            let update = Settings {
                budget_cap: budget_cap.map(|x| x.trim().to_owned()),
                rate_usd: rate_usd.map(|x| x.trim().to_owned()),
                rate_eur: rate_eur.map(|x| x.trim().to_owned()),
                custom_categories: None,
            };
            validate_settings(
                update.budget_cap.as_deref().unwrap_or_default(),
                update.rate_usd.as_deref().unwrap_or_default(),
                update.rate_eur.as_deref().unwrap_or_default(),
            )
            .map_err(|errors| anyhow!(errors))?;
            store.update_settings(update)?;
            println!("Settings saved!");
        }
        Commands::Category { action } => match action {
            CategoryAction::Add { name } => {
                let name = store.add_custom_category(&name)?;
                println!("Category {name:?} added.");
            }
            CategoryAction::Remove { name } => {
                if store.remove_custom_category(&name)? {
                    println!("Category {name:?} removed.");
                } else {
                    println!("No custom category {name:?}.");
                }
            }
            CategoryAction::List {} => {
                for name in store.categories() {
                    println!("{name}");
                }
            }
        },
        Commands::Convert { amount } => {
            let rates = Rates::from_settings(store.settings());
            let amount = parse_positive_amount(&amount)
                .ok_or(anyhow!("Enter a positive amount to convert."))?;
            let conversion = convert(amount, &rates)
                .ok_or(anyhow!("The amount is too large to convert at these rates."))?;
            println!("{conversion}");
        }
        Commands::ShowConfig {} | Commands::CreateConfig {} => {
            return Err(anyhow!("This command does not use the record store."));
        }
    }
    Ok(())
}

/// Validate the fields given to `edit` and turn them into a patch.
fn build_patch(
    description: Option<String>,
    amount: Option<String>,
    category: Option<String>,
    date: Option<String>,
) -> Result<RecordPatch> {
    let description = description.map(|x| x.trim().to_owned());
    let amount = amount.map(|x| x.trim().to_owned());
    let date = date.map(|x| x.trim().to_owned());

    let mut errors = vec![];
    if let Some(Err(err)) = description.as_deref().map(validate_description) {
        errors.push((Field::Description, err));
    }
    if let Some(Err(err)) = amount.as_deref().map(validate_amount) {
        errors.push((Field::Amount, err));
    }
    if let Some(Err(err)) = category.as_deref().map(validate_category) {
        errors.push((Field::Category, err));
    }
    if let Some(Err(err)) = date.as_deref().map(validate_date) {
        errors.push((Field::Date, err));
    }
    if !errors.is_empty() {
        return Err(anyhow!(FieldErrors(errors)));
    }

    Ok(RecordPatch {
        description,
        amount: amount.as_deref().and_then(parse_amount),
        category,
        date: date.as_deref().and_then(RecordDate::parse),
    })
}

fn ensure_known_category(store: &RecordStore<FileStore>, category: &str) -> Result<()> {
    if store.is_known_category(category) {
        return Ok(());
    }
    Err(anyhow!(
        "Unknown category {:?}; add it with 'fintrack category add' first.",
        category
    ))
}

fn print_settings(settings: &Settings) {
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "(not set)".to_string());
    let rates = Rates::from_settings(settings);
    println!("Budget cap: {}", show(&settings.budget_cap));
    println!("USD rate:   {} (using {})", show(&settings.rate_usd), rates.usd);
    println!("EUR rate:   {} (using {})", show(&settings.rate_eur), rates.eur);
    println!("Custom categories: {}", settings.custom_categories().join(", "));
}

/// Set up logging; RUST_LOG overrides the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "fintrack=debug" } else { "fintrack=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read and validate the config.toml file.
fn load_config() -> Result<AppConfig> {
    let config_file = get_config_file()?;
    if !config_file.is_file() {
        return Err(anyhow!(
            "The file {:#?} does not exist - create it with 'fintrack create-config'.",
            config_file
        ));
    }
    AppConfig::new(&fs::read_to_string(&config_file)?)
}

/// Return the path to the config.toml file.
fn get_config_file() -> Result<PathBuf> {
    let mut conf_dirs = ConfigDirs::empty();
    let mut conf_files = conf_dirs
        .add_platform_config_dir()
        .search("fintrack", "config", "toml");
    normalize_path(
        conf_files
            .next()
            .ok_or(anyhow!("Cannot identify the path to the config.toml file"))?
            .path(),
    )
}
