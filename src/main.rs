use invoice_desk::assistant;
use invoice_desk::command::{self, Command, ExportFormat};
use invoice_desk::config::Config;
use invoice_desk::customer_db::{CustomerDirectory, SqliteSlotStore};
use invoice_desk::invoice::Invoice;
use invoice_desk::session::Session;
use std::io::Write;
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = ".config/invoice_desk.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = Config::load_or_default(&config_path)?;
    info!(config = %config_path, db = %cfg.db_path, "Starting invoice desk");

    let store = SqliteSlotStore::open(&cfg.db_path)?;
    let customers = CustomerDirectory::open(Box::new(store))?;
    let parser = assistant::build_parser(&cfg.llm).await?;
    info!(parser = parser.name(), customers = customers.all().len(), "Ready");

    let today = OffsetDateTime::now_utc().date();
    let invoice = Invoice::from_template(&cfg.business, &cfg.invoice, today);
    let mut session = Session::new(invoice, customers, parser)
        .with_output(cfg.display.grouping, &cfg.out_dir);

    print_view(&session);
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let cmd = match command::parse(&line) {
            Ok(cmd) => cmd,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };
        if cmd == Command::Quit {
            break;
        }
        run(&mut session, &config_path, cmd).await?;
    }

    info!("Bye");
    Ok(())
}

/// Apply one command and print what the user should see.
async fn run(
    session: &mut Session,
    config_path: &str,
    cmd: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Show => print_view(session),
        Command::Json => println!("{}", serde_json::to_string_pretty(session.invoice())?),
        Command::Add => {
            let id = session.add_item();
            println!("added item {id}");
        }
        Command::Remove(id) => {
            if session.remove_item(&id) {
                print_view(session);
            } else {
                println!("no item '{id}' (or it is the last one)");
            }
        }
        Command::SetItem { id, field, value } => {
            if session.set_item_field(&id, field, &value) {
                print_view(session);
            } else {
                println!("no item '{id}'");
            }
        }
        Command::FinishEdit { id, field } => {
            if session.finish_item_edit(&id, field) {
                print_view(session);
            } else {
                println!("no item '{id}'");
            }
        }
        Command::Header { field, value } => match session.set_header(field, &value) {
            Ok(()) => print_view(session),
            Err(notice) => println!("{notice}"),
        },
        Command::Business { field, value } => {
            session.set_business(field, &value);
            if let Err(e) = Config::update_business_field(config_path, field.config_key(), &value)
            {
                warn!(error = %e, "Could not persist business details");
                println!("saved for this invoice only: {e}");
            }
            print_view(session);
        }
        Command::Ask(text) => {
            session.set_assistant_input(&text);
            match session.submit_assistant().await {
                Ok(()) => print_view(session),
                Err(notice) => println!("{notice}"),
            }
        }
        Command::Dictate => match session.dictate().await {
            Ok(()) => println!("heard: {}", session.assistant_input()),
            Err(notice) => println!("{notice}"),
        },
        Command::Customers => {
            if session.customers().is_empty() {
                println!("no saved customers");
            }
            for c in session.customers() {
                println!(
                    "{}  {}  {}",
                    c.id,
                    c.name,
                    c.address.as_deref().unwrap_or("")
                );
            }
        }
        Command::AddCustomer(new) => match session.add_customer(new) {
            Ok(c) => println!("saved customer {} ({})", c.name, c.id),
            Err(notice) => println!("{notice}"),
        },
        Command::PickCustomer(id) => match session.select_customer(&id) {
            Ok(()) => print_view(session),
            Err(notice) => println!("{notice}"),
        },
        Command::Theme(theme) => {
            session.set_theme(theme);
            println!("theme set to {theme:?}");
        }
        Command::Export(format) => {
            let result = match format {
                ExportFormat::Png => session.export_png().await,
                ExportFormat::Pdf => session.export_pdf().await,
            };
            match result {
                Ok(path) => println!("wrote {}", path.display()),
                Err(notice) => println!("{notice}"),
            }
        }
        Command::Share => match session.share().await {
            Ok(()) => println!("shared"),
            Err(notice) => println!("{notice}"),
        },
        Command::Help => println!("{}", command::HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn print_view(session: &Session) {
    println!("{}", session.view());
    for item in session.invoice().ledger().items() {
        println!("  [{}] {}", item.id, item.description);
    }
}
