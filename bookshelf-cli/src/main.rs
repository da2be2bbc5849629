mod render;

use bookshelf::{
    forms::{BookForm, BorrowForm},
    model::{BookFilter, BookUpdate, BorrowFilter, BorrowStatus, Genre},
    pagination::Pager,
    Client, ClientBuilder, LibraryError, Settings
};
use clap::{Parser, Subcommand};
use color_eyre::{
    eyre::{eyre, Report},
    Result
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(about = "Browse and manage the library catalog")]
#[command(version)]
struct Args {
    /// API base url (default: $BOOKSHELF_API_URL or http://localhost:5000/api)
    #[arg(long)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Command
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List books, one page at a time
    Books {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        genre: Option<String>,
        /// Only books with copies left
        #[arg(long)]
        available: bool
    },
    /// Show one book
    Show { id: String },
    /// Add a book to the catalog
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        genre: String,
        #[arg(long)]
        isbn: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = 1)]
        copies: i64
    },
    /// Change some fields of a book
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        copies: Option<u32>,
        #[arg(long)]
        available: Option<bool>
    },
    /// Remove a book from the catalog
    Delete { id: String },
    /// Borrow copies of a book
    Borrow {
        book_id: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
        /// YYYY-MM-DD
        #[arg(long)]
        due: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String
    },
    /// List borrow records
    Borrows {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        email: Option<String>
    },
    /// Copies currently out on loan, per book
    Summary
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(args: &Args) -> Result<Client> {
    let builder = match args.api_url {
        Some(ref url) => ClientBuilder::new(url)?,
        None => ClientBuilder::from_settings(&Settings::load()?)
    };
    let client = builder
        .with_timeout(Duration::from_secs(args.timeout))?
        .build();
    Ok(client)
}

/// Shows the server's message rather than the error chain.
fn report(error: LibraryError) -> Report {
    eyre!(error.user_message())
}

fn parse_genre(name: Option<String>) -> Result<Option<Genre>> {
    match name {
        Some(name) => Genre::parse(&name)
            .map(Some)
            .ok_or_else(|| eyre!("unknown genre '{}'", name)),
        None => Ok(None)
    }
}

async fn run(client: Client, command: Command) -> Result<()> {
    match command {
        Command::Books {
            page,
            limit,
            search,
            genre,
            available
        } => {
            let filter = BookFilter {
                search,
                genre: parse_genre(genre)?,
                available: if available { Some(true) } else { None },
                ..Default::default()
            };
            let mut pager = Pager::new(page, limit);
            let mut books = client
                .get_books_paginated(pager.book_filter(filter.clone()))
                .await
                .map_err(report)?;
            if pager.clamp_to(&books) {
                books = client
                    .get_books_paginated(pager.book_filter(filter))
                    .await
                    .map_err(report)?;
            }
            render::books(&books.items);
            render::footer(&books, &pager);
        }
        Command::Show { id } => {
            let book = client.get_book(id).await.map_err(report)?;
            render::book(&book);
        }
        Command::Create {
            title,
            author,
            genre,
            isbn,
            description,
            copies
        } => {
            let form = BookForm {
                title,
                author,
                genre,
                isbn,
                description,
                copies,
                available: copies > 0
            };
            let book = form.validate().map_err(LibraryError::from).map_err(report)?;
            let created = client.create_book(book).await.map_err(report)?;
            println!("Created book {}", created.id.as_deref().unwrap_or("?"));
        }
        Command::Update {
            id,
            title,
            author,
            genre,
            copies,
            available
        } => {
            let updates = BookUpdate {
                title,
                author,
                genre: parse_genre(genre)?,
                copies,
                available,
                ..Default::default()
            };
            if updates.is_empty() {
                return Err(eyre!("nothing to update"));
            }
            let book = client.update_book(id, updates).await.map_err(report)?;
            render::book(&book);
        }
        Command::Delete { id } => {
            client.delete_book(id.as_str()).await.map_err(report)?;
            println!("Deleted book {}", id);
        }
        Command::Borrow {
            book_id,
            quantity,
            due,
            name,
            email
        } => {
            let book = client.get_book(book_id.as_str()).await.map_err(report)?;
            let form = BorrowForm {
                book_id,
                quantity,
                due_date: due,
                borrower_name: name,
                borrower_email: email,
                available_copies: Some(book.copies)
            };
            let today = chrono::Local::now().date_naive();
            let borrow = form.validate(today).map_err(LibraryError::from).map_err(report)?;
            let receipt = client.borrow_book(borrow).await.map_err(report)?;
            println!(
                "Borrowed {} of \"{}\", due {}",
                receipt.quantity, book.title, receipt.due_date
            );
        }
        Command::Borrows {
            page,
            limit,
            status,
            email
        } => {
            let status = match status.as_deref() {
                None => None,
                Some("active") => Some(BorrowStatus::Active),
                Some("returned") => Some(BorrowStatus::Returned),
                Some("overdue") => Some(BorrowStatus::Overdue),
                Some(other) => return Err(eyre!("unknown status '{}'", other))
            };
            let pager = Pager::new(page, limit);
            let filter = BorrowFilter {
                status,
                borrower_email: email,
                ..Default::default()
            };
            let borrows = client
                .get_borrows_paginated(pager.borrow_filter(filter))
                .await
                .map_err(report)?;
            render::borrows(&borrows.items);
            render::footer(&borrows, &pager);
        }
        Command::Summary => {
            let summary = client.get_borrow_summary().await.map_err(report)?;
            render::summary(&summary);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let args = Args::parse();
    let client = build_client(&args)?;
    run(client, args.command).await
}
