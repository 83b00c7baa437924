use crate::error::{Error, Result};
use crate::expense::{format_amount, ExpenseId};
use crate::store::ExpenseStore;
use chrono::{Datelike, Month};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::{ffi::OsString, io::Write, path::PathBuf};

const COMMANDS: &str = "'add', 'update', 'delete', 'list', 'summary' or 'export'";

#[derive(Parser, Debug)]
#[command(name = "expenses", version, about = "Track personal expenses in a local file")]
pub struct Cli {
    /// Path to the expense file
    #[arg(long, global = true, env = "EXPENSES_STORE", default_value = "expenses.json")]
    pub store: PathBuf,

    /// Log filter, e.g. `debug` or `expenses=info`
    #[arg(long, global = true, env = "EXPENSES_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a new expense
    Add(AddArgs),
    /// Overwrite the description, amount and category of an expense
    Update(UpdateArgs),
    /// Remove an expense
    Delete(DeleteArgs),
    /// Print expenses grouped by day
    List(ListArgs),
    /// Print the total of all expenses, or of one month
    Summary(SummaryArgs),
    /// Write all expenses to a CSV file
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub amount: Option<Decimal>,
    #[arg(long)]
    pub category: Option<String>,
}

/// Omitted fields are overwritten with empty values.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub id: Option<ExpenseId>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub amount: Option<Decimal>,
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub id: Option<ExpenseId>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show expenses in this category
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Month number (1-12); all months when omitted, zero or negative
    #[arg(long, allow_negative_numbers = true)]
    pub month: Option<i64>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, default_value = "expenses.csv")]
    pub file: PathBuf,
}

/// Parses process arguments. An unknown subcommand is reported as a
/// validation error; help, version and malformed options exit through clap.
pub fn parse<I, T>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(cli),
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => {
            let name = match e.get(ContextKind::InvalidSubcommand) {
                Some(ContextValue::String(name)) => name.clone(),
                _ => String::new(),
            };
            Err(Error::validation(format!(
                "unknown command `{name}`, expected {COMMANDS}"
            )))
        }
        Err(e) => e.exit(),
    }
}

/// Runs one command against `store`, writing human-readable output to `out`.
pub fn run<S, W>(command: Option<Command>, store: &mut S, out: &mut W) -> Result<()>
where
    S: ExpenseStore,
    W: Write,
{
    use Command::*;

    match command {
        Some(Add(args)) => add(args, store, out),
        Some(Update(args)) => update(args, store, out),
        Some(Delete(args)) => delete(args, store, out),
        Some(List(args)) => list(args, store, out),
        Some(Summary(args)) => summary(args, store, out),
        Some(Export(args)) => export(args, store, out),
        None => Err(Error::validation(format!("expected {COMMANDS} subcommands"))),
    }
}

fn add<S: ExpenseStore, W: Write>(args: AddArgs, store: &mut S, out: &mut W) -> Result<()> {
    let description = args.description.unwrap_or_default();
    let amount = args.amount.unwrap_or_default();

    if description.is_empty() || amount <= Decimal::ZERO {
        return Err(Error::validation(
            "description and amount must be provided, and amount must be positive",
        ));
    }

    let expense = store.add(&description, amount, &args.category.unwrap_or_default())?;
    writeln!(out, "Expense added successfully (id {})", expense.id)?;

    Ok(())
}

fn update<S: ExpenseStore, W: Write>(args: UpdateArgs, store: &mut S, out: &mut W) -> Result<()> {
    let id = args.id.unwrap_or_default();
    let amount = args.amount.unwrap_or_default();

    if id == 0 || amount < Decimal::ZERO {
        return Err(Error::validation(
            "id must be provided, and amount must not be negative",
        ));
    }

    let expense = store.get(id)?;
    store.update(
        expense.id,
        &args.description.unwrap_or_default(),
        amount,
        &args.category.unwrap_or_default(),
    )?;
    writeln!(out, "Expense updated successfully")?;

    Ok(())
}

fn delete<S: ExpenseStore, W: Write>(args: DeleteArgs, store: &mut S, out: &mut W) -> Result<()> {
    let id = args.id.unwrap_or_default();

    if id == 0 {
        return Err(Error::validation("id must be provided"));
    }

    store.delete(id)?;
    writeln!(out, "Expense deleted successfully")?;

    Ok(())
}

fn list<S: ExpenseStore, W: Write>(args: ListArgs, store: &S, out: &mut W) -> Result<()> {
    let expenses = store.list();
    let category = args.category.unwrap_or_default();

    if expenses.is_empty() {
        writeln!(out, "No data is found.")?;
        return Ok(());
    }

    if !category.is_empty() {
        writeln!(out, "Filtered by category: {category}")?;
    }

    write_row(out, "ID", "Date", "Description", "Amount", "Category")?;

    // A banner is printed whenever the day of the month changes.
    let mut day = None;
    for expense in expenses
        .iter()
        .filter(|expense| category.is_empty() || expense.category == category)
    {
        if day != Some(expense.date.day()) {
            day = Some(expense.date.day());
            writeln!(out, "# {} {}", expense.date.format("%Y %B %d"), "-".repeat(53))?;
        }

        write_row(
            out,
            &expense.id.to_string(),
            &expense.date.format("%Y-%m-%d %H:%M").to_string(),
            &expense.description,
            &format_amount(expense.amount),
            &expense.category,
        )?;
    }

    Ok(())
}

fn write_row<W: Write>(
    out: &mut W,
    id: &str,
    date: &str,
    description: &str,
    amount: &str,
    category: &str,
) -> std::io::Result<()> {
    let row = format!("{id:<12} {date:<18} {description:<18} {amount:<10} {category}");
    writeln!(out, "{}", row.trim_end())
}

fn summary<S: ExpenseStore, W: Write>(args: SummaryArgs, store: &S, out: &mut W) -> Result<()> {
    match args.month.unwrap_or_default() {
        number if number <= 0 => {
            writeln!(out, "Total expenses: {}", format_amount(store.total()?))?;
        }
        number => {
            let month = u8::try_from(number)
                .ok()
                .and_then(|n| Month::try_from(n).ok())
                .ok_or_else(|| {
                    Error::validation(format!("month must be between 1 and 12, got {number}"))
                })?;

            writeln!(
                out,
                "Total expenses for {}: {}",
                month.name(),
                format_amount(store.total_for_month(month.number_from_month())?)
            )?;
        }
    }

    Ok(())
}

fn export<S: ExpenseStore, W: Write>(args: ExportArgs, store: &S, out: &mut W) -> Result<()> {
    store.export(&args.file)?;
    writeln!(out, "Expenses exported successfully to {}", args.file.display())?;

    Ok(())
}
