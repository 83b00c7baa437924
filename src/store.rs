use crate::error::{Error, Result};
use crate::expense::{format_amount, is_storable, Expense, ExpenseId};
use chrono::Datelike;
use rust_decimal::Decimal;
use std::{
    ffi::OsString,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Operations the command dispatcher needs from a collection of expenses.
///
/// Mutating operations on a durable store only return `Ok` once the whole
/// collection has been persisted.
pub trait ExpenseStore {
    fn add(&mut self, description: &str, amount: Decimal, category: &str) -> Result<Expense>;

    fn get(&self, id: ExpenseId) -> Result<Expense>;

    fn update(
        &mut self,
        id: ExpenseId,
        description: &str,
        amount: Decimal,
        category: &str,
    ) -> Result<()>;

    fn delete(&mut self, id: ExpenseId) -> Result<()>;

    /// All expenses in insertion order.
    fn list(&self) -> &[Expense];

    fn total(&self) -> Result<Decimal> {
        checked_sum(self.list().iter())
    }

    /// Sums every expense dated in `month` (1-12), whatever the year.
    fn total_for_month(&self, month: u32) -> Result<Decimal> {
        checked_sum(
            self.list()
                .iter()
                .filter(|expense| expense.date.month() == month),
        )
    }

    fn export(&self, path: &Path) -> Result<()> {
        export_csv(self.list(), path)
    }
}

fn checked_sum<'a, I>(mut expenses: I) -> Result<Decimal>
where
    I: Iterator<Item = &'a Expense>,
{
    expenses.try_fold(Decimal::ZERO, |total, expense| {
        total.checked_add(expense.amount).ok_or(Error::Overflow)
    })
}

fn check_storable(amount: Decimal) -> Result<()> {
    if is_storable(amount) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "amount {amount} has too many digits to be stored"
        )))
    }
}

/// In-memory collection shared by the store implementations.
#[derive(Debug, Default, Clone, PartialEq)]
struct Expenses(Vec<Expense>);

impl Expenses {
    fn add(&mut self, description: &str, amount: Decimal, category: &str) -> Result<Expense> {
        if description.is_empty() {
            return Err(Error::validation("description must be provided"));
        }
        if amount <= Decimal::ZERO {
            return Err(Error::validation("amount must be positive"));
        }
        check_storable(amount)?;

        let mut expense = Expense::new(description, amount, category);

        // Ids stay above every stored id, so same-second adds do not collide.
        // Only stored ids are known: deleting the newest expense lets its id
        // be handed out again.
        if let Some(highest) = self.0.iter().map(|existing| existing.id).max() {
            expense.id = expense.id.max(highest + 1);
        }

        self.0.push(expense.clone());
        Ok(expense)
    }

    fn position(&self, id: ExpenseId) -> Result<usize> {
        self.0
            .iter()
            .position(|expense| expense.id == id)
            .ok_or(Error::NotFound(id))
    }

    fn get(&self, id: ExpenseId) -> Result<Expense> {
        Ok(self.0[self.position(id)?].clone())
    }

    fn update(
        &mut self,
        id: ExpenseId,
        description: &str,
        amount: Decimal,
        category: &str,
    ) -> Result<()> {
        let index = self.position(id)?;
        if amount < Decimal::ZERO {
            return Err(Error::validation("amount must not be negative"));
        }
        check_storable(amount)?;

        let expense = &mut self.0[index];
        expense.description = description.to_string();
        expense.amount = amount;
        expense.category = category.to_string();

        Ok(())
    }

    fn delete(&mut self, id: ExpenseId) -> Result<()> {
        let index = self.position(id)?;
        self.0.remove(index);

        Ok(())
    }
}

/// Expenses backed by a pretty-printed JSON array on disk.
///
/// The whole file is rewritten after every mutation. There is no locking, so
/// two processes sharing a file can lose each other's changes.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    expenses: Expenses,
}

impl JsonStore {
    /// Loads the store at `path`. A missing or empty file is an empty store.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: Into<PathBuf>,
    {
        let path = path.into();

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::persistence(&path, e)),
        };

        let expenses = if data.is_empty() {
            Vec::new()
        } else {
            serde_json::from_slice(&data).map_err(|e| Error::persistence(&path, e))?
        };

        debug!(path = %path.display(), count = expenses.len(), "loaded expenses");

        Ok(Self {
            path,
            expenses: Expenses(expenses),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.expenses.0)
            .map_err(|e| Error::persistence(&self.path, e))?;

        let temp_path = temp_path(&self.path);
        fs::write(&temp_path, data).map_err(|e| Error::persistence(&self.path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| Error::persistence(&self.path, e))?;

        debug!(path = %self.path.display(), count = self.expenses.0.len(), "saved expenses");

        Ok(())
    }
}

impl ExpenseStore for JsonStore {
    fn add(&mut self, description: &str, amount: Decimal, category: &str) -> Result<Expense> {
        let expense = self.expenses.add(description, amount, category)?;
        self.save()?;

        info!(id = expense.id, %amount, "added expense");
        Ok(expense)
    }

    fn get(&self, id: ExpenseId) -> Result<Expense> {
        self.expenses.get(id)
    }

    fn update(
        &mut self,
        id: ExpenseId,
        description: &str,
        amount: Decimal,
        category: &str,
    ) -> Result<()> {
        self.expenses.update(id, description, amount, category)?;
        self.save()?;

        info!(id, %amount, "updated expense");
        Ok(())
    }

    fn delete(&mut self, id: ExpenseId) -> Result<()> {
        self.expenses.delete(id)?;
        self.save()?;

        info!(id, "deleted expense");
        Ok(())
    }

    fn list(&self) -> &[Expense] {
        &self.expenses.0
    }
}

/// Expenses that live only as long as the value. Used in place of
/// [`JsonStore`] when exercising the dispatcher.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    expenses: Expenses,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_expenses(expenses: Vec<Expense>) -> Self {
        Self {
            expenses: Expenses(expenses),
        }
    }
}

#[cfg(test)]
impl ExpenseStore for MemoryStore {
    fn add(&mut self, description: &str, amount: Decimal, category: &str) -> Result<Expense> {
        self.expenses.add(description, amount, category)
    }

    fn get(&self, id: ExpenseId) -> Result<Expense> {
        self.expenses.get(id)
    }

    fn update(
        &mut self,
        id: ExpenseId,
        description: &str,
        amount: Decimal,
        category: &str,
    ) -> Result<()> {
        self.expenses.update(id, description, amount, category)
    }

    fn delete(&mut self, id: ExpenseId) -> Result<()> {
        self.expenses.delete(id)
    }

    fn list(&self) -> &[Expense] {
        &self.expenses.0
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes `expenses` as CSV to `path`, replacing any existing file.
pub fn export_csv(expenses: &[Expense], path: &Path) -> Result<()> {
    let export_error = |source: csv::Error| Error::Export {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = csv::Writer::from_path(path).map_err(export_error)?;
    wtr.write_record(["ID", "Date", "Description", "Amount", "Category"])
        .map_err(export_error)?;

    for expense in expenses {
        wtr.write_record([
            expense.id.to_string(),
            expense.date.format("%Y-%m-%d").to_string(),
            expense.description.clone(),
            format_amount(expense.amount),
            expense.category.clone(),
        ])
        .map_err(export_error)?;
    }

    wtr.flush().map_err(|e| export_error(e.into()))?;
    debug!(path = %path.display(), count = expenses.len(), "exported expenses");

    Ok(())
}
