use chrono::{NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::models::{validate_amount, NewTransaction, Transaction, TransactionPatch};
use crate::repository::Repository;

/// One year of ledger state: starting capital, the ordered transaction list,
/// the recurring template set and the id counter.
#[derive(Debug, Clone)]
pub struct Ledger {
    year: i32,
    initial_capital: f64,
    transactions: Vec<Transaction>,
    recurring: Vec<Transaction>,
    next_id: u64,
}

impl Ledger {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            initial_capital: 0.0,
            transactions: Vec::new(),
            recurring: Vec::new(),
            next_id: 1,
        }
    }

    pub fn load<R: Repository + ?Sized>(repo: &R, year: i32) -> Result<Self> {
        let transactions = repo.transactions(year)?;
        let recurring: Vec<Transaction> = repo
            .recurring(year)?
            .into_iter()
            .filter(|t| {
                if !t.is_recurring() {
                    tracing::warn!(id = t.id, "dropping recurring entry without a schedule");
                }
                t.is_recurring()
            })
            .collect();

        let highest = transactions
            .iter()
            .chain(recurring.iter())
            .map(|t| t.id)
            .max()
            .unwrap_or(0);
        let next_id = repo.next_id(year)?.unwrap_or(0).max(highest + 1);

        tracing::debug!(
            year,
            transactions = transactions.len(),
            recurring = recurring.len(),
            next_id,
            "loaded ledger"
        );

        Ok(Self {
            initial_capital: repo.initial_capital(year)?,
            transactions,
            recurring,
            next_id,
            ..Self::new(year)
        })
    }

    pub fn save<R: Repository + ?Sized>(&self, repo: &mut R) -> Result<()> {
        if self.transactions.is_empty() && self.recurring.is_empty() {
            repo.clear_year(self.year)?;
        } else {
            repo.save_transactions(self.year, &self.transactions)?;
            repo.save_recurring(self.year, &self.recurring)?;
        }
        repo.save_initial_capital(self.year, self.initial_capital)?;
        repo.save_next_id(self.year, self.next_id)?;
        Ok(())
    }

    /// [`Ledger::save`] as a single atomic write.
    pub fn commit<R: Repository>(&self, repo: &mut R) -> Result<()> {
        repo.atomically(|tx| self.save(tx))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn set_initial_capital(&mut self, amount: f64) {
        self.initial_capital = amount;
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn recurring(&self) -> &[Transaction] {
        &self.recurring
    }

    /// Id the next added or generated transaction receives.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn get(&self, id: u64) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Record a user-entered transaction dated `now`. Recurring ones also
    /// join the template set.
    pub fn add(&mut self, new: NewTransaction, now: NaiveDateTime) -> Result<Transaction> {
        self.add_on(new, now.date(), now)
    }

    /// Like [`Ledger::add`] with an explicit effective date.
    pub fn add_on(
        &mut self,
        new: NewTransaction,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Transaction> {
        let amount = validate_amount(new.amount)?;
        let transaction = Transaction {
            id: self.allocate_id(),
            description: new.description,
            amount,
            kind: new.kind,
            category: new.category,
            date,
            timestamp: now,
            recurrence: new.recurrence,
        };
        if transaction.is_recurring() {
            self.recurring.push(transaction.clone());
        }
        self.transactions.push(transaction.clone());
        tracing::debug!(id = transaction.id, recurring = transaction.is_recurring(), "added transaction");
        Ok(transaction)
    }

    /// Copy of `template` with a fresh id dated `date`.
    pub fn instantiate(&mut self, template: &Transaction, date: NaiveDate) -> Transaction {
        Transaction {
            id: self.allocate_id(),
            date,
            ..template.clone()
        }
    }

    pub fn append_batch(&mut self, batch: Vec<Transaction>) {
        self.transactions.extend(batch);
    }

    /// Swap in `updated` for the record sharing its id. Returns false (and
    /// changes nothing) when no record matches.
    ///
    /// A template stays in sync with its record. A record outside the
    /// template set only joins it when `schedule_changed`; generated
    /// instances carry their template's schedule without being templates.
    pub fn replace(&mut self, updated: Transaction, schedule_changed: bool) -> bool {
        let Some(slot) = self.transactions.iter_mut().find(|t| t.id == updated.id) else {
            return false;
        };
        *slot = updated.clone();

        let template = self.recurring.iter().position(|t| t.id == updated.id);
        match (template, updated.is_recurring()) {
            (Some(i), true) => self.recurring[i] = updated,
            (Some(i), false) => {
                self.recurring.remove(i);
            }
            (None, true) if schedule_changed => self.recurring.push(updated),
            (None, _) => {}
        }
        true
    }

    pub fn edit(&mut self, id: u64, patch: &TransactionPatch) -> Result<bool> {
        let Some(current) = self.get(id) else {
            return Ok(false);
        };
        let updated = patch.apply(current)?;
        Ok(self.replace(updated, patch.touches_recurrence()))
    }

    /// Remove from both the main and recurring sets. Returns whether
    /// anything was removed.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.transactions.len() + self.recurring.len();
        self.transactions.retain(|t| t.id != id);
        self.recurring.retain(|t| t.id != id);
        before != self.transactions.len() + self.recurring.len()
    }

    pub fn balance(&self) -> f64 {
        self.transactions
            .iter()
            .fold(self.initial_capital, |acc, t| acc + t.signed_amount())
    }

    /// Roll the current balance into the initial capital and drop every
    /// transaction and template. The id counter is kept.
    pub fn clear_all(&mut self) -> f64 {
        self.initial_capital = self.balance();
        self.transactions.clear();
        self.recurring.clear();
        self.initial_capital
    }
}
