use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::models::Transaction;
use crate::repository::Repository;
use crate::store::Ledger;

/// Whether today's recurrence pass still has to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceState {
    /// Watermark absent or on an earlier/later calendar date.
    Pending,
    /// Watermark is today.
    Settled,
}

impl RecurrenceState {
    pub fn of(watermark: Option<NaiveDate>, today: NaiveDate) -> Self {
        match watermark {
            Some(last) if last == today => Self::Settled,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessReport {
    /// State found before the pass ran.
    pub state: RecurrenceState,
    pub generated: Vec<Transaction>,
}

/// Generates dated instances of recurring templates, at most once per
/// calendar day.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecurrenceProcessor {
    enforce_bounds: bool,
}

impl RecurrenceProcessor {
    pub fn new(enforce_bounds: bool) -> Self {
        Self { enforce_bounds }
    }

    pub fn due_templates<'a>(
        &self,
        templates: &'a [Transaction],
        today: NaiveDate,
    ) -> Vec<&'a Transaction> {
        templates
            .iter()
            .filter(|t| {
                t.recurrence
                    .is_some_and(|r| r.is_due(today, self.enforce_bounds))
            })
            .collect()
    }

    /// Apply one pass to an in-memory ledger. A settled watermark short
    /// circuits with nothing generated.
    pub fn process(
        &self,
        ledger: &mut Ledger,
        watermark: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ProcessReport {
        let state = RecurrenceState::of(watermark, today);
        if state == RecurrenceState::Settled {
            return ProcessReport {
                state,
                generated: Vec::new(),
            };
        }

        let due: Vec<Transaction> = self
            .due_templates(ledger.recurring(), today)
            .into_iter()
            .cloned()
            .collect();
        let generated: Vec<Transaction> = due
            .iter()
            .map(|template| ledger.instantiate(template, today))
            .collect();
        ledger.append_batch(generated.clone());

        ProcessReport { state, generated }
    }

    /// Startup pass against persisted state: reads the watermark and the
    /// templates of `now`'s year, appends what is due, and stamps the
    /// watermark.
    pub fn run<R: Repository>(&self, repo: &mut R, now: NaiveDateTime) -> Result<ProcessReport> {
        let today = now.date();
        let watermark = repo.watermark()?;
        if RecurrenceState::of(watermark, today) == RecurrenceState::Settled {
            tracing::debug!(%today, "recurring transactions already processed today");
            return Ok(ProcessReport {
                state: RecurrenceState::Settled,
                generated: Vec::new(),
            });
        }

        let mut ledger = Ledger::load(&*repo, today.year())?;
        let report = self.process(&mut ledger, watermark, today);
        // Instances and watermark land together, or neither does
        repo.atomically(|tx| {
            if !report.generated.is_empty() {
                ledger.save(tx)?;
            }
            tx.save_watermark(now)
        })?;

        tracing::info!(
            %today,
            last_processed = ?watermark,
            generated = report.generated.len(),
            "processed recurring transactions"
        );
        Ok(report)
    }
}
