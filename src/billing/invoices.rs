use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::{BillingError, BillingResult};
use super::types::{Contact, Invoice, InvoiceFilter, InvoiceLine, InvoiceStatus, NewInvoice};
use crate::email::EmailService;
use crate::storage::contact::ContactStorage;
use crate::storage::invoice::entity::Model as InvoiceModel;
use crate::storage::invoice::InvoiceStorage;
use crate::web::{PaginatedList, Pagination};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_PAYMENT_TERM_DAYS: i64 = 30;
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

pub struct InvoiceManager {
    storage: Arc<dyn InvoiceStorage>,
    contacts: Arc<dyn ContactStorage>,
    email: Arc<EmailService>,
    // serializes sequence allocation with the insert that claims it
    numbering: Mutex<()>,
}

/// Checked and normalized editable fields of an invoice.
struct InvoiceDraft {
    contact_id: String,
    description: Option<String>,
    currency: String,
    lines: Vec<InvoiceLine>,
    total_cents: i64,
    issued_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
}

impl InvoiceManager {
    pub fn new(
        storage: Arc<dyn InvoiceStorage>,
        contacts: Arc<dyn ContactStorage>,
        email: Arc<EmailService>,
    ) -> Self {
        Self {
            storage,
            contacts,
            email,
            numbering: Mutex::new(()),
        }
    }

    pub async fn create(&self, new: NewInvoice) -> BillingResult<Invoice> {
        let draft = self.validate(new).await?;
        let now = Utc::now();

        let _numbering = self.numbering.lock().await;
        let seq = self.storage.next_seq().await?;
        let invoice = Invoice {
            id: format!("invoice-{}", Uuid::new_v4()),
            number: format_number(seq),
            contact_id: draft.contact_id,
            description: draft.description,
            currency: draft.currency,
            lines: draft.lines,
            total_cents: draft.total_cents,
            status: InvoiceStatus::Draft,
            issued_at: draft.issued_at,
            due_at: draft.due_at,
            created_at: now,
            updated_at: now,
        };

        self.storage.create(&InvoiceModel::from_invoice(&invoice, seq)?).await?;
        info!("Created invoice {} ({})", invoice.number, invoice.id);
        Ok(invoice)
    }

    pub async fn get(&self, invoice_id: &str) -> BillingResult<Invoice> {
        Ok(Invoice::try_from(self.get_model(invoice_id).await?)?)
    }

    pub async fn list(
        &self,
        filter: &InvoiceFilter,
        pagination: &Pagination,
    ) -> BillingResult<PaginatedList<Invoice>> {
        pagination.validate()?;

        let total = self.storage.count(filter).await?;
        let models = self.storage.list(filter, pagination).await?;
        let page = PaginatedList::from_pagination(models, total, pagination)?;
        Ok(page.try_map(Invoice::try_from)?)
    }

    pub async fn list_for_contact(
        &self,
        contact_id: &str,
        pagination: &Pagination,
    ) -> BillingResult<PaginatedList<Invoice>> {
        self.get_contact(contact_id).await?;
        self.list(&InvoiceFilter::for_contact(contact_id), pagination).await
    }

    /// Replaces the editable fields of a draft invoice.
    pub async fn update(&self, invoice_id: &str, new: NewInvoice) -> BillingResult<Invoice> {
        let model = self.get_model(invoice_id).await?;
        let seq = model.seq;
        let mut invoice = Invoice::try_from(model)?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(BillingError::Conflict(format!(
                "invoice {} is {} and can no longer be edited",
                invoice.number, invoice.status
            )));
        }

        let draft = self.validate(new).await?;
        invoice.contact_id = draft.contact_id;
        invoice.description = draft.description;
        invoice.currency = draft.currency;
        invoice.lines = draft.lines;
        invoice.total_cents = draft.total_cents;
        invoice.issued_at = draft.issued_at;
        invoice.due_at = draft.due_at;
        invoice.updated_at = Utc::now();

        let model = InvoiceModel::from_invoice(&invoice, seq)?;
        if !self.storage.update(&model, InvoiceStatus::Draft).await? {
            return Err(self.lost_write(invoice_id).await);
        }
        info!("Updated invoice {}", invoice.number);
        Ok(invoice)
    }

    /// Only drafts can be deleted; anything issued must be cancelled instead.
    pub async fn delete(&self, invoice_id: &str) -> BillingResult<()> {
        let invoice = self.get(invoice_id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(BillingError::Conflict(format!(
                "invoice {} is {}, cancel it instead",
                invoice.number, invoice.status
            )));
        }

        if !self.storage.delete(invoice_id, InvoiceStatus::Draft).await? {
            return Err(self.lost_write(invoice_id).await);
        }
        info!("Deleted invoice {}", invoice.number);
        Ok(())
    }

    pub async fn set_status(&self, invoice_id: &str, status: InvoiceStatus) -> BillingResult<Invoice> {
        let invoice = self.get(invoice_id).await?;
        if !invoice.status.can_transition_to(status) {
            return Err(BillingError::Conflict(format!(
                "invoice {} cannot move from {} to {}",
                invoice.number, invoice.status, status
            )));
        }
        self.transition(invoice, status).await
    }

    /// Emails the invoice to its contact. A draft becomes sent; a sent invoice
    /// may be sent again without changing status.
    ///
    /// A draft is marked sent before the email goes out, so the content that is
    /// mailed can no longer be edited. If delivery fails it returns to draft.
    pub async fn send(&self, invoice_id: &str) -> BillingResult<Invoice> {
        let mut invoice = self.get(invoice_id).await?;
        let status = invoice.status;
        let claimed = match status {
            InvoiceStatus::Draft => {
                self.transition(invoice, InvoiceStatus::Sent).await?;
                // reread: edits may have landed between the first read and the claim
                invoice = self.get(invoice_id).await?;
                true
            }
            InvoiceStatus::Sent => false,
            other => {
                return Err(BillingError::Conflict(format!(
                    "invoice {} is {} and cannot be sent",
                    invoice.number, other
                )));
            }
        };

        let delivered = match self.get_contact(&invoice.contact_id).await {
            Ok(contact) => self
                .email
                .send_invoice(&invoice, &contact)
                .await
                .map_err(|e| {
                    error!("Failed to email invoice {}: {}", invoice.number, e);
                    BillingError::Delivery(e.to_string())
                }),
            Err(e) => Err(e),
        };

        if let Err(e) = delivered {
            if claimed {
                self.release(&invoice).await;
            }
            return Err(e);
        }
        Ok(invoice)
    }

    async fn transition(&self, mut invoice: Invoice, to: InvoiceStatus) -> BillingResult<Invoice> {
        let now = Utc::now();
        if !self.storage.update_status(&invoice.id, invoice.status, to, now).await? {
            return Err(self.lost_write(&invoice.id).await);
        }
        info!("Invoice {} moved from {} to {}", invoice.number, invoice.status, to);

        invoice.status = to;
        invoice.updated_at = now;
        Ok(invoice)
    }

    // puts a claimed invoice back to draft after a failed send
    async fn release(&self, invoice: &Invoice) {
        let released = self
            .storage
            .update_status(&invoice.id, InvoiceStatus::Sent, InvoiceStatus::Draft, Utc::now())
            .await;
        match released {
            Ok(true) => info!("Invoice {} returned to draft", invoice.number),
            Ok(false) => warn!("Invoice {} changed while it was being sent", invoice.number),
            Err(e) => error!("Failed to return invoice {} to draft: {}", invoice.number, e),
        }
    }

    /// Explains a conditional write that matched no row.
    async fn lost_write(&self, invoice_id: &str) -> BillingError {
        match self.storage.get(invoice_id).await {
            Ok(Some(model)) => BillingError::Conflict(format!(
                "invoice {} was changed concurrently and is now {}",
                model.number, model.status
            )),
            Ok(None) => not_found(invoice_id),
            Err(e) => e.into(),
        }
    }

    async fn get_model(&self, invoice_id: &str) -> BillingResult<InvoiceModel> {
        self.storage
            .get(invoice_id)
            .await?
            .ok_or_else(|| not_found(invoice_id))
    }

    async fn get_contact(&self, contact_id: &str) -> BillingResult<Contact> {
        self.contacts
            .get(contact_id)
            .await?
            .map(Contact::from)
            .ok_or_else(|| BillingError::NotFound(format!("contact {}", contact_id)))
    }

    async fn validate(&self, new: NewInvoice) -> BillingResult<InvoiceDraft> {
        let contact_id = new.contact_id.trim().to_string();
        if self.contacts.get(&contact_id).await?.is_none() {
            return Err(BillingError::Validation(format!(
                "contact {:?} does not exist",
                contact_id
            )));
        }

        let currency = match new.currency {
            Some(currency) => currency.trim().to_ascii_uppercase(),
            None => DEFAULT_CURRENCY.to_string(),
        };
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(BillingError::Validation(format!(
                "currency must be a three letter code, got {:?}",
                currency
            )));
        }

        let total_cents = validate_lines(&new.lines)?;

        let issued_at = new.issued_at.unwrap_or_else(Utc::now);
        let due_at = new
            .due_at
            .unwrap_or_else(|| issued_at + Duration::days(DEFAULT_PAYMENT_TERM_DAYS));
        check_year("issue date", &issued_at)?;
        check_year("due date", &due_at)?;
        if due_at < issued_at {
            return Err(BillingError::Validation(
                "due date must not be before the issue date".to_string(),
            ));
        }

        Ok(InvoiceDraft {
            contact_id,
            description: new
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            currency,
            lines: new.lines,
            total_cents,
            issued_at,
            due_at,
        })
    }
}

/// Checks every line and returns the invoice total.
fn validate_lines(lines: &[InvoiceLine]) -> BillingResult<i64> {
    if lines.is_empty() {
        return Err(BillingError::Validation(
            "an invoice needs at least one line".to_string(),
        ));
    }

    let mut total: i64 = 0;
    for (index, line) in lines.iter().enumerate() {
        if line.description.trim().is_empty() {
            return Err(BillingError::Validation(format!("line {} has no description", index + 1)));
        }
        if line.quantity <= 0 {
            return Err(BillingError::Validation(format!(
                "line {} quantity must be positive",
                index + 1
            )));
        }
        if line.unit_price_cents < 0 {
            return Err(BillingError::Validation(format!(
                "line {} unit price must not be negative",
                index + 1
            )));
        }
        total = line
            .total_cents()
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| BillingError::Validation("invoice total is too large".to_string()))?;
    }
    Ok(total)
}

// stored dates sort as text, which only holds for four digit years
fn check_year(name: &str, date: &DateTime<Utc>) -> BillingResult<()> {
    if (MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Ok(());
    }
    Err(BillingError::Validation(format!(
        "{} must fall between the years {} and {}, got {}",
        name,
        MIN_YEAR,
        MAX_YEAR,
        date.year()
    )))
}

fn format_number(seq: i64) -> String {
    format!("INV-{:06}", seq)
}

fn not_found(invoice_id: &str) -> BillingError {
    BillingError::NotFound(format!("invoice {}", invoice_id))
}
