use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::error::{BillingError, BillingResult};
use super::types::{Contact, InvoiceFilter, NewContact};
use crate::storage::contact::ContactStorage;
use crate::storage::invoice::InvoiceStorage;
use crate::web::{PaginatedList, Pagination};

pub struct ContactManager {
    storage: Arc<dyn ContactStorage>,
    invoices: Arc<dyn InvoiceStorage>,
}

impl ContactManager {
    pub fn new(storage: Arc<dyn ContactStorage>, invoices: Arc<dyn InvoiceStorage>) -> Self {
        Self { storage, invoices }
    }

    pub async fn create(&self, new: NewContact) -> BillingResult<Contact> {
        let new = validate(new)?;
        let now = Utc::now();
        let contact = Contact {
            id: format!("contact-{}", Uuid::new_v4()),
            name: new.name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            created_at: now,
            updated_at: now,
        };

        self.storage.create(&contact.clone().into()).await?;
        info!("Created contact {}", contact.id);
        Ok(contact)
    }

    pub async fn get(&self, contact_id: &str) -> BillingResult<Contact> {
        self.storage
            .get(contact_id)
            .await?
            .map(Contact::from)
            .ok_or_else(|| BillingError::NotFound(format!("contact {}", contact_id)))
    }

    pub async fn list(&self, pagination: &Pagination) -> BillingResult<PaginatedList<Contact>> {
        pagination.validate()?;

        let total = self.storage.count().await?;
        let models = self.storage.list(pagination).await?;
        let page = PaginatedList::from_pagination(models, total, pagination)?;
        Ok(page.map(Contact::from))
    }

    pub async fn update(&self, contact_id: &str, new: NewContact) -> BillingResult<Contact> {
        let new = validate(new)?;
        let mut contact = self.get(contact_id).await?;
        contact.name = new.name;
        contact.email = new.email;
        contact.phone = new.phone;
        contact.address = new.address;
        contact.updated_at = Utc::now();

        if !self.storage.update(&contact.clone().into()).await? {
            return Err(BillingError::NotFound(format!("contact {}", contact_id)));
        }
        info!("Updated contact {}", contact_id);
        Ok(contact)
    }

    /// Contacts that still have invoices cannot be removed.
    pub async fn delete(&self, contact_id: &str) -> BillingResult<()> {
        self.get(contact_id).await?;

        let invoices = self.invoices.count(&InvoiceFilter::for_contact(contact_id)).await?;
        if invoices > 0 {
            return Err(BillingError::Conflict(format!(
                "contact {} still has {} invoice(s)",
                contact_id, invoices
            )));
        }

        if !self.storage.delete(contact_id).await? {
            return Err(BillingError::NotFound(format!("contact {}", contact_id)));
        }
        info!("Deleted contact {}", contact_id);
        Ok(())
    }
}

fn validate(new: NewContact) -> BillingResult<NewContact> {
    let name = new.name.trim().to_string();
    if name.is_empty() {
        return Err(BillingError::Validation("contact name must not be empty".to_string()));
    }

    let email = new.email.trim().to_string();
    if !is_plausible_email(&email) {
        return Err(BillingError::Validation(format!("invalid email address: {:?}", email)));
    }

    Ok(NewContact {
        name,
        email,
        phone: non_empty(new.phone),
        address: non_empty(new.address),
    })
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
