use anyhow::{Context, Result};

use crate::billing::types::Invoice;
use crate::storage::invoice::entity::Model as InvoiceModel;

impl TryFrom<InvoiceModel> for Invoice {
    type Error = anyhow::Error;

    fn try_from(model: InvoiceModel) -> Result<Self> {
        let lines = serde_json::from_str(&model.lines)
            .with_context(|| format!("corrupt lines on invoice {}", model.id))?;

        Ok(Invoice {
            status: model.status.parse()?,
            id: model.id,
            number: model.number,
            contact_id: model.contact_id,
            description: model.description,
            currency: model.currency,
            lines,
            total_cents: model.total_cents,
            issued_at: model.issued_at,
            due_at: model.due_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl InvoiceModel {
    pub fn from_invoice(invoice: &Invoice, seq: i64) -> Result<Self> {
        Ok(InvoiceModel {
            id: invoice.id.clone(),
            seq,
            number: invoice.number.clone(),
            contact_id: invoice.contact_id.clone(),
            description: invoice.description.clone(),
            currency: invoice.currency.clone(),
            lines: serde_json::to_string(&invoice.lines)?,
            total_cents: invoice.total_cents,
            status: invoice.status.to_string(),
            issued_at: invoice.issued_at,
            due_at: invoice.due_at,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        })
    }
}
