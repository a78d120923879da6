use std::fmt::Write;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::{EmailMessage, EmailSender};
use crate::billing::types::{Contact, Invoice};

pub struct EmailService {
    sender: Arc<dyn EmailSender>,
    from: String,
}

impl EmailService {
    pub fn new(sender: Arc<dyn EmailSender>, from: String) -> Self {
        Self { sender, from }
    }

    pub async fn send_invoice(&self, invoice: &Invoice, contact: &Contact) -> Result<EmailMessage> {
        let message = self.render_invoice(invoice, contact);
        self.sender.send(&message).await?;
        info!("Invoice {} emailed to {}", invoice.number, contact.email);
        Ok(message)
    }

    pub fn render_invoice(&self, invoice: &Invoice, contact: &Contact) -> EmailMessage {
        let mut body = String::new();
        // writing into a String cannot fail
        let _ = writeln!(body, "Hello {},", contact.name);
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "Please find invoice {} issued on {} below.",
            invoice.number,
            invoice.issued_at.format("%Y-%m-%d")
        );
        if let Some(description) = &invoice.description {
            let _ = writeln!(body, "{}", description);
        }
        let _ = writeln!(body);
        for line in &invoice.lines {
            let _ = writeln!(
                body,
                "  {} x {} @ {} = {}",
                line.quantity,
                line.description,
                format_cents(line.unit_price_cents),
                format_cents(line.total_cents().unwrap_or_default()),
            );
        }
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "Total: {} {}",
            format_cents(invoice.total_cents),
            invoice.currency
        );
        let _ = writeln!(body, "Due by: {}", invoice.due_at.format("%Y-%m-%d"));

        EmailMessage {
            from: self.from.clone(),
            to: contact.email.clone(),
            subject: format!("Invoice {}", invoice.number),
            body,
        }
    }
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}
