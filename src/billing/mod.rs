pub mod contacts;
pub mod error;
pub mod invoices;
pub mod types;

pub use contacts::ContactManager;
pub use error::{BillingError, BillingResult};
pub use invoices::InvoiceManager;
pub use types::{Contact, Invoice, InvoiceFilter, InvoiceLine, InvoiceStatus, NewContact, NewInvoice};
