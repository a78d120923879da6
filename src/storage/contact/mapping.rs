use crate::billing::types::Contact;
use crate::storage::contact::entity::Model as ContactModel;

impl From<ContactModel> for Contact {
    fn from(model: ContactModel) -> Self {
        Contact {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            address: model.address,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<Contact> for ContactModel {
    fn from(contact: Contact) -> Self {
        ContactModel {
            id: contact.id,
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            address: contact.address,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}
