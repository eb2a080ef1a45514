use std::sync::Arc;

use chrono::NaiveDate;

use finops_core::{Clock, InvoiceId};
use finops_payables::{Invoice, InvoiceFilter, NewInvoice, Obligation};

use crate::error::ServiceError;
use crate::store::LedgerStore;

/// An invoice with the obligation that carries its installments.
#[derive(Debug, Clone)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub obligation: Obligation,
}

/// Filtered invoice listing.
#[derive(Debug, Clone)]
pub struct InvoiceList {
    pub items: Vec<InvoiceDetail>,
    pub as_of: NaiveDate,
}

/// Ingestion and lookup of structured supplier invoices.
pub struct InvoiceService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> InvoiceService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Validate the invoice, create its obligation and store both.
    pub fn ingest(&self, input: NewInvoice) -> Result<InvoiceDetail, ServiceError> {
        let (invoice, create) = Invoice::ingest(input)?;
        let obligation = Obligation::create(create)?;
        self.store.insert_invoice(invoice.clone(), obligation.clone())?;

        tracing::info!(
            invoice_id = %invoice.id,
            obligation_id = %obligation.id_typed(),
            reference = %invoice.reference(),
            net = %invoice.net,
            installments = obligation.installments().len(),
            "invoice ingested"
        );
        Ok(InvoiceDetail {
            invoice,
            obligation,
        })
    }

    pub fn list(&self, filter: &InvoiceFilter) -> Result<InvoiceList, ServiceError> {
        let today = self.today();
        let items = self
            .store
            .find_invoices(filter, today)?
            .into_iter()
            .map(|invoice| self.with_obligation(invoice))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(InvoiceList {
            items,
            as_of: today,
        })
    }

    pub fn get(&self, id: InvoiceId) -> Result<InvoiceDetail, ServiceError> {
        let invoice = self.store.get_invoice(id)?;
        self.with_obligation(invoice)
    }

    fn with_obligation(&self, invoice: Invoice) -> Result<InvoiceDetail, ServiceError> {
        let obligation = self.store.get_obligation(invoice.obligation_id)?;
        Ok(InvoiceDetail {
            invoice,
            obligation,
        })
    }
}
