use crate::backend::Backend;
use crate::error::{AdminError, Result};
use crate::model::{
    AdvertiserRecord, Company, ContractRecord, InvoiceRecord, LineItemRecord, NewAdvertiser,
    NewCompany, NewContract,
};

/// Compensation for one committed step.
#[derive(Debug, Clone)]
enum Undo {
    RestoreInvoice(InvoiceRecord),
    RestoreLineItem(LineItemRecord),
    DeleteCompany(i64),
    DeleteAdvertiser(i64),
    DeleteContract(i64),
}

impl Undo {
    fn apply(&self, backend: &dyn Backend) -> Result<()> {
        match self {
            Undo::RestoreInvoice(record) => backend.update_invoice(record),
            Undo::RestoreLineItem(item) => backend.update_line_item(item),
            Undo::DeleteCompany(id) => backend.delete_company(*id),
            Undo::DeleteAdvertiser(id) => backend.delete_advertiser(*id),
            Undo::DeleteContract(id) => backend.delete_contract(*id),
        }
    }
}

/// Sequence of independent backend writes with compensating actions.
///
/// Each step runs immediately. When a step fails, the steps already
/// committed are undone in reverse order and the failure comes back as
/// `SaveAborted`, naming the step and whether every compensation succeeded.
pub struct UnitOfWork<'a> {
    backend: &'a dyn Backend,
    step: usize,
    undo: Vec<Undo>,
}

impl<'a> UnitOfWork<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            step: 0,
            undo: Vec::new(),
        }
    }

    /// Overwrite an invoice header; `previous` is restored on rollback.
    pub fn update_invoice(&mut self, record: &InvoiceRecord, previous: &InvoiceRecord) -> Result<()> {
        let undo = Undo::RestoreInvoice(previous.clone());
        self.run(
            format!("update invoice {}", record.invoice_id),
            |b| b.update_invoice(record),
            |_| undo,
        )
    }

    /// Overwrite a line item; `previous` is restored on rollback.
    pub fn update_line_item(
        &mut self,
        item: &LineItemRecord,
        previous: &LineItemRecord,
    ) -> Result<()> {
        let undo = Undo::RestoreLineItem(previous.clone());
        self.run(
            format!("update line item {}", item.id),
            |b| b.update_line_item(item),
            |_| undo,
        )
    }

    pub fn insert_company(&mut self, company: &NewCompany) -> Result<Company> {
        self.run(
            format!("insert company '{}'", company.company_name),
            |b| b.insert_company(company),
            |row: &Company| Undo::DeleteCompany(row.company_id),
        )
    }

    pub fn insert_advertiser(&mut self, advertiser: &NewAdvertiser) -> Result<AdvertiserRecord> {
        self.run(
            format!("insert advertiser '{}'", advertiser.name),
            |b| b.insert_advertiser(advertiser),
            |row: &AdvertiserRecord| Undo::DeleteAdvertiser(row.advertiser_id),
        )
    }

    pub fn insert_contract(&mut self, contract: &NewContract) -> Result<ContractRecord> {
        self.run(
            format!("insert contract '{}'", contract.contract_name),
            |b| b.insert_contract(contract),
            |row: &ContractRecord| Undo::DeleteContract(row.contract_id),
        )
    }

    /// Number of committed steps. Compensations are discarded.
    pub fn commit(self) -> usize {
        tracing::debug!(steps = self.step, "unit of work committed");
        self.undo.len()
    }

    fn run<T>(
        &mut self,
        action: String,
        write: impl FnOnce(&dyn Backend) -> Result<T>,
        undo: impl FnOnce(&T) -> Undo,
    ) -> Result<T> {
        self.step += 1;
        tracing::debug!(step = self.step, %action, "unit of work step");
        match write(self.backend) {
            Ok(value) => {
                self.undo.push(undo(&value));
                Ok(value)
            }
            Err(source) => {
                tracing::warn!(step = self.step, %action, error = %source, "step failed, rolling back");
                let rolled_back = self.rollback();
                Err(AdminError::SaveAborted {
                    step: self.step,
                    action,
                    rolled_back,
                    source: Box::new(source),
                })
            }
        }
    }

    fn rollback(&mut self) -> bool {
        let mut clean = true;
        while let Some(undo) = self.undo.pop() {
            if let Err(e) = undo.apply(self.backend) {
                tracing::error!(?undo, error = %e, "compensation failed");
                clean = false;
            }
        }
        clean
    }
}
