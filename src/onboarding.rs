//! Advertiser onboarding: company, advertiser and first contract.

use rust_decimal::Decimal;

use crate::backend::Backend;
use crate::error::{AdminError, Result};
use crate::invoice::UnitOfWork;
use crate::model::{AdvertiserRecord, Company, ContractRecord, NewAdvertiser, NewCompany, NewContract};

#[derive(Debug, Clone)]
pub struct ContractTerms {
    pub contract_name: String,
    pub vertical_id: i64,
    pub budget_limit: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct AdvertiserSignup {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: NewCompany,
    pub contract: Option<ContractTerms>,
}

#[derive(Debug, Clone)]
pub struct Onboarded {
    pub company: Company,
    pub advertiser: AdvertiserRecord,
    pub contract: Option<ContractRecord>,
}

/// Insert company, advertiser and (optionally) contract in that order.
/// If any insert fails, the rows already created are deleted again.
pub fn onboard_advertiser(backend: &dyn Backend, signup: &AdvertiserSignup) -> Result<Onboarded> {
    if signup.name.trim().is_empty() {
        return Err(AdminError::InvalidArgument {
            field: "name",
            value: signup.name.clone(),
            reason: "must not be empty".to_string(),
        });
    }
    if signup.company.company_name.trim().is_empty() {
        return Err(AdminError::InvalidArgument {
            field: "company",
            value: signup.company.company_name.clone(),
            reason: "must not be empty".to_string(),
        });
    }

    let mut work = UnitOfWork::new(backend);
    let company = work.insert_company(&signup.company)?;
    let advertiser = work.insert_advertiser(&NewAdvertiser {
        name: signup.name.trim().to_string(),
        email: signup.email.clone(),
        phone: signup.phone.clone(),
        company_id: company.company_id,
    })?;
    let contract = match &signup.contract {
        Some(terms) => Some(work.insert_contract(&NewContract {
            contract_name: terms.contract_name.clone(),
            advertiser_id: advertiser.advertiser_id,
            vertical_id: terms.vertical_id,
            budget_limit: terms.budget_limit,
        })?),
        None => None,
    };
    work.commit();

    tracing::info!(
        advertiser_id = advertiser.advertiser_id,
        company_id = company.company_id,
        "onboarded advertiser"
    );
    Ok(Onboarded {
        company,
        advertiser,
        contract,
    })
}
