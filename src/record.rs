//! The fixed-key record handed to persistence.
//!
//! [`crate::merge::MergedRecord`] only contains the fields some page actually
//! produced. Downstream consumers (the case-management import, the JSON file
//! written by `loanscan -o`) want every key present in a stable order, so
//! [`LoanRecord`] projects the merged record onto the published schema.
//! A field no page produced serialises as `""`.
//!
//! Two keys are renamed on the way out: `subject_of_FA` is published as
//! `subject_matter` and `property_title` as `property_description`.

use crate::merge::{FieldValue, MergedRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub ref_no: FieldValue,
    pub date: FieldValue,
    pub open_date: FieldValue,
    pub close_date: FieldValue,
    pub borrower_name: FieldValue,
    pub borrower_registration_number: FieldValue,
    pub borrower_address: FieldValue,
    pub bank_name: FieldValue,
    pub bank_address: FieldValue,
    pub bank_registration_number: FieldValue,
    pub subject_matter: FieldValue,
    pub total_loan_amount: FieldValue,
    pub guarantor_name: FieldValue,
    pub guarantor_nric: FieldValue,
    pub corporate_guarantor_name: FieldValue,
    pub corporate_guarantor_registration_number: FieldValue,
    pub law_firm_name: FieldValue,
    pub law_firm_address: FieldValue,
    pub property_description: FieldValue,
    pub property_address: FieldValue,
    pub property_price: FieldValue,
}

impl Default for LoanRecord {
    fn default() -> Self {
        Self::from_merged(&MergedRecord::default())
    }
}

impl LoanRecord {
    pub fn from_merged(merged: &MergedRecord) -> Self {
        let take = |key: &str| {
            merged
                .get(key)
                .cloned()
                .unwrap_or_else(|| FieldValue::Scalar(String::new()))
        };
        Self {
            ref_no: take("ref_no"),
            date: take("date"),
            open_date: take("open_date"),
            close_date: take("close_date"),
            borrower_name: take("borrower_name"),
            borrower_registration_number: take("borrower_registration_number"),
            borrower_address: take("borrower_address"),
            bank_name: take("bank_name"),
            bank_address: take("bank_address"),
            bank_registration_number: take("bank_registration_number"),
            subject_matter: take("subject_of_FA"),
            total_loan_amount: take("total_loan_amount"),
            guarantor_name: take("guarantor_name"),
            guarantor_nric: take("guarantor_nric"),
            corporate_guarantor_name: take("corporate_guarantor_name"),
            corporate_guarantor_registration_number: take("corporate_guarantor_registration_number"),
            law_firm_name: take("law_firm_name"),
            law_firm_address: take("law_firm_address"),
            property_description: take("property_title"),
            property_address: take("property_address"),
            property_price: take("property_price"),
        }
    }
}
