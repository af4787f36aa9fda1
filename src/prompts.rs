//! Prompts for the three VLM calls the pipeline makes.
//!
//! * **field extraction**: [`EXTRACTION_SYSTEM_PROMPT`] + [`extraction_user_prompt`]
//! * **bank detection**: [`BANK_NAME_SYSTEM_PROMPT`] + [`BANK_NAME_USER_PROMPT`]
//! * **transcription** of scanned pages for the classifier: [`TRANSCRIPTION_SYSTEM_PROMPT`]
//!
//! Callers can override the extraction system prompt via
//! [`crate::config::ExtractionConfig::system_prompt`].

/// System prompt for field extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a multilingual document extraction assistant for Malaysian loan facility letters.
Extract structured information in English even when the page mixes English and Malay.
Return a JSON object with exactly the requested fields. If a value is not on the page, return an empty string, or an empty list for list fields.

Field notes:
- 'borrower_name' usually appears directly above 'borrower_address'.
- 'total_loan_amount' is usually the largest amount in the facility table. Do not repeat it inside 'subject_of_FA'.
- 'subject_of_FA' may have several entries, each formatted as: <Loan Type> (<Code>) - RM<amount>, e.g. 'Overdraft (OD) - RM2,000,000.00'.
- 'guarantor_name' and 'guarantor_nric' refer to individual people (personal guarantors). There may be several; return lists.
- 'corporate_guarantor_name' and 'corporate_guarantor_registration_number' refer to companies, usually ending in 'Sdn Bhd'. There may be several; return lists.
- 'property_title' captures every line of the title description up to the next section, e.g. 'Individual Title HSD 2332, Lot 4444, Mukim Lukut, Negeri Sembilan'.
- 'property_address' may have several values; return a list.
- 'bank_registration_number' keeps its printed form, e.g. '196501000672 (6463-H)'.

Output only the JSON object: no explanations, no markdown fences."#;

/// Build the per-call user prompt naming the fields to extract.
pub fn extraction_user_prompt(label: &str, fields: &[String]) -> String {
    let list = fields
        .iter()
        .map(|f| format!("  \"{}\"", f))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        r#"This page is the '{label}' section of a loan facility letter.

Extract the following fields and return them as one JSON object whose keys are exactly these names:
[
{list}
]

Rules:
- Fields that can hold several values (names, NRIC numbers, registration numbers, addresses, facilities) are arrays.
- A missing text field is "", a missing list field is [].
- Never return a bare list; always return an object keyed by field name.

Example of the expected shape:
{{
  "borrower_name": "Robert Dass",
  "bank_name": "PUBLIC BANK BERHAD",
  "subject_of_FA": ["HL/HOME10 (Redraw) - RM40,000.00", "MRTA - RM1,000,620.00"],
  "guarantor_name": ["Ali bin Abu", "Alex Lim"]
}}

Only return the JSON."#
    )
}

/// System prompt for reading the bank name off the bank-copy page.
pub const BANK_NAME_SYSTEM_PROMPT: &str = r#"You are a document analysis assistant. Extract the name of the lending bank from an official loan document page.
Return only the bank name as plain text, with no labels, formatting or explanation.
Examples: CIMB Bank Berhad, Maybank Berhad, RHB Bank Berhad, Public Bank Berhad.
If no bank name is on the page, return an empty string."#;

/// User prompt for bank detection.
pub const BANK_NAME_USER_PROMPT: &str =
    "Extract the bank name from this loan document page. Output ONLY the bank name.";

/// System prompt for transcribing a scanned page so it can be classified.
pub const TRANSCRIPTION_SYSTEM_PROMPT: &str = r#"You are an OCR engine. Transcribe all text on the page image exactly as printed, in reading order.
Keep headings, table cells and numbered clauses on their own lines.
Do not translate, summarise, correct, or add any commentary. Output plain text only."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_lists_every_field() {
        let fields = vec!["law_firm_name".to_string(), "law_firm_address".to_string()];
        let p = extraction_user_prompt("law_firm_details", &fields);
        assert!(p.contains("'law_firm_details'"));
        assert!(p.contains("\"law_firm_name\",\n  \"law_firm_address\""));
        assert!(p.contains("Only return the JSON."));
    }

    #[test]
    fn system_prompt_mentions_list_fields() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("guarantor_name"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("subject_of_FA"));
    }
}
