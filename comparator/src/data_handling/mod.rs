pub mod contact_report;
pub mod msa;
