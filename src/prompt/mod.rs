//! Validation prompt templates.
//!
//! Each prompt gives the assistant the company context, the datapoint under
//! review with its source, and the exact JSON shape to reply with. Context
//! lines are omitted when the export has no value for them.

use crate::lead::{DecisionMaker, LeadRecord};
use std::fmt::Write;

/// The reply shape requested for single-datapoint prompts.
const REPLY_FORMAT: &str = r#"Return your assessment in this JSON format:
{
  "confidence": 0.0,
  "explanation": "Your explanation here",
  "flags": ["Flag 1", "Flag 2"]
}"#;

/// A named value submitted for validation in a batched prompt.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub name: String,
    pub value: String,
    pub source: Option<String>,
}

/// Prompt for validating a lead's estimated revenue.
pub fn revenue_prompt(lead: &LeadRecord) -> String {
    let context = context_block(lead, &["Industry", "Company Size", "Founded", "Headquarters"]);
    let revenue = lead.value("estimated_revenue").unwrap_or("Not available");
    let source = lead.value("source").unwrap_or("Unknown source");

    format!(
        "Please validate the following company revenue data:\n\n\
         Company: {company}\n{context}\n\
         Revenue: {revenue}\n\
         Source: {source}\n\n\
         {instructions}\n\n{REPLY_FORMAT}\n",
        company = company_name(lead),
        instructions = instructions_for("revenue figure"),
    )
}

/// Prompt for validating a lead's employee count.
pub fn employee_count_prompt(lead: &LeadRecord) -> String {
    let mut context = context_block(lead, &["Industry", "Founded", "Headquarters"]);
    if let Some(revenue) = lead.value("estimated_revenue") {
        let _ = writeln!(context, "Revenue: {revenue}");
    }
    let count = lead.value("Company Size").unwrap_or("Not available");

    format!(
        "Please validate the following company employee count data:\n\n\
         Company: {company}\n{context}\n\
         Employee Count: {count}\n\
         Source: LinkedIn\n\n\
         {instructions}\n\n{REPLY_FORMAT}\n",
        company = company_name(lead),
        instructions = instructions_for("employee count"),
    )
}

/// Prompt for validating one decision-maker entry.
pub fn decision_maker_prompt(lead: &LeadRecord, dm: &DecisionMaker) -> String {
    let context = context_block(lead, &["Industry", "Company Size", "Founded", "Headquarters"]);
    let source = dm.source.as_deref().unwrap_or("Unknown source");

    format!(
        "Please validate the following company decision maker data:\n\n\
         Company: {company}\n{context}\n\
         Decision Maker:\n\
         - Name: {name}\n\
         - Title: {title}\n\
         Source: {source}\n\n\
         {instructions}\n\n{REPLY_FORMAT}\n",
        company = company_name(lead),
        name = dm.name,
        title = dm.title,
        instructions = instructions_for("decision maker information"),
    )
}

/// Prompt for validating several datapoints of one lead in a single turn.
pub fn batch_prompt(lead: &LeadRecord, items: &[BatchItem]) -> String {
    let context = context_block(lead, &["Industry", "Company Size", "Founded", "Headquarters"]);

    let mut listing = String::new();
    for item in items {
        let _ = write!(listing, "\n{}: {}", item.name, item.value);
        if let Some(source) = &item.source {
            let _ = write!(listing, " (Source: {source})");
        }
    }

    format!(
        "Please validate the following business data points for a company:\n\n\
         Company: {company}\n{context}\n\
         Data points to validate:{listing}\n\n\
         Based on your knowledge of businesses and industry patterns, please validate each data point separately.\n\
         For each data point:\n\
         1. Provide a confidence score from 0.0 to 1.0 (where 1.0 is highly confident in the data's accuracy)\n\
         2. Briefly explain your reasoning\n\
         3. Identify any potential issues or flags\n\n\
         Return your assessment in this JSON format:\n\
         {{\n\
           \"data_points\": {{\n\
             \"data_point_name\": {{\n\
               \"confidence\": 0.0,\n\
               \"explanation\": \"Your explanation here\",\n\
               \"flags\": [\"Flag 1\", \"Flag 2\"]\n\
             }}\n\
           }}\n\
         }}\n\n\
         Use the actual data point names given above as the keys.\n",
        company = company_name(lead),
    )
}

fn company_name(lead: &LeadRecord) -> &str {
    lead.business_name().unwrap_or("Unknown Company")
}

/// One `Field: value` line per context column that has a real value.
fn context_block(lead: &LeadRecord, columns: &[&str]) -> String {
    let mut block = String::new();
    for col in columns {
        if let Some(value) = lead.value(col) {
            let _ = writeln!(block, "{col}: {value}");
        }
    }
    block
}

fn instructions_for(what: &str) -> String {
    format!(
        "Based on your knowledge of businesses and industry patterns, please:\n\
         1. Provide a confidence score from 0.0 to 1.0 (where 1.0 is highly confident in the data's accuracy)\n\
         2. Briefly explain your reasoning\n\
         3. Identify any potential issues or flags with this {what}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead() -> LeadRecord {
        LeadRecord::from_pairs([
            ("Business Name", "Acme Corp"),
            ("Industry", "Manufacturing"),
            ("Company Size", "Not found"),
            ("Founded", "1998"),
            ("estimated_revenue", "$4.5M"),
            ("source", "ZoomInfo"),
        ])
    }

    #[test]
    fn test_revenue_prompt_contents() {
        let p = revenue_prompt(&lead());
        assert!(p.contains("Company: Acme Corp"));
        assert!(p.contains("Revenue: $4.5M"));
        assert!(p.contains("Source: ZoomInfo"));
        assert!(p.contains("Industry: Manufacturing"));
        // Sentinel values never reach the prompt.
        assert!(!p.contains("Not found"));
        assert!(p.contains("\"confidence\": 0.0"));
    }

    #[test]
    fn test_employee_count_prompt_includes_revenue_context() {
        let mut l = lead();
        l.set("Company Size", "51-200");
        let p = employee_count_prompt(&l);
        assert!(p.contains("Employee Count: 51-200"));
        assert!(p.contains("Revenue: $4.5M"));
    }

    #[test]
    fn test_decision_maker_prompt() {
        let dm = DecisionMaker {
            name: "Jo Reyes".to_string(),
            title: "CEO".to_string(),
            source: None,
        };
        let p = decision_maker_prompt(&lead(), &dm);
        assert!(p.contains("- Name: Jo Reyes"));
        assert!(p.contains("- Title: CEO"));
        assert!(p.contains("Source: Unknown source"));
    }

    #[test]
    fn test_batch_prompt_lists_items() {
        let items = vec![
            BatchItem {
                name: "revenue".to_string(),
                value: "$4.5M".to_string(),
                source: Some("ZoomInfo".to_string()),
            },
            BatchItem {
                name: "employee_count".to_string(),
                value: "51-200".to_string(),
                source: None,
            },
        ];
        let p = batch_prompt(&lead(), &items);
        assert!(p.contains("revenue: $4.5M (Source: ZoomInfo)"));
        assert!(p.contains("employee_count: 51-200"));
        assert!(p.contains("\"data_points\""));
    }

    #[test]
    fn test_unknown_company_fallback() {
        let anon = LeadRecord::from_pairs([("Industry", "Retail")]);
        let p = revenue_prompt(&anon);
        assert!(p.contains("Company: Unknown Company"));
    }
}
