use serde::{Deserialize, Serialize};

/// One data row of an uploaded research sheet.
///
/// Field names follow the sheet's header row verbatim, including the
/// `Est. Prfoit` column. Columns absent from the sheet deserialize as empty
/// strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchRow {
    #[serde(rename = "Deadline")]
    pub deadline: String,
    #[serde(rename = "Order Number")]
    pub order_number: String,
    #[serde(rename = "eBay Item Id")]
    pub ebay_item_id: String,
    #[serde(rename = "product_id")]
    pub product_id: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Keyword")]
    pub keyword: String,
    #[serde(rename = "Identity")]
    pub identity: String,
    #[serde(rename = "JP Keyword")]
    pub jp_keyword: String,
    #[serde(rename = "Appendix")]
    pub appendix: String,
    #[serde(rename = "Order Detail URL")]
    pub order_detail_url: String,
    #[serde(rename = "Est. Prfoit")]
    pub estimated_profit: String,
    #[serde(rename = "Sanitized by")]
    pub sanitized_by: String,
}

impl ResearchRow {
    pub fn owner(&self) -> Option<&str> {
        non_empty(&self.sanitized_by)
    }

    pub fn identity(&self) -> Option<&str> {
        non_empty(&self.identity)
    }

    pub fn deadline(&self) -> Option<&str> {
        non_empty(&self.deadline)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
